//! Key identifiers understood by the keybind matcher.
//!
//! Names follow the Windows Presentation Foundation `Key` enumeration
//! (`Subtract`, `NumPad1`, `LeftCtrl`, ...) since that is the format
//! existing keybind files were written in. Each key also carries its
//! Windows virtual-key code so raw hook output can be translated.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_keys {
    ($($name:ident = $vk:literal),+ $(,)?) => {
        /// A keyboard key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Key {
            $($name,)+
        }

        impl Key {
            /// Every known key, in declaration order.
            pub const ALL: &'static [Key] = &[$(Key::$name,)+];

            /// Persisted name of the key.
            pub fn name(self) -> &'static str {
                match self {
                    $(Key::$name => stringify!($name),)+
                }
            }

            /// Windows virtual-key code for this key.
            pub fn virtual_key(self) -> u32 {
                match self {
                    $(Key::$name => $vk,)+
                }
            }

            /// Translate a Windows virtual-key code.
            pub fn from_virtual_key(vk: u32) -> Option<Key> {
                match vk {
                    $($vk => Some(Key::$name),)+
                    _ => None,
                }
            }
        }
    };
}

define_keys! {
    Back = 0x08,
    Tab = 0x09,
    Enter = 0x0D,
    CapsLock = 0x14,
    Escape = 0x1B,
    Space = 0x20,
    PageUp = 0x21,
    PageDown = 0x22,
    End = 0x23,
    Home = 0x24,
    Left = 0x25,
    Up = 0x26,
    Right = 0x27,
    Down = 0x28,
    Insert = 0x2D,
    Delete = 0x2E,
    D0 = 0x30,
    D1 = 0x31,
    D2 = 0x32,
    D3 = 0x33,
    D4 = 0x34,
    D5 = 0x35,
    D6 = 0x36,
    D7 = 0x37,
    D8 = 0x38,
    D9 = 0x39,
    A = 0x41,
    B = 0x42,
    C = 0x43,
    D = 0x44,
    E = 0x45,
    F = 0x46,
    G = 0x47,
    H = 0x48,
    I = 0x49,
    J = 0x4A,
    K = 0x4B,
    L = 0x4C,
    M = 0x4D,
    N = 0x4E,
    O = 0x4F,
    P = 0x50,
    Q = 0x51,
    R = 0x52,
    S = 0x53,
    T = 0x54,
    U = 0x55,
    V = 0x56,
    W = 0x57,
    X = 0x58,
    Y = 0x59,
    Z = 0x5A,
    LWin = 0x5B,
    RWin = 0x5C,
    NumPad0 = 0x60,
    NumPad1 = 0x61,
    NumPad2 = 0x62,
    NumPad3 = 0x63,
    NumPad4 = 0x64,
    NumPad5 = 0x65,
    NumPad6 = 0x66,
    NumPad7 = 0x67,
    NumPad8 = 0x68,
    NumPad9 = 0x69,
    Multiply = 0x6A,
    Add = 0x6B,
    Separator = 0x6C,
    Subtract = 0x6D,
    Decimal = 0x6E,
    Divide = 0x6F,
    F1 = 0x70,
    F2 = 0x71,
    F3 = 0x72,
    F4 = 0x73,
    F5 = 0x74,
    F6 = 0x75,
    F7 = 0x76,
    F8 = 0x77,
    F9 = 0x78,
    F10 = 0x79,
    F11 = 0x7A,
    F12 = 0x7B,
    LeftShift = 0xA0,
    RightShift = 0xA1,
    LeftCtrl = 0xA2,
    RightCtrl = 0xA3,
    LeftAlt = 0xA4,
    RightAlt = 0xA5,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a key name (case-insensitive) or a virtual-key code written as
/// `0x6D` or `vk109`.
impl FromStr for Key {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        let vk = if let Some(hex) = lower.strip_prefix("0x") {
            u32::from_str_radix(hex, 16).ok()
        } else if let Some(dec) = lower.strip_prefix("vk") {
            dec.parse::<u32>().ok()
        } else {
            None
        };
        if let Some(vk) = vk {
            return Key::from_virtual_key(vk).ok_or_else(|| InputError::UnknownKey(trimmed.to_string()));
        }

        Key::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InputError::UnknownKey(trimmed.to_string()))
    }
}
