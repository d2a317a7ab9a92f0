//! Core generation, vendor family, and compiler family keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TargetError;

/// An ARM Cortex-M core generation (the `N` in Cortex-MN).
///
/// Any generation number can be represented so that callers can ask for
/// cores nobody has registered a toolchain for; resolution rejects those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoreGeneration(u8);

impl CoreGeneration {
    pub const M0: Self = Self(0);
    pub const M3: Self = Self(3);
    pub const M4: Self = Self(4);
    pub const M7: Self = Self(7);

    /// Construct a generation from its number.
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// The generation number.
    pub fn number(self) -> u8 {
        self.0
    }

    /// CPU name as ARM tools spell it, e.g. `Cortex-M3`.
    pub fn cpu_name(self) -> String {
        format!("Cortex-M{}", self.0)
    }

    /// Generations with a built-in toolchain.
    pub fn builtin() -> [Self; 4] {
        [Self::M0, Self::M3, Self::M4, Self::M7]
    }
}

impl Default for CoreGeneration {
    fn default() -> Self {
        Self::M3
    }
}

impl fmt::Display for CoreGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

impl FromStr for CoreGeneration {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let rest = lower.strip_prefix("cortex-").unwrap_or(&lower);
        let digits = rest.strip_prefix('m').unwrap_or(rest);
        digits
            .parse::<u8>()
            .map(Self)
            .map_err(|_| TargetError::InvalidCore {
                input: s.to_string(),
            })
    }
}

impl TryFrom<String> for CoreGeneration {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CoreGeneration> for String {
    fn from(core: CoreGeneration) -> Self {
        core.to_string()
    }
}

/// MCU vendor family whose SDK conventions the build follows.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Stm32,
    Gd32,
}

impl Vendor {
    /// All known vendor families.
    pub fn all() -> [Self; 2] {
        [Self::Stm32, Self::Gd32]
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Stm32 => f.write_str("stm32"),
            Vendor::Gd32 => f.write_str("gd32"),
        }
    }
}

impl FromStr for Vendor {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stm32" | "st" => Ok(Vendor::Stm32),
            "gd32" | "gd" => Ok(Vendor::Gd32),
            _ => Err(TargetError::InvalidVendor {
                input: s.to_string(),
            }),
        }
    }
}

/// The compiler front-end a toolchain drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerFamily {
    /// ARM Compiler 5 (`armcc`).
    Armcc,
    /// ARM Compiler 6 (`armclang`).
    Armclang,
    /// GNU Arm Embedded (`arm-none-eabi-gcc`).
    Gcc,
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerFamily::Armcc => f.write_str("armcc"),
            CompilerFamily::Armclang => f.write_str("armclang"),
            CompilerFamily::Gcc => f.write_str("gcc"),
        }
    }
}
