//! Toolchain registry: maps (core, vendor, alternate-compiler) keys to descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cpu::{CoreGeneration, Vendor};
use crate::error::{Result, TargetError};
use crate::toolchain::ToolchainDescriptor;

/// Lookup key for a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolchainKey {
    pub core: CoreGeneration,
    pub vendor: Vendor,
    pub alt_compiler: bool,
}

/// Which keys a toolchain definition applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MatchSpec {
    /// Core generations served.
    pub cores: Vec<CoreGeneration>,
    /// Vendor families served.
    pub vendors: Vec<Vendor>,
    /// Whether this toolchain answers the alternate-compiler flag.
    #[serde(default)]
    pub alt_compiler: bool,
}

impl MatchSpec {
    /// Every key this match covers.
    pub fn keys(&self) -> impl Iterator<Item = ToolchainKey> + '_ {
        self.cores.iter().flat_map(move |&core| {
            self.vendors.iter().map(move |&vendor| ToolchainKey {
                core,
                vendor,
                alt_compiler: self.alt_compiler,
            })
        })
    }
}

/// A toolchain together with the keys it serves, as stored in `.toolchain.toml` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolchainDefinition {
    #[serde(rename = "match")]
    pub matches: MatchSpec,
    pub toolchain: ToolchainDescriptor,
}

/// Registry of toolchains, one descriptor per key.
#[derive(Debug, Clone, Default)]
pub struct ToolchainRegistry {
    entries: BTreeMap<ToolchainKey, ToolchainDescriptor>,
}

impl ToolchainRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in ARM Compiler 5 / ARM Compiler 6 registry.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for core in CoreGeneration::builtin() {
            for vendor in Vendor::all() {
                if vendor == Vendor::Gd32 && !matches!(core.number(), 3 | 4) {
                    continue;
                }
                registry.insert(
                    ToolchainKey {
                        core,
                        vendor,
                        alt_compiler: false,
                    },
                    ToolchainDescriptor::armcc(core, vendor),
                );
                if core != CoreGeneration::M0 {
                    registry.insert(
                        ToolchainKey {
                            core,
                            vendor,
                            alt_compiler: true,
                        },
                        ToolchainDescriptor::armclang(core, vendor),
                    );
                }
            }
        }
        registry
    }

    /// Insert a descriptor for a single key, replacing any previous one.
    pub fn insert(&mut self, key: ToolchainKey, descriptor: ToolchainDescriptor) {
        self.entries.insert(key, descriptor);
    }

    /// Register a definition for every key it matches. Returns the number of keys.
    pub fn register(&mut self, definition: ToolchainDefinition) -> usize {
        let keys: Vec<ToolchainKey> = definition.matches.keys().collect();
        for key in &keys {
            self.entries.insert(*key, definition.toolchain.clone());
        }
        keys.len()
    }

    /// Resolve a key to exactly one toolchain.
    pub fn resolve(
        &self,
        core: CoreGeneration,
        vendor: Vendor,
        alt_compiler: bool,
    ) -> Result<ToolchainDescriptor> {
        let key = ToolchainKey {
            core,
            vendor,
            alt_compiler,
        };
        self.entries
            .get(&key)
            .cloned()
            .ok_or(TargetError::UnsupportedTarget {
                core,
                vendor,
                alt_compiler,
            })
    }

    /// All registered keys with their descriptors, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ToolchainKey, &ToolchainDescriptor)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve against the built-in registry.
pub fn resolve(
    core: CoreGeneration,
    vendor: Vendor,
    alt_compiler: bool,
) -> Result<ToolchainDescriptor> {
    ToolchainRegistry::builtin().resolve(core, vendor, alt_compiler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CompilerFamily;

    #[test]
    fn m3_without_alt_is_default_arm_toolchain() {
        let tc = resolve(CoreGeneration::M3, Vendor::Stm32, false).unwrap();
        assert_eq!(tc.family, CompilerFamily::Armcc);
        assert_eq!(tc.c.program, "armcc");
    }

    #[test]
    fn alt_compiler_selects_armclang() {
        let tc = resolve(CoreGeneration::M3, Vendor::Stm32, true).unwrap();
        assert_eq!(tc.family, CompilerFamily::Armclang);
    }

    #[test]
    fn unregistered_generation_is_unsupported() {
        let m9: CoreGeneration = "M9".parse().unwrap();
        let err = resolve(m9, Vendor::Stm32, false).unwrap_err();
        assert!(matches!(err, TargetError::UnsupportedTarget { .. }));
        assert!(err.to_string().contains("M9"));
    }

    #[test]
    fn incompatible_combinations_are_unsupported() {
        assert!(resolve(CoreGeneration::M0, Vendor::Stm32, true).is_err());
        assert!(resolve(CoreGeneration::M7, Vendor::Gd32, false).is_err());
        assert!(resolve(CoreGeneration::M0, Vendor::Gd32, false).is_err());
        assert!(resolve(CoreGeneration::M3, Vendor::Gd32, false).is_ok());
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = resolve(CoreGeneration::M4, Vendor::Stm32, false).unwrap();
        let b = resolve(CoreGeneration::M4, Vendor::Stm32, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn builtin_entry_count() {
        // armcc: 4 cores STM32 + 2 GD32; armclang: 3 cores STM32 + 2 GD32
        assert_eq!(ToolchainRegistry::builtin().len(), 11);
    }

    #[test]
    fn register_replaces_matching_keys() {
        let mut registry = ToolchainRegistry::builtin();
        let mut custom = ToolchainDescriptor::armcc(CoreGeneration::M3, Vendor::Stm32);
        custom.name = "gcc-m3".into();
        custom.family = CompilerFamily::Gcc;
        let count = registry.register(ToolchainDefinition {
            matches: MatchSpec {
                cores: vec![CoreGeneration::M3, CoreGeneration::new(33)],
                vendors: vec![Vendor::Stm32],
                alt_compiler: false,
            },
            toolchain: custom,
        });
        assert_eq!(count, 2);
        let tc = registry
            .resolve(CoreGeneration::M3, Vendor::Stm32, false)
            .unwrap();
        assert_eq!(tc.name, "gcc-m3");
        assert!(registry
            .resolve(CoreGeneration::new(33), Vendor::Stm32, false)
            .is_ok());
    }
}
