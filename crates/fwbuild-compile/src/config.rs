//! Target configuration and the immutable snapshot a pass compiles against.

use std::path::PathBuf;

use fwbuild_targets::{CoreGeneration, ToolchainDescriptor, Vendor};
use serde::{Deserialize, Serialize};

/// Define added to every unit of a debug build.
pub const DEBUG_DEFINE: &str = "DEBUG";
/// Define added to every unit of a non-debug build.
pub const NDEBUG_DEFINE: &str = "NDEBUG";
/// Define added while assertions are enabled.
pub const ASSERT_DEFINE: &str = "USE_FULL_ASSERT";

/// Build variant toggles. They change flags and defines, never the source set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Toggles {
    pub debug: bool,
    pub assert: bool,
    pub tiny: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self {
            debug: false,
            assert: true,
            tiny: false,
        }
    }
}

impl Toggles {
    /// Defines implied by the toggles.
    pub fn defines(&self) -> Vec<&'static str> {
        let mut defines = vec![if self.debug { DEBUG_DEFINE } else { NDEBUG_DEFINE }];
        if self.assert {
            defines.push(ASSERT_DEFINE);
        }
        defines
    }

    /// Name tokens for toggles that differ from a plain release build with
    /// assertions, in fixed order: `debug`, `noassert`, `tiny`.
    pub fn variant_tokens(&self) -> Vec<&'static str> {
        let mut tokens = Vec::new();
        if self.debug {
            tokens.push("debug");
        }
        if !self.assert {
            tokens.push("noassert");
        }
        if self.tiny {
            tokens.push("tiny");
        }
        tokens
    }
}

/// Mutable target configuration owned by a build session.
///
/// Every effective change bumps [`revision`](Self::revision). Setting a field
/// to the value it already holds is not a change.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationContext {
    core: CoreGeneration,
    vendor: Vendor,
    alt_compiler: bool,
    output: String,
    defines: Vec<String>,
    libs: Vec<PathBuf>,
    toggles: Toggles,
    revision: u64,
}

impl ConfigurationContext {
    pub fn new(core: CoreGeneration, alt_compiler: bool) -> Self {
        Self {
            core,
            alt_compiler,
            ..Self::default()
        }
    }

    pub fn core(&self) -> CoreGeneration {
        self.core
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn alt_compiler(&self) -> bool {
        self.alt_compiler
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    pub fn libs(&self) -> &[PathBuf] {
        &self.libs
    }

    pub fn toggles(&self) -> Toggles {
        self.toggles
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_core(&mut self, core: CoreGeneration) {
        if self.core != core {
            self.core = core;
            self.touch();
        }
    }

    pub fn set_vendor(&mut self, vendor: Vendor) {
        if self.vendor != vendor {
            self.vendor = vendor;
            self.touch();
        }
    }

    pub fn set_alt_compiler(&mut self, alt_compiler: bool) {
        if self.alt_compiler != alt_compiler {
            self.alt_compiler = alt_compiler;
            self.touch();
        }
    }

    pub fn set_output(&mut self, output: impl Into<String>) {
        let output = output.into();
        if self.output != output {
            self.output = output;
            self.touch();
        }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.set_toggles(Toggles { debug, ..self.toggles });
    }

    pub fn set_assert(&mut self, assert: bool) {
        self.set_toggles(Toggles { assert, ..self.toggles });
    }

    pub fn set_tiny(&mut self, tiny: bool) {
        self.set_toggles(Toggles { tiny, ..self.toggles });
    }

    pub fn set_toggles(&mut self, toggles: Toggles) {
        if self.toggles != toggles {
            self.toggles = toggles;
            self.touch();
        }
    }

    /// Add a define unless already present. Returns whether it was added.
    pub fn add_define(&mut self, define: impl Into<String>) -> bool {
        let define = define.into();
        if define.trim().is_empty() || self.defines.contains(&define) {
            return false;
        }
        self.defines.push(define);
        self.touch();
        true
    }

    /// Add a library dependency unless already present.
    pub fn add_lib(&mut self, lib: impl Into<PathBuf>) -> bool {
        let lib = lib.into();
        if self.libs.contains(&lib) {
            return false;
        }
        self.libs.push(lib);
        self.touch();
        true
    }

    pub fn clear_libs(&mut self) {
        if !self.libs.is_empty() {
            self.libs.clear();
            self.touch();
        }
    }

    /// Record a change made outside this struct (include paths, file rules).
    pub fn touch(&mut self) {
        self.revision += 1;
    }

    /// Freeze the configuration for one pass.
    pub fn snapshot(&self, include_paths: Vec<PathBuf>) -> ConfigSnapshot {
        ConfigSnapshot {
            core: self.core,
            vendor: self.vendor,
            alt_compiler: self.alt_compiler,
            output: self.output.clone(),
            defines: self.defines.clone(),
            include_paths,
            libs: self.libs.clone(),
            toggles: self.toggles,
            revision: self.revision,
        }
    }
}

/// Configuration frozen at the start of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigSnapshot {
    pub core: CoreGeneration,
    pub vendor: Vendor,
    pub alt_compiler: bool,
    pub output: String,
    pub defines: Vec<String>,
    /// Absolute, deduplicated include directories.
    pub include_paths: Vec<PathBuf>,
    pub libs: Vec<PathBuf>,
    pub toggles: Toggles,
    pub revision: u64,
}

impl ConfigSnapshot {
    /// Every define a unit receives: toolchain, configuration, then toggle
    /// defines, duplicates dropped.
    pub fn effective_defines(&self, toolchain: &ToolchainDescriptor) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = toolchain
            .defines
            .iter()
            .map(String::as_str)
            .chain(self.defines.iter().map(String::as_str))
            .chain(self.toggles.defines());
        for define in all {
            if !out.iter().any(|d| d == define) {
                out.push(define.to_string());
            }
        }
        out
    }
}
