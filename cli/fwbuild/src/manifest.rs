//! `fwbuild.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use fwbuild_compile::Toggles;
use fwbuild_session::{ArtifactNaming, SessionOptions};
use fwbuild_targets::{CoreGeneration, Vendor};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "fwbuild.toml";

/// The top-level manifest structure for an fwbuild project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FwbuildManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub build: BuildConfig,
    /// Inclusion rules in registration order.
    #[serde(default)]
    pub files: Vec<FileRule>,
    /// Variants to compile and archive, in order.
    #[serde(default, rename = "pass")]
    pub passes: Vec<PassConfig>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    pub name: String,
    /// Directory that relative paths in this manifest resolve against,
    /// itself relative to the manifest directory.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

/// Target section: toolchain key, defines, includes, libraries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    #[serde(default)]
    pub core: CoreGeneration,
    #[serde(default)]
    pub vendor: Vendor,
    #[serde(default)]
    pub alt_compiler: bool,
    /// Logical output name; also the default library path.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
}

/// Build section: parallelism, timeouts, naming, directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Worker threads, 0 for available parallelism.
    #[serde(default)]
    pub jobs: usize,
    /// Per-unit timeout in seconds, 0 to disable.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub naming: ArtifactNaming,
    #[serde(default = "default_object_dir")]
    pub object_dir: PathBuf,
    #[serde(default = "default_toolchains_dir")]
    pub toolchains_dir: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            timeout_secs: default_timeout_secs(),
            naming: ArtifactNaming::default(),
            object_dir: default_object_dir(),
            toolchains_dir: default_toolchains_dir(),
            cache: default_cache(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_object_dir() -> PathBuf {
    PathBuf::from("obj")
}

fn default_toolchains_dir() -> PathBuf {
    PathBuf::from("toolchains")
}

fn default_cache() -> bool {
    true
}

/// One `[[files]]` rule in script form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileRule {
    pub root: String,
    #[serde(default)]
    pub patterns: Option<String>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub exclude: Option<String>,
}

/// One `[[pass]]`: toggles plus an optional output override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PassConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(flatten)]
    pub toggles: Toggles,
}

impl FwbuildManifest {
    /// Search upward from `start_dir` for an `fwbuild.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest = Self::parse(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Directory relative manifest paths resolve against.
    pub fn base_dir(&self, project_dir: &Path) -> PathBuf {
        match &self.project.base_dir {
            Some(dir) => project_dir.join(dir),
            None => project_dir.to_path_buf(),
        }
    }

    pub fn toolchains_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.build.toolchains_dir)
    }

    /// Object root, resolved against the manifest directory.
    pub fn object_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.build.object_dir)
    }

    /// Declared passes, or a single default pass when none are listed.
    pub fn passes(&self) -> Vec<PassConfig> {
        if self.passes.is_empty() {
            vec![PassConfig::default()]
        } else {
            self.passes.clone()
        }
    }

    /// Session options from the `[build]` section.
    pub fn session_options(&self, project_dir: &Path) -> SessionOptions {
        SessionOptions {
            object_root: self.object_dir(project_dir),
            jobs: self.build.jobs,
            timeout: match self.build.timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            use_cache: self.build.cache,
            naming: self.build.naming,
        }
    }

    /// Generate the default template for `fwbuild init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[target]
core = "M3"
vendor = "stm32"
output = "{name}"
defines = []
includes = []

[build]
jobs = 0
timeout-secs = 120
naming = "variant-suffix"

[[files]]
root = "src"

[[pass]]
debug = false
assert = true
"#
        )
    }
}
