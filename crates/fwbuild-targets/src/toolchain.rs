//! Toolchain descriptors.
//!
//! A descriptor names the executables for each source kind plus the archiver,
//! and spells out every flag the compile driver needs so that no
//! compiler-specific knowledge lives outside this crate.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cpu::{CompilerFamily, CoreGeneration, Vendor};

/// Kind of a compilable source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    C,
    Cpp,
    Asm,
}

impl SourceKind {
    /// Classify a path by its extension using the conventional mapping.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" => Some(SourceKind::C),
            "cpp" | "cc" | "cxx" => Some(SourceKind::Cpp),
            "s" | "asm" => Some(SourceKind::Asm),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::C => f.write_str("C"),
            SourceKind::Cpp => f.write_str("C++"),
            SourceKind::Asm => f.write_str("assembly"),
        }
    }
}

/// One executable plus the flags it always receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolSpec {
    /// Executable name or path.
    pub program: String,
    /// Base flags, including the CPU selection.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl ToolSpec {
    pub fn new(program: impl Into<String>, flags: &[&str]) -> Self {
        Self {
            program: program.into(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// A complete toolchain for one target combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolchainDescriptor {
    /// Display name, e.g. "armcc-cortex-m3-stm32".
    pub name: String,
    /// Compiler front-end family.
    pub family: CompilerFamily,
    /// C compiler. Its flags include the compile-only switch.
    pub c: ToolSpec,
    /// C++ compiler.
    pub cpp: ToolSpec,
    /// Assembler.
    pub asm: ToolSpec,
    /// Static library archiver. Invoked as `program flags... <library> <inputs>...`.
    pub archiver: ToolSpec,
    /// Whether the assembler accepts define flags.
    #[serde(default)]
    pub asm_defines: bool,
    /// Defines every unit receives (vendor markers and the like).
    #[serde(default)]
    pub defines: Vec<String>,
    /// Include directories appended after the configuration's own.
    #[serde(default)]
    pub system_includes: Vec<PathBuf>,
    /// Lowercase extension (without dot) to source kind.
    pub extensions: BTreeMap<String, SourceKind>,
    /// Flags for debug builds (C and C++ only).
    #[serde(default)]
    pub debug_flags: Vec<String>,
    /// Flags for non-debug builds (C and C++ only).
    #[serde(default)]
    pub release_flags: Vec<String>,
    /// Size-optimization flags (C and C++ only).
    #[serde(default)]
    pub tiny_flags: Vec<String>,
    #[serde(default = "default_define_prefix")]
    pub define_prefix: String,
    #[serde(default = "default_include_prefix")]
    pub include_prefix: String,
    #[serde(default = "default_output_flag")]
    pub output_flag: String,
    /// Object file extension without dot.
    #[serde(default = "default_object_extension")]
    pub object_extension: String,
    /// Static library extension without dot.
    pub library_extension: String,
}

fn default_define_prefix() -> String {
    "-D".into()
}

fn default_include_prefix() -> String {
    "-I".into()
}

fn default_output_flag() -> String {
    "-o".into()
}

fn default_object_extension() -> String {
    "o".into()
}

impl ToolchainDescriptor {
    /// Tool used for a source kind.
    pub fn tool_for(&self, kind: SourceKind) -> &ToolSpec {
        match kind {
            SourceKind::C => &self.c,
            SourceKind::Cpp => &self.cpp,
            SourceKind::Asm => &self.asm,
        }
    }

    /// Kind of a file according to this toolchain's extension map.
    pub fn kind_for_path(&self, path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.extensions.get(&ext).copied()
    }

    /// Append the library extension unless the path already carries it.
    pub fn library_path(&self, output: &Path) -> PathBuf {
        let has_ext = output
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.library_extension));
        if has_ext {
            output.to_path_buf()
        } else {
            let mut name = output.as_os_str().to_os_string();
            name.push(".");
            name.push(&self.library_extension);
            PathBuf::from(name)
        }
    }

    /// ARM Compiler 5 (Keil MDK `armcc`).
    pub fn armcc(core: CoreGeneration, vendor: Vendor) -> Self {
        let cpu = armcc_cpu(core);
        let cpu_flags = ["--cpu", cpu.as_str()];
        let common = [
            "--apcs=interwork",
            "--split_sections",
            "--diag_suppress=1,47,177,186,223,1299,1300,1295",
        ];
        Self {
            name: format!("armcc-cortex-m{}-{vendor}", core.number()),
            family: CompilerFamily::Armcc,
            c: ToolSpec::new(
                "armcc",
                &[&cpu_flags[..], &common[..], &["-c", "--c99"][..]].concat(),
            ),
            cpp: ToolSpec::new(
                "armcc",
                &[&cpu_flags[..], &common[..], &["-c", "--cpp"][..]].concat(),
            ),
            asm: ToolSpec::new("armasm", &[&cpu_flags[..], &["--apcs=interwork"][..]].concat()),
            archiver: ToolSpec::new("armar", &["--create"]),
            asm_defines: false,
            defines: vendor_defines(vendor),
            system_includes: Vec::new(),
            extensions: default_extensions(),
            debug_flags: vec!["-g".into(), "-O0".into()],
            release_flags: vec!["-O3".into()],
            tiny_flags: vec!["-Ospace".into()],
            define_prefix: default_define_prefix(),
            include_prefix: default_include_prefix(),
            output_flag: default_output_flag(),
            object_extension: default_object_extension(),
            library_extension: "lib".into(),
        }
    }

    /// ARM Compiler 6 (Keil MDK `armclang`), the alternate front-end.
    pub fn armclang(core: CoreGeneration, vendor: Vendor) -> Self {
        let mcpu = format!("-mcpu=cortex-m{}", core.number());
        let mut cpu_flags = vec!["--target=arm-arm-none-eabi".to_string(), mcpu];
        // Same single-precision units armasm gets through `armcc_cpu`.
        let fpu = match core {
            CoreGeneration::M4 => Some("-mfpu=fpv4-sp-d16"),
            CoreGeneration::M7 => Some("-mfpu=fpv5-sp-d16"),
            _ => None,
        };
        if let Some(fpu) = fpu {
            cpu_flags.push(fpu.into());
            cpu_flags.push("-mfloat-abi=hard".into());
        }
        let with = |extra: &[&str]| -> Vec<String> {
            let mut flags = cpu_flags.clone();
            flags.extend(extra.iter().map(|f| f.to_string()));
            flags
        };
        let asm_cpu = armcc_cpu(core);
        Self {
            name: format!("armclang-cortex-m{}-{vendor}", core.number()),
            family: CompilerFamily::Armclang,
            c: ToolSpec {
                program: "armclang".into(),
                flags: with(&["-c", "-xc", "-std=c99", "-ffunction-sections", "-fshort-enums"]),
            },
            cpp: ToolSpec {
                program: "armclang".into(),
                flags: with(&["-c", "-xc++", "-std=c++11", "-ffunction-sections", "-fno-rtti"]),
            },
            asm: ToolSpec::new("armasm", &["--cpu", asm_cpu.as_str()]),
            archiver: ToolSpec::new("armar", &["--create"]),
            asm_defines: false,
            defines: vendor_defines(vendor),
            system_includes: Vec::new(),
            extensions: default_extensions(),
            debug_flags: vec!["-g".into(), "-O0".into()],
            release_flags: vec!["-O2".into()],
            tiny_flags: vec!["-Oz".into()],
            define_prefix: default_define_prefix(),
            include_prefix: default_include_prefix(),
            output_flag: default_output_flag(),
            object_extension: default_object_extension(),
            library_extension: "lib".into(),
        }
    }
}

fn armcc_cpu(core: CoreGeneration) -> String {
    match core.number() {
        4 => "Cortex-M4.fp".into(),
        7 => "Cortex-M7.fp.sp".into(),
        _ => core.cpu_name(),
    }
}

fn vendor_defines(vendor: Vendor) -> Vec<String> {
    match vendor {
        Vendor::Stm32 => Vec::new(),
        Vendor::Gd32 => vec!["GD32".into()],
    }
}

fn default_extensions() -> BTreeMap<String, SourceKind> {
    [
        ("c", SourceKind::C),
        ("cpp", SourceKind::Cpp),
        ("cc", SourceKind::Cpp),
        ("cxx", SourceKind::Cpp),
        ("s", SourceKind::Asm),
        ("asm", SourceKind::Asm),
    ]
    .into_iter()
    .map(|(ext, kind)| (ext.to_string(), kind))
    .collect()
}
