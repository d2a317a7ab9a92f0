//! Artifact naming policy for repeated archives to one logical output.

use std::path::{Path, PathBuf};

use fwbuild_compile::Toggles;
use serde::{Deserialize, Serialize};

/// How `build_lib` turns the caller's output path into a file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactNaming {
    /// Write exactly the given path; a later variant replaces an earlier one.
    Overwrite,
    /// Append `-debug`, `-noassert` and `-tiny` for the active toggles so
    /// every variant keeps its own file.
    #[default]
    VariantSuffix,
}

impl ArtifactNaming {
    /// Apply the policy. A trailing `library_extension` is kept last.
    pub fn apply(self, output: &Path, toggles: Toggles, library_extension: &str) -> PathBuf {
        let tokens = toggles.variant_tokens();
        if self == ArtifactNaming::Overwrite || tokens.is_empty() {
            return output.to_path_buf();
        }
        let Some(file_name) = output.file_name().and_then(|n| n.to_str()) else {
            return output.to_path_buf();
        };

        let dotted = format!(".{library_extension}");
        let (stem, ext) = match file_name.len().checked_sub(dotted.len()) {
            Some(split)
                if file_name.is_char_boundary(split)
                    && file_name[split..].eq_ignore_ascii_case(&dotted) =>
            {
                file_name.split_at(split)
            }
            _ => (file_name, ""),
        };

        let mut name = stem.to_string();
        for token in tokens {
            name.push('-');
            name.push_str(token);
        }
        name.push_str(ext);
        output.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggles(debug: bool, assert: bool, tiny: bool) -> Toggles {
        Toggles { debug, assert, tiny }
    }

    #[test]
    fn default_variant_keeps_name() {
        let out = ArtifactNaming::VariantSuffix.apply(
            Path::new("../SmartOS_M3"),
            Toggles::default(),
            "lib",
        );
        assert_eq!(out, PathBuf::from("../SmartOS_M3"));
    }

    #[test]
    fn suffixes_in_fixed_order() {
        let out = ArtifactNaming::VariantSuffix.apply(
            Path::new("../SmartOS_F1x0"),
            toggles(true, false, true),
            "lib",
        );
        assert_eq!(out, PathBuf::from("../SmartOS_F1x0-debug-noassert-tiny"));
    }

    #[test]
    fn suffix_goes_before_library_extension() {
        let out = ArtifactNaming::VariantSuffix.apply(
            Path::new("out/M4.LIB"),
            toggles(true, true, false),
            "lib",
        );
        assert_eq!(out, PathBuf::from("out/M4-debug.LIB"));

        let other = ArtifactNaming::VariantSuffix.apply(
            Path::new("out/v1.2"),
            toggles(true, true, false),
            "lib",
        );
        assert_eq!(other, PathBuf::from("out/v1.2-debug"));
    }

    #[test]
    fn overwrite_ignores_toggles() {
        let out = ArtifactNaming::Overwrite.apply(
            Path::new("lib/F1x0"),
            toggles(true, false, true),
            "lib",
        );
        assert_eq!(out, PathBuf::from("lib/F1x0"));
    }
}
