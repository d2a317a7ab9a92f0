//! `fwbuild init`: project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{FwbuildManifest, MANIFEST_FILE};

/// Create a new project directory `name` relative to the working directory.
pub fn run(name: &str) -> Result<()> {
    create_project(Path::new(name), name)
}

pub(crate) fn create_project(project_dir: &Path, name: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }

    fs::create_dir_all(project_dir.join("src")).context("creating src/ directory")?;
    fs::create_dir_all(project_dir.join("toolchains"))
        .context("creating toolchains/ directory")?;

    fs::write(project_dir.join(MANIFEST_FILE), FwbuildManifest::template(name))
        .with_context(|| format!("writing {MANIFEST_FILE}"))?;
    fs::write(project_dir.join(".gitignore"), "obj/\n*.lib\n*.a\n")
        .context("writing .gitignore")?;

    println!("Created project '{name}'");
    println!("  {name}/{MANIFEST_FILE}");
    println!("  {name}/src/");
    println!("  {name}/toolchains/");
    println!("  {name}/.gitignore");

    Ok(())
}
