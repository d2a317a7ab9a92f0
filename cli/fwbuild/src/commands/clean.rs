//! `fwbuild clean`: remove object directories.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Remove the object root and everything compiled under it. Libraries are left alone.
pub fn run(object_dir: &Path) -> Result<()> {
    if object_dir.exists() {
        fs::remove_dir_all(object_dir)
            .with_context(|| format!("removing {}", object_dir.display()))?;
        println!("Removed {}", object_dir.display());
    } else {
        println!("Already clean: {} does not exist", object_dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_object_dir() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("obj/armcc-cortex-m3-stm32/release");
        fs::create_dir_all(&obj).unwrap();
        fs::write(obj.join("Sys-0a1b2c3d.o"), b"data").unwrap();
        fs::write(obj.join("Sys-0a1b2c3d.o.fp"), b"ff").unwrap();
        fs::write(dir.path().join("SmartOS_M3.lib"), b"lib").unwrap();

        run(&dir.path().join("obj")).unwrap();
        assert!(!dir.path().join("obj").exists());
        assert!(dir.path().join("SmartOS_M3.lib").exists());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        run(&dir.path().join("obj")).unwrap();
    }
}
