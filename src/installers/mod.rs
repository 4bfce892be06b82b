use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::layout::{Layout, LayoutPath};

mod release;
pub use release::{current_platform, ReleaseInstaller};

/// Ensures a given exact version of the managed binary is present on disk.
pub trait Installer {
    fn is_installed(&self, version: &str) -> bool;
    fn binary_path(&self, version: &str) -> PathBuf;
    /// Install `version`, returning the installed binary path.
    ///
    /// Installing a version that is already present succeeds without changes.
    fn install(&self, version: &str) -> crate::error::Result<PathBuf>;
}

/// Installed versions, in directory enumeration order.
///
/// Hidden entries (in-progress installs) and plain files are skipped. A
/// missing versions directory means nothing is installed yet.
pub fn list_installed(layout: &Layout) -> Result<Vec<String>> {
    let versions_dir = layout.path(LayoutPath::Versions);
    let entries = match fs::read_dir(&versions_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to read versions directory {:?}", versions_dir))
        }
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        versions.push(name);
    }

    Ok(versions)
}
