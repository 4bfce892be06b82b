use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Layout path types
#[derive(Debug, Clone, Copy)]
pub enum LayoutPath {
    /// Versions directory: one subdirectory per installed version (default ~/.avm)
    Versions,
    /// Bin directory holding the active link (default ~/.amplify/bin)
    Bin,
    /// Active binary link: bin/<binary>
    ActiveBinary,
}

/// Filesystem layout managed by avm
///
/// Everything avm reads or writes on disk is derived from these two roots.
/// Both roots are absolute, since the active link stores the version binary
/// path verbatim as its target.
#[derive(Debug, Clone)]
pub struct Layout {
    versions_dir: PathBuf,
    bin_dir: PathBuf,
    binary_file: String,
}

impl Layout {
    pub fn new(settings: &Settings) -> Self {
        Self {
            versions_dir: absolute_root(&settings.versions_dir),
            bin_dir: absolute_root(&settings.bin_dir),
            binary_file: binary_file_name(&settings.binary_name),
        }
    }

    /// Get path for a specific layout location
    pub fn path(&self, path_type: LayoutPath) -> PathBuf {
        match path_type {
            LayoutPath::Versions => self.versions_dir.clone(),
            LayoutPath::Bin => self.bin_dir.clone(),
            LayoutPath::ActiveBinary => self.bin_dir.join(&self.binary_file),
        }
    }

    /// Directory holding the artifacts of one installed version
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir.join(version)
    }

    /// Path of the executable inside an installed version
    pub fn version_binary(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(&self.binary_file)
    }

    /// Platform file name of the managed executable
    pub fn binary_file(&self) -> &str {
        &self.binary_file
    }

    /// Map a path inside the versions directory back to its version name.
    pub fn version_of(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.versions_dir).ok()?;
        relative
            .components()
            .next()
            .and_then(|component| component.as_os_str().to_str())
            .map(str::to_string)
    }
}

fn absolute_root(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn binary_file_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}
