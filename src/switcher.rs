use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layout::{Layout, LayoutPath};

/// Point the active binary link at an installed version.
///
/// The new link is created under a temporary name in the bin directory and
/// renamed over the active path, so the active path is always either the old
/// link or the new one. On failure the previous link is left as it was.
pub fn switch_to(layout: &Layout, version: &str) -> Result<PathBuf> {
    let target = layout.version_binary(version);
    let link = layout.path(LayoutPath::ActiveBinary);
    let bin_dir = layout.path(LayoutPath::Bin);
    let swap_failed = |source: io::Error| Error::SymlinkSwapFailed {
        link: link.clone(),
        source,
    };

    if !target.is_file() {
        return Err(swap_failed(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not installed at {}", version, target.display()),
        )));
    }

    if let Ok(meta) = fs::symlink_metadata(&link) {
        if meta.is_dir() {
            return Err(swap_failed(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a directory", link.display()),
            )));
        }
    }

    fs::create_dir_all(&bin_dir).map_err(swap_failed)?;

    let staging = bin_dir.join(format!(
        ".{}.{}.tmp",
        layout.binary_file(),
        std::process::id()
    ));
    match fs::remove_file(&staging) {
        Ok(()) => debug!(path = ?staging, "removed stale staging link"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(swap_failed(err)),
    }

    create_symlink(&target, &staging).map_err(swap_failed)?;
    if let Err(err) = fs::rename(&staging, &link) {
        let _ = fs::remove_file(&staging);
        return Err(swap_failed(err));
    }

    info!(link = ?link, target = ?target, "switched active binary");
    Ok(link)
}

/// Version the active link currently points into, if any.
pub fn active_version(layout: &Layout) -> Option<String> {
    let link = layout.path(LayoutPath::ActiveBinary);
    let target = fs::read_link(&link).ok()?;
    let target = if target.is_relative() {
        link.parent()?.join(target)
    } else {
        target
    };

    if !target.exists() {
        return None;
    }
    layout.version_of(&target)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
