use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;
use zip::ZipArchive;

use super::Installer;
use crate::config::Settings;
use crate::error::Error;
use crate::layout::{Layout, LayoutPath};

const DEFAULT_USER_AGENT: &str = concat!("avm/", env!("CARGO_PKG_VERSION"));

/// Installs a version by downloading its release archive and unpacking the
/// packaged executable into `<versions_dir>/<version>/`.
pub struct ReleaseInstaller {
    layout: Layout,
    package: String,
    binary_name: String,
    release_url: String,
    http: Client,
}

impl ReleaseInstaller {
    pub fn new(settings: &Settings, layout: Layout) -> Result<Self> {
        let http = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .context("Failed to build download client")?;

        Ok(Self {
            layout,
            package: settings.package.clone(),
            binary_name: settings.binary_name.clone(),
            release_url: settings.release_url.clone(),
            http,
        })
    }

    /// Release archive location for a version on the current platform.
    pub fn asset_url(&self, version: &str) -> Result<String> {
        let platform = current_platform()?;
        Ok(self
            .release_url
            .replace("{version}", version)
            .replace("{platform}", platform))
    }

    fn try_install(&self, version: &str) -> Result<PathBuf> {
        let versions_dir = self.layout.path(LayoutPath::Versions);
        fs::create_dir_all(&versions_dir)
            .with_context(|| format!("Failed to create versions directory {:?}", versions_dir))?;

        let staging = versions_dir.join(format!(".{version}.partial"));
        if staging.exists() {
            fs::remove_dir_all(&staging).with_context(|| {
                format!("Failed to remove stale staging directory {:?}", staging)
            })?;
        }
        fs::create_dir_all(&staging)
            .with_context(|| format!("Failed to create staging directory {:?}", staging))?;

        let result = self.fetch_and_unpack(version, &staging);
        if result.is_err() {
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    fn fetch_and_unpack(&self, version: &str, staging: &Path) -> Result<PathBuf> {
        let url = self.asset_url(version)?;
        let archive = staging.join(archive_file_name(&url)?);
        self.fetch_archive(&url, &archive)?;
        self.install_from_archive(version, &archive, staging)
    }

    fn fetch_archive(&self, location: &str, dest: &Path) -> Result<()> {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.download(location, dest),
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow::anyhow!("Invalid file URL '{location}'"))?;
                copy_local(&path, dest)
            }
            _ => copy_local(Path::new(location), dest),
        }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!(%url, "downloading release archive");

        let mut response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("Failed to download release archive from {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            bail!("Release download from {url} returned {status}");
        }

        let temp_path = dest.with_extension("download");
        let mut file = File::create(&temp_path)
            .with_context(|| format!("Failed to create temporary archive file at {:?}", temp_path))?;
        let written = io::copy(&mut response, &mut file)
            .with_context(|| format!("Failed while writing archive to {:?}", temp_path))?;
        file.flush()
            .with_context(|| format!("Failed to flush downloaded archive to {:?}", temp_path))?;

        fs::rename(&temp_path, dest).with_context(|| {
            format!(
                "Failed to move downloaded archive from {:?} to {:?}",
                temp_path, dest
            )
        })?;

        debug!(bytes = written, path = ?dest, "download complete");
        Ok(())
    }

    /// Unpack an already fetched archive and move the result into place.
    ///
    /// `staging` must live inside the versions directory so the final rename
    /// stays on one filesystem.
    pub(crate) fn install_from_archive(
        &self,
        version: &str,
        archive: &Path,
        staging: &Path,
    ) -> Result<PathBuf> {
        let contents = staging.join("contents");
        fs::create_dir_all(&contents)
            .with_context(|| format!("Failed to create directory {:?}", contents))?;
        extract_archive(archive, &contents)?;

        let packaged = locate_executable(&contents, &self.binary_name)?;
        let staged_binary = staging.join(self.layout.binary_file());
        fs::rename(&packaged, &staged_binary).with_context(|| {
            format!("Failed to move {:?} to {:?}", packaged, staged_binary)
        })?;
        make_executable(&staged_binary)?;

        fs::remove_dir_all(&contents)
            .with_context(|| format!("Failed to clean up {:?}", contents))?;
        if archive.starts_with(staging) {
            fs::remove_file(archive)
                .with_context(|| format!("Failed to clean up {:?}", archive))?;
        }

        // A version directory without its binary is left over from an
        // interrupted copy; the staged install replaces it
        let version_dir = self.layout.version_dir(version);
        if version_dir.exists() {
            if self.is_installed(version) {
                bail!("{:?} already exists", version_dir);
            }
            debug!(path = ?version_dir, "replacing incomplete version directory");
            fs::remove_dir_all(&version_dir).with_context(|| {
                format!("Failed to remove incomplete version directory {:?}", version_dir)
            })?;
        }
        fs::rename(staging, &version_dir).with_context(|| {
            format!("Failed to move {:?} into place at {:?}", staging, version_dir)
        })?;

        Ok(self.layout.version_binary(version))
    }
}

impl Installer for ReleaseInstaller {
    fn is_installed(&self, version: &str) -> bool {
        self.binary_path(version).is_file()
    }

    fn binary_path(&self, version: &str) -> PathBuf {
        self.layout.version_binary(version)
    }

    fn install(&self, version: &str) -> crate::error::Result<PathBuf> {
        if self.is_installed(version) {
            info!(version, "already installed");
            return Ok(self.binary_path(version));
        }

        let path = self.try_install(version).map_err(|source| Error::Install {
            package: self.package.clone(),
            version: version.to_string(),
            source,
        })?;
        info!(version, path = ?path, "installed");
        Ok(path)
    }
}

/// Release platform label for the running host.
pub fn current_platform() -> Result<&'static str> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_for(os: &str, arch: &str) -> Result<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Ok("linux-x64"),
        ("linux", "aarch64") => Ok("linux-arm64"),
        // No native arm64 build; Apple silicon runs the x64 one
        ("macos", "x86_64" | "aarch64") => Ok("macos-x64"),
        ("windows", "x86_64") => Ok("win-x64"),
        _ => bail!("No release build available for {os}-{arch}"),
    }
}

fn archive_file_name(location: &str) -> Result<String> {
    let name = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url
            .path_segments()
            .and_then(|segments| segments.last().map(str::to_string)),
        _ => Path::new(location)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string),
    };

    name.filter(|name| !name.is_empty())
        .with_context(|| format!("Release location '{location}' has no file name"))
}

fn copy_local(source: &Path, dest: &Path) -> Result<()> {
    debug!(path = ?source, "copying local release archive");
    fs::copy(source, dest)
        .with_context(|| format!("Failed to copy release archive {:?}", source))?;
    Ok(())
}

pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let filename = archive_path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open archive {:?}", archive_path))?;
        let mut archive = Archive::new(GzDecoder::new(file));
        archive
            .unpack(dest)
            .with_context(|| format!("Failed to unpack tar.gz archive {:?}", archive_path))?;
    } else if filename.ends_with(".tar") {
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open archive {:?}", archive_path))?;
        let mut archive = Archive::new(file);
        archive
            .unpack(dest)
            .with_context(|| format!("Failed to unpack tar archive {:?}", archive_path))?;
    } else if filename.ends_with(".zip") {
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open zip archive {:?}", archive_path))?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("Failed to read zip archive {:?}", archive_path))?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).with_context(|| {
                format!("Failed to read zip entry #{index} from {:?}", archive_path)
            })?;

            let Some(enclosed) = entry.enclosed_name().map(|path| dest.join(path)) else {
                continue;
            };

            if entry.name().ends_with('/') {
                fs::create_dir_all(&enclosed)
                    .with_context(|| format!("Failed to create directory {:?}", enclosed))?;
                continue;
            }

            if let Some(parent) = enclosed.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create parent directory {:?}", parent))?;
            }
            let mut outfile = File::create(&enclosed)
                .with_context(|| format!("Failed to create file {:?}", enclosed))?;
            io::copy(&mut entry, &mut outfile)
                .with_context(|| format!("Failed to extract zip entry {:?}", enclosed))?;
        }
    } else {
        // A bare executable published without an archive
        let target = dest.join(
            archive_path
                .file_name()
                .context("Archive path is missing a filename")?,
        );
        fs::copy(archive_path, &target)
            .with_context(|| format!("Failed to copy asset {:?} to {:?}", archive_path, target))?;
    }

    Ok(())
}

/// Find the packaged executable in extracted release contents.
///
/// Accepts either the plain binary name or the `<binary>-pkg-<platform>`
/// naming used by packaged releases.
pub fn locate_executable(extract_root: &Path, binary_name: &str) -> Result<PathBuf> {
    let packaged_prefix = format!("{binary_name}-pkg");
    let mut matches = Vec::new();

    for entry in WalkDir::new(extract_root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let stem = name.strip_suffix(".exe").unwrap_or(name);
        if stem == binary_name || stem.starts_with(&packaged_prefix) {
            matches.push(entry.into_path());
        }
    }

    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => bail!(
            "Binary '{}' not found in extracted contents under {:?}",
            binary_name,
            extract_root
        ),
        _ => bail!(
            "Binary '{}' matched multiple files in extracted contents under {:?}",
            binary_name,
            extract_root
        ),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to set permissions on {:?}", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use rstest::rstest;
    use tempfile::TempDir;

    fn write_tgz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn installer(temp: &TempDir, release_url: &str) -> ReleaseInstaller {
        let mut settings = Settings::with_dirs(temp.path().join("avm"), temp.path().join("bin"));
        settings.release_url = release_url.to_string();
        let layout = Layout::new(&settings);
        ReleaseInstaller::new(&settings, layout).unwrap()
    }

    #[rstest]
    #[case("linux", "x86_64", "linux-x64")]
    #[case("linux", "aarch64", "linux-arm64")]
    #[case("macos", "x86_64", "macos-x64")]
    #[case("macos", "aarch64", "macos-x64")]
    #[case("windows", "x86_64", "win-x64")]
    fn test_platform_for(#[case] os: &str, #[case] arch: &str, #[case] expected: &str) {
        assert_eq!(platform_for(os, arch).unwrap(), expected);
    }

    #[test]
    fn test_platform_for_unsupported() {
        let err = platform_for("freebsd", "x86_64").unwrap_err();
        assert!(err.to_string().contains("freebsd-x86_64"));
    }

    #[test]
    fn test_asset_url_substitutes_version() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, crate::config::DEFAULT_RELEASE_URL);
        let url = installer.asset_url("12.1.0").unwrap();
        assert!(url.starts_with(
            "https://github.com/aws-amplify/amplify-cli/releases/download/v12.1.0/amplify-pkg-"
        ));
        assert!(url.ends_with(".tgz"));
        assert!(!url.contains('{'));
    }

    #[rstest]
    #[case("https://example.com/releases/v1/amplify-pkg-linux-x64.tgz", "amplify-pkg-linux-x64.tgz")]
    #[case("/srv/mirror/amplify-1.0.0.tar.gz", "amplify-1.0.0.tar.gz")]
    fn test_archive_file_name(#[case] location: &str, #[case] expected: &str) {
        assert_eq!(archive_file_name(location).unwrap(), expected);
    }

    #[test]
    fn test_locate_executable_packaged_name() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/amplify-pkg-linux-x64"), "bin").unwrap();
        fs::write(temp.path().join("README.md"), "docs").unwrap();

        let found = locate_executable(temp.path(), "amplify").unwrap();
        assert!(found.ends_with("nested/amplify-pkg-linux-x64"));
    }

    #[test]
    fn test_locate_executable_missing_and_ambiguous() {
        let temp = TempDir::new().unwrap();
        let err = locate_executable(temp.path(), "amplify").unwrap_err();
        assert!(err.to_string().contains("not found"));

        fs::write(temp.path().join("amplify"), "a").unwrap();
        fs::write(temp.path().join("amplify-pkg-macos-x64"), "b").unwrap();
        let err = locate_executable(temp.path(), "amplify").unwrap_err();
        assert!(err.to_string().contains("multiple"));
    }

    #[test]
    fn test_install_from_local_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("amplify-12.0.0.tgz");
        write_tgz(&archive, &[("package/amplify-pkg-linux-x64", b"#!/bin/sh\n".as_slice())]);
        let template = temp.path().join("amplify-{version}.tgz");
        let installer = installer(&temp, template.to_str().unwrap());

        assert!(!installer.is_installed("12.0.0"));
        let path = installer.install("12.0.0").unwrap();

        assert!(installer.is_installed("12.0.0"));
        assert_eq!(path, installer.binary_path("12.0.0"));
        assert_eq!(fs::read(&path).unwrap(), b"#!/bin/sh\n");

        // Only the installed version remains in the versions directory
        let entries: Vec<_> = fs::read_dir(temp.path().join("avm"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["12.0.0"]);
        let version_entries: Vec<_> = fs::read_dir(temp.path().join("avm/12.0.0"))
            .unwrap()
            .collect();
        assert_eq!(version_entries.len(), 1);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_install_replaces_version_dir_without_binary() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("amplify-12.0.0.tgz");
        write_tgz(&archive, &[("package/amplify-pkg-linux-x64", b"fresh".as_slice())]);
        let template = temp.path().join("amplify-{version}.tgz");
        let installer = installer(&temp, template.to_str().unwrap());

        let leftover = temp.path().join("avm/12.0.0");
        fs::create_dir_all(&leftover).unwrap();
        fs::write(leftover.join("README.md"), "partial copy").unwrap();
        assert!(!installer.is_installed("12.0.0"));

        let path = installer.install("12.0.0").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"fresh");
        assert!(!leftover.join("README.md").exists());
        // A second attempt is a no-op once the binary is in place
        assert_eq!(installer.install("12.0.0").unwrap(), path);
    }

    #[test]
    fn test_install_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, "/nonexistent/amplify-{version}.tgz");
        let binary = installer.binary_path("12.0.0");
        fs::create_dir_all(binary.parent().unwrap()).unwrap();
        fs::write(&binary, "existing").unwrap();

        let path = installer.install("12.0.0").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "existing");
    }

    #[test]
    fn test_failed_install_wraps_cause_and_cleans_staging() {
        let temp = TempDir::new().unwrap();
        let installer = installer(&temp, "/nonexistent/amplify-{version}.tgz");

        let err = installer.install("12.0.0").unwrap_err();
        assert!(matches!(err, Error::Install { .. }));
        assert_eq!(err.to_string(), "Failed to install @aws-amplify/cli@12.0.0");

        let leftovers = fs::read_dir(temp.path().join("avm")).unwrap().count();
        assert_eq!(leftovers, 0);
        assert!(!installer.is_installed("12.0.0"));
    }
}
