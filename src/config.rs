use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_PACKAGE: &str = "@aws-amplify/cli";
pub const DEFAULT_BINARY_NAME: &str = "amplify";
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_RELEASE_URL: &str =
    "https://github.com/aws-amplify/amplify-cli/releases/download/v{version}/amplify-pkg-{platform}.tgz";

/// On-disk representation of `config.toml`; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    package: Option<String>,
    binary_name: Option<String>,
    registry_url: Option<String>,
    release_url: Option<String>,
    versions_dir: Option<String>,
    bin_dir: Option<String>,
}

/// Resolved avm configuration.
///
/// Built once per invocation and handed to every component, so nothing
/// below the command layer looks at the environment or the home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Registry package name, e.g. `@aws-amplify/cli`
    pub package: String,
    /// File name of the managed executable (without platform suffix)
    pub binary_name: String,
    /// Registry base URL without trailing slash
    pub registry_url: String,
    /// Release archive URL template with `{version}` and `{platform}`
    pub release_url: String,
    /// One subdirectory per installed version
    pub versions_dir: PathBuf,
    /// Directory holding the active binary link
    pub bin_dir: PathBuf,
}

impl Settings {
    /// Load settings from the config file and `AVM_*` environment overrides.
    ///
    /// The config file is `$AVM_CONFIG` if set, otherwise
    /// `$XDG_CONFIG_HOME/avm/config.toml`. A missing file is not an error.
    pub fn load() -> Result<Self> {
        let home = home_dir()?;
        let config_path = match env_override("AVM_CONFIG") {
            Some(path) => PathBuf::from(expand_path(&path)?),
            None => config_dir()?.join("config.toml"),
        };

        let file = SettingsFile::load(&config_path)?;
        Self::from_parts(file, &home)
    }

    /// Settings with default endpoints and explicit directory roots.
    pub fn with_dirs(versions_dir: impl Into<PathBuf>, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            package: DEFAULT_PACKAGE.to_string(),
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            release_url: DEFAULT_RELEASE_URL.to_string(),
            versions_dir: versions_dir.into(),
            bin_dir: bin_dir.into(),
        }
    }

    fn from_parts(file: SettingsFile, home: &Path) -> Result<Self> {
        let mut settings = Self::with_dirs(home.join(".avm"), home.join(".amplify").join("bin"));

        if let Some(package) = file.package {
            settings.package = package;
        }
        if let Some(binary_name) = file.binary_name {
            settings.binary_name = binary_name;
        }

        let registry = env_override("AVM_REGISTRY").or(file.registry_url);
        if let Some(registry) = registry {
            settings.registry_url = registry;
        }
        let release = env_override("AVM_RELEASE_URL").or(file.release_url);
        if let Some(release) = release {
            settings.release_url = release;
        }

        let versions_dir = env_override("AVM_DIR").or(file.versions_dir);
        if let Some(dir) = versions_dir {
            settings.versions_dir = PathBuf::from(expand_path(&dir)?);
        }
        let bin_dir = env_override("AVM_BIN_DIR").or(file.bin_dir);
        if let Some(dir) = bin_dir {
            settings.bin_dir = PathBuf::from(expand_path(&dir)?);
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&mut self) -> Result<()> {
        let trimmed = self.registry_url.trim().trim_end_matches('/').to_string();
        Url::parse(&trimmed)
            .with_context(|| format!("Invalid registry_url '{}'", self.registry_url))?;
        self.registry_url = trimmed;

        if !self.release_url.contains("{version}") {
            anyhow::bail!(
                "release_url '{}' must contain a {{version}} placeholder",
                self.release_url
            );
        }

        if self.package.trim().is_empty() {
            anyhow::bail!("package must not be empty");
        }
        if self.binary_name.trim().is_empty() || self.binary_name.contains(['/', '\\']) {
            anyhow::bail!("binary_name '{}' must be a plain file name", self.binary_name);
        }

        Ok(())
    }
}

impl SettingsFile {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {:?}", path))
    }
}

fn env_override(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn expand_path(value: &str) -> Result<String> {
    shellexpand::full(value)
        .map(|expanded| expanded.into_owned())
        .map_err(|err| anyhow::anyhow!("Failed to expand path '{}': {}", value, err))
}

/// Get the XDG config directory for avm
///
/// Returns `$XDG_CONFIG_HOME/avm` or `~/.config/avm` if not set
pub fn config_dir() -> Result<PathBuf> {
    let base = match env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir()?.join(".config"),
    };

    Ok(base.join("avm"))
}

/// Get the home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .context("Failed to get home directory")
        .map(|bd| bd.home_dir().to_path_buf())
}
