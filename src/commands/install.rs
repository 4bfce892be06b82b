use crate::config::Settings;
use crate::installers::{Installer, ReleaseInstaller};
use crate::layout::Layout;
use crate::registry::RegistryClient;
use crate::resolver::{resolve_from, VersionSpecifier};
use crate::ui;
use anyhow::Result;

pub fn execute(settings: &Settings, layout: &Layout, version: &str) -> Result<()> {
    let version = resolve_requested(settings, version)?;
    let installer = ReleaseInstaller::new(settings, layout.clone())?;
    let target = format!("{}@{}", settings.package, version);

    if installer.is_installed(&version) {
        ui::info(format!("{target} is already installed"));
        return Ok(());
    }

    install_version(&installer, &target, &version)
}

/// Validate the raw input, then resolve it against the registry.
///
/// Shared by `install` and `use` so both accept the same specifiers.
pub(super) fn resolve_requested(settings: &Settings, input: &str) -> Result<String> {
    let spec = VersionSpecifier::parse(input)?;
    let registry = RegistryClient::new(settings)?;
    Ok(resolve_from(&spec, &registry)?)
}

pub(super) fn install_version(installer: &impl Installer, target: &str, version: &str) -> Result<()> {
    let progress = ui::Progress::new("Installing", target);
    match installer.install(version) {
        Ok(_) => {
            progress.success("Installed");
            Ok(())
        }
        Err(err) => {
            progress.dismiss();
            Err(err.into())
        }
    }
}
