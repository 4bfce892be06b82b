use super::install::{install_version, resolve_requested};
use crate::config::Settings;
use crate::installers::{Installer, ReleaseInstaller};
use crate::layout::Layout;
use crate::{switcher, ui};
use anyhow::Result;

pub fn execute(settings: &Settings, layout: &Layout, version: &str, assume_yes: bool) -> Result<()> {
    let version = resolve_requested(settings, version)?;
    let installer = ReleaseInstaller::new(settings, layout.clone())?;
    let target = format!("{}@{}", settings.package, version);

    if !installer.is_installed(&version) {
        let question = format!("{target} is not installed. Install now?");
        if !assume_yes && !ui::confirm(&question)? {
            return Ok(());
        }
        install_version(&installer, &target, &version)?;
    }

    switcher::switch_to(layout, &version)?;
    ui::success("Now using", &target);
    Ok(())
}
