use crate::installers::list_installed;
use crate::layout::Layout;
use crate::{switcher, ui};
use anyhow::Result;

pub fn execute(layout: &Layout) -> Result<()> {
    let versions = list_installed(layout)?;
    if versions.is_empty() {
        ui::info("No versions installed");
        return Ok(());
    }

    let active = switcher::active_version(layout);
    for version in versions {
        if active.as_deref() == Some(version.as_str()) {
            ui::success("Active", &version);
        } else {
            ui::status("Installed", &version);
        }
    }
    Ok(())
}
