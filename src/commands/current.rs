use crate::config::Settings;
use crate::layout::{Layout, LayoutPath};
use crate::{switcher, ui};
use anyhow::Result;
use std::fs;

pub fn execute(settings: &Settings, layout: &Layout) -> Result<()> {
    if let Some(version) = switcher::active_version(layout) {
        ui::plain(version);
        return Ok(());
    }

    let link = layout.path(LayoutPath::ActiveBinary);
    if fs::symlink_metadata(&link).is_ok() {
        ui::warn(format!(
            "{} does not point at a version installed by avm",
            link.display()
        ));
    } else {
        ui::info(format!(
            "No active {} version. Run 'avm use <version>' to select one.",
            settings.package
        ));
    }
    Ok(())
}
