use crate::layout::{Layout, LayoutPath};
use crate::ui;
use anyhow::Result;

pub fn execute(layout: &Layout) -> Result<()> {
    ui::plain(layout.path(LayoutPath::Bin).display());
    Ok(())
}
