use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::layout::Layout;
use anyhow::Result;

mod bin;
mod current;
mod install;
mod list;
mod use_version;

pub fn execute(cli: Cli) -> Result<()> {
    // Settings and layout are resolved once and passed down explicitly
    let settings = Settings::load()?;
    let layout = Layout::new(&settings);

    match cli.command {
        Commands::Install { version } => install::execute(&settings, &layout, &version),

        Commands::Use { version, yes } => use_version::execute(&settings, &layout, &version, yes),

        Commands::Bin => bin::execute(&layout),

        Commands::List => list::execute(&layout),

        Commands::Current => current::execute(&settings, &layout),
    }
}
