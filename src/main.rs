use avm::cli::Cli;
use avm::{commands, ui};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();
    let debug = cli.debug;

    // Initialize tracing; RUST_LOG takes precedence over --debug
    let default_filter = if debug { "avm=debug" } else { "avm=warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match commands::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&err);
            if debug {
                for cause in err.chain().skip(1) {
                    ui::error_detail(format!("caused by: {cause}"));
                }
            }
            ExitCode::FAILURE
        }
    }
}
