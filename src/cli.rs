use clap::{Parser, Subcommand};

/// Amplify Version Manager - Install and switch @aws-amplify/cli versions
///
/// avm resolves a version, dist-tag or semver range against the npm registry,
/// installs the matching release binary under ~/.avm and points the active
/// `amplify` link at it.
#[derive(Parser, Debug)]
#[command(name = "avm", author, version, about, long_about = None)]
pub struct Cli {
    /// Print the underlying cause of failures and enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a specific version
    Install {
        /// Exact version, dist-tag (e.g. latest, beta) or range (e.g. 12, ^12.1)
        #[arg(value_name = "VERSION")]
        version: String,
    },

    /// Use a specific version, installing it first if needed
    Use {
        /// Exact version, dist-tag (e.g. latest, beta) or range (e.g. 12, ^12.1)
        #[arg(value_name = "VERSION")]
        version: String,

        /// Install without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the directory holding the active binary
    Bin,

    /// List installed versions
    List,

    /// Print the active version
    Current,
}
