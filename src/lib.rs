// Public API
pub mod cli;
pub mod commands;
pub mod ui;

// Core domain types
pub mod config;
pub mod error;
pub mod installers;
pub mod layout;
pub mod registry;
pub mod resolver;
pub mod switcher;

// Re-export main types
pub use config::Settings;
pub use error::{Error, Result};
pub use installers::{list_installed, Installer, ReleaseInstaller};
pub use layout::{Layout, LayoutPath};
pub use registry::{MetadataSource, RegistryClient, RegistryMetadata};
pub use resolver::{resolve, resolve_from, resolve_specifier, VersionSpecifier};
pub use switcher::{active_version, switch_to};
