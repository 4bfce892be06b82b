use std::path::PathBuf;

/// Failures surfaced to the user by avm commands.
///
/// Each variant renders as a single line; underlying causes are reachable
/// through [`std::error::Error::source`] and only printed in debug mode.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("version must be a valid semver string")]
    VersionInvalid { input: String },

    #[error("version not found")]
    VersionNotFound { input: String },

    #[error("Failed to reach package registry at {url}")]
    RegistryUnavailable {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unexpected response from package registry: {reason}")]
    MalformedResponse { reason: String },

    #[error("Failed to install {package}@{version}")]
    Install {
        package: String,
        version: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to create symlink")]
    SymlinkSwapFailed {
        link: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn registry_status(url: &str, status: reqwest::StatusCode) -> Self {
        Error::RegistryUnavailable {
            url: url.to_string(),
            source: format!("registry returned HTTP {status}").into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn install_error_hides_cause_in_message() {
        let err = Error::Install {
            package: "@aws-amplify/cli".to_string(),
            version: "12.0.0".to_string(),
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(err.to_string(), "Failed to install @aws-amplify/cli@12.0.0");
        assert_eq!(err.source().unwrap().to_string(), "connection reset");
    }

    #[test]
    fn registry_status_carries_code() {
        let err = Error::registry_status(
            "https://registry.npmjs.org/@aws-amplify%2fcli",
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
        );
        assert!(err.to_string().contains("registry.npmjs.org"));
        assert!(err.source().unwrap().to_string().contains("503"));
    }
}
