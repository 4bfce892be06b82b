use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::Settings;
use crate::error::{Error, Result};

const DEFAULT_USER_AGENT: &str = concat!("avm/", env!("CARGO_PKG_VERSION"));

/// Published versions and dist-tags of the managed package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryMetadata {
    /// Every published version string
    pub versions: Vec<String>,
    /// Dist-tag name to exact version
    pub tags: BTreeMap<String, String>,
}

/// Subset of the npm packument avm reads.
#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(rename = "dist-tags")]
    dist_tags: Option<BTreeMap<String, String>>,
    versions: Option<BTreeMap<String, IgnoredAny>>,
}

impl RegistryMetadata {
    /// Extract metadata from a registry package document.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let document: PackageDocument = serde_json::from_slice(body)
            .map_err(|err| Error::malformed(format!("invalid package document: {err}")))?;
        Self::from_document(document)
    }

    fn from_document(document: PackageDocument) -> Result<Self> {
        let versions = document
            .versions
            .ok_or_else(|| Error::malformed("Failed to get versions"))?;
        let tags = document
            .dist_tags
            .ok_or_else(|| Error::malformed("Failed to get tags"))?;

        Ok(Self {
            versions: versions.into_keys().collect(),
            tags,
        })
    }
}

/// Source of registry metadata for the managed package.
pub trait MetadataSource {
    fn fetch_metadata(&self) -> Result<RegistryMetadata>;
}

/// Blocking npm registry client for a single package.
#[derive(Clone)]
pub struct RegistryClient {
    http: Client,
    package_url: String,
}

impl RegistryClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let package_url = package_endpoint(&settings.registry_url, &settings.package);
        let http = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|err| Error::RegistryUnavailable {
                url: package_url.clone(),
                source: Box::new(err),
            })?;

        Ok(Self { http, package_url })
    }

    pub fn package_url(&self) -> &str {
        &self.package_url
    }
}

impl MetadataSource for RegistryClient {
    /// GET /<package> and extract versions and dist-tags.
    fn fetch_metadata(&self) -> Result<RegistryMetadata> {
        debug!(url = %self.package_url, "fetching package metadata");

        let response = self
            .http
            .get(&self.package_url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| Error::RegistryUnavailable {
                url: self.package_url.clone(),
                source: Box::new(err),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::registry_status(&self.package_url, status));
        }

        let body = response.bytes().map_err(|err| Error::RegistryUnavailable {
            url: self.package_url.clone(),
            source: Box::new(err),
        })?;

        let metadata = RegistryMetadata::from_json(&body)?;
        debug!(
            versions = metadata.versions.len(),
            tags = metadata.tags.len(),
            "received package metadata"
        );
        Ok(metadata)
    }
}

/// Full metadata URL for a package, scoped names encoded as `@scope%2fname`.
pub(crate) fn package_endpoint(registry_url: &str, package: &str) -> String {
    let base = registry_url.trim_end_matches('/');
    format!("{base}/{}", encode_package_name(package))
}

fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2f", 1)
    } else {
        name.to_string()
    }
}
