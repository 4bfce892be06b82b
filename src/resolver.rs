//! Version specifier validation and resolution.
//!
//! Resolution is split in two steps: [`VersionSpecifier::parse`] is a pure
//! syntactic check that runs before any network access, and [`resolve`] maps a
//! validated specifier onto one exact version using registry metadata.

use regex::Regex;
use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::registry::{MetadataSource, RegistryMetadata};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z*^~<>=][0-9A-Za-z.+\-_^~<>=*| ]*$").expect("valid token regex")
});

/// A user supplied version: exact semver, dist-tag, or range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    raw: String,
    exact: Option<Version>,
}

impl VersionSpecifier {
    /// Validate a raw token without consulting the registry.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() || !TOKEN.is_match(raw) {
            return Err(Error::VersionInvalid {
                input: input.to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            exact: Version::parse(raw).ok(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed version when the specifier is already an exact semver.
    pub fn exact(&self) -> Option<&Version> {
        self.exact.as_ref()
    }
}

impl FromStr for VersionSpecifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Resolve a raw input string against registry metadata.
pub fn resolve(input: &str, metadata: &RegistryMetadata) -> Result<String> {
    resolve_specifier(&VersionSpecifier::parse(input)?, metadata)
}

/// Resolve a validated specifier to one exact version.
///
/// Precedence is exact semver, then dist-tag, then the highest version
/// satisfying the specifier as a range.
pub fn resolve_specifier(spec: &VersionSpecifier, metadata: &RegistryMetadata) -> Result<String> {
    if spec.exact().is_some() {
        return Ok(spec.raw.clone());
    }

    if let Some(tagged) = metadata.tags.get(spec.as_str()) {
        if Version::parse(tagged).is_err() {
            return Err(Error::VersionInvalid {
                input: tagged.clone(),
            });
        }
        return Ok(tagged.clone());
    }

    max_satisfying(&metadata.versions, spec.as_str()).ok_or_else(|| Error::VersionNotFound {
        input: spec.raw.clone(),
    })
}

/// Resolve a validated specifier, fetching registry metadata only when needed.
///
/// Exact versions resolve to themselves, so they never touch the network.
pub fn resolve_from(spec: &VersionSpecifier, source: &impl MetadataSource) -> Result<String> {
    if spec.exact().is_some() {
        debug!(version = spec.as_str(), "exact version, skipping registry lookup");
        return Ok(spec.raw.clone());
    }

    let metadata = source.fetch_metadata()?;
    let resolved = resolve_specifier(spec, &metadata)?;
    debug!(input = spec.as_str(), %resolved, "resolved version");
    Ok(resolved)
}

/// Highest entry of `versions` matching the npm-style `range`.
///
/// Entries that are not valid semver are ignored, as is a range that cannot
/// be parsed.
pub fn max_satisfying(versions: &[String], range: &str) -> Option<String> {
    let alternatives = parse_range(range)?;

    versions
        .iter()
        .filter_map(|raw| Version::parse(raw).ok().map(|parsed| (parsed, raw)))
        .filter(|(parsed, _)| alternatives.iter().any(|req| req.matches(parsed)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.clone())
}

/// Parse an npm range into its `||` alternatives.
fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range
        .split("||")
        .map(|alternative| {
            let normalized = normalize_alternative(alternative.trim())?;
            VersionReq::parse(&normalized).ok()
        })
        .collect()
}

/// Rewrite one npm comparator set into `semver::VersionReq` syntax.
fn normalize_alternative(alternative: &str) -> Option<String> {
    if alternative.is_empty() {
        return Some("*".to_string());
    }

    if let Some((low, high)) = alternative.split_once(" - ") {
        let low = strip_v(low.trim());
        let high = strip_v(high.trim());
        if low.is_empty() || high.is_empty() {
            return None;
        }
        return Some(format!(">={low}, <={high}"));
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in alternative.split_whitespace() {
        if token.chars().all(is_operator) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{pending_op}{token}");
        pending_op.clear();
        comparators.push(normalize_comparator(&token));
    }
    if !pending_op.is_empty() {
        return None;
    }

    Some(comparators.join(", "))
}

fn normalize_comparator(token: &str) -> String {
    let split = token.find(|c: char| !is_operator(c)).unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = strip_v(version);

    if !op.is_empty() {
        return format!("{op}{version}");
    }

    if matches!(version, "" | "*" | "x" | "X") {
        return "*".to_string();
    }

    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts: Vec<&str> = core.split('.').collect();
    let has_wildcard = parts.iter().any(|part| matches!(*part, "*" | "x" | "X"));

    if has_wildcard {
        version.to_string()
    } else if parts.len() < 3 {
        // "11" and "11.2" are x-ranges, not caret ranges
        format!("{version}.*")
    } else {
        format!("={version}")
    }
}

fn is_operator(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '~' | '^')
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}
