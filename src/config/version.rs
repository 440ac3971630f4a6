//! Editor-version gating for profiles using semver constraints.
//!
//! Unity editor versions carry a release suffix on the patch component
//! ("2021.3.44f1", "6000.0.23b2") that semver cannot parse; they are
//! normalized first, then profiles gate with ranges like ">=2021.3, <6000".

use semver::{Version, VersionReq};
use std::fmt;

/// Errors during version filtering
#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Normalize an editor version to plain semver.
///
/// Takes the leading digit run of each dot component ("44f1" becomes "44"),
/// keeps at most three components, and pads missing ones with zero.
///
/// # Examples
///
/// ```
/// use variant_patcher::config::version::normalize_editor_version;
///
/// assert_eq!(normalize_editor_version("2021.3.44f1").unwrap(), "2021.3.44");
/// assert_eq!(normalize_editor_version("6000.0.23b2").unwrap(), "6000.0.23");
/// assert_eq!(normalize_editor_version("2021.3").unwrap(), "2021.3.0");
/// ```
pub fn normalize_editor_version(raw: &str) -> Result<String, VersionError> {
    let raw = raw.trim();
    let mut parts: Vec<String> = Vec::with_capacity(3);

    for component in raw.split('.').take(3) {
        let digits: String = component
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            return Err(VersionError::InvalidVersion {
                value: raw.to_string(),
                source: "version component has no leading digits".to_string(),
            });
        }
        parts.push(digits);
    }

    while parts.len() < 3 {
        parts.push("0".to_string());
    }

    Ok(parts.join("."))
}

/// Check if a (normalized) version matches a requirement string
///
/// # Examples
///
/// ```
/// use variant_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("2021.3.44", Some(">=2021.3")).unwrap());
/// assert!(matches_requirement("2022.3.5", Some(">=2021.3, <6000.0")).unwrap());
/// assert!(!matches_requirement("2019.4.40", Some(">=2021.3")).unwrap());
///
/// // None requirement means "apply to all versions"
/// assert!(matches_requirement("6000.0.23", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    // No requirement means "apply to all versions"
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    // Empty requirement string means "apply to all versions"
    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    // Parse version
    let version = Version::parse(version).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    // Parse requirement
    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}
