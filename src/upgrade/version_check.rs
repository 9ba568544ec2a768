//! Version comparison for self-update decisions.
//!
//! Release tags and the running version may or may not carry a leading `v`.
//! Both sides are normalized before comparing. When both parse as semantic
//! versions they are ordered by semver precedence (`1.2.0 < 1.10.0`); when
//! either side does not, the comparison degrades to "same or different" on
//! the normalized strings and a warning is logged, since that fallback cannot
//! tell an older tag from a newer one.
//!
//! The development marker `dev` is never updatable.

use semver::Version;
use std::cmp::Ordering;
use tracing::warn;

use crate::constants::DEV_VERSION;

/// How the latest version relates to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    /// Latest is strictly newer
    Newer,
    /// Both denote the same release
    Same,
    /// Latest is strictly older
    Older,
    /// Not both semver and the normalized strings differ
    Incomparable,
}

impl VersionComparison {
    /// The comparison with both sides swapped.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Newer => Self::Older,
            Self::Older => Self::Newer,
            other => other,
        }
    }
}

/// Strip surrounding whitespace and one leading `v`/`V`.
#[must_use]
pub fn normalize_version(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed)
}

/// Whether `version` is the development marker.
#[must_use]
pub fn is_dev_version(version: &str) -> bool {
    normalize_version(version) == DEV_VERSION
}

/// Parse a tag as semver, accepting a `v` prefix and `MAJOR` / `MAJOR.MINOR` shorthand.
#[must_use]
pub fn parse_version(version: &str) -> Option<Version> {
    let normalized = normalize_version(version);
    if let Ok(parsed) = Version::parse(normalized) {
        return Some(parsed);
    }

    let parts: Vec<&str> = normalized.split('.').collect();
    let numeric = parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    if !numeric || parts.len() > 2 {
        return None;
    }
    let mut padded = parts.clone();
    padded.resize(3, "0");
    Version::parse(&padded.join(".")).ok()
}

/// Compare `latest` against `current`.
#[must_use]
pub fn compare_versions(current: &str, latest: &str) -> VersionComparison {
    match (parse_version(current), parse_version(latest)) {
        (Some(current), Some(latest)) => match latest.cmp_precedence(&current) {
            Ordering::Greater => VersionComparison::Newer,
            Ordering::Equal => VersionComparison::Same,
            Ordering::Less => VersionComparison::Older,
        },
        _ => {
            if normalize_version(current) == normalize_version(latest) {
                VersionComparison::Same
            } else {
                VersionComparison::Incomparable
            }
        }
    }
}

/// The running version and the latest published version, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPair {
    current: String,
    latest: String,
}

impl VersionPair {
    /// Build a pair, normalizing both sides.
    pub fn new(current: &str, latest: &str) -> Self {
        Self {
            current: normalize_version(current).to_string(),
            latest: normalize_version(latest).to_string(),
        }
    }

    /// Normalized running version.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Normalized latest version.
    #[must_use]
    pub fn latest(&self) -> &str {
        &self.latest
    }

    /// Relation of latest to current.
    #[must_use]
    pub fn comparison(&self) -> VersionComparison {
        compare_versions(&self.current, &self.latest)
    }

    /// Whether installing `latest` would be an update.
    ///
    /// Never true for a development build. Non-semver tags that differ count
    /// as an update, with a warning.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        if is_dev_version(&self.current) {
            return false;
        }

        match self.comparison() {
            VersionComparison::Newer => true,
            VersionComparison::Same | VersionComparison::Older => false,
            VersionComparison::Incomparable => {
                warn!(
                    "Cannot order versions '{}' and '{}' semantically; treating the difference as an update",
                    self.current, self.latest
                );
                true
            }
        }
    }
}

/// Format version information for status display.
pub fn format_version_info(current: &str, latest: Option<&str>) -> String {
    if is_dev_version(current) {
        let dev = format!("Current version: {current} (development build, never self-updates)");
        return match latest {
            Some(v) => format!("{dev}\nLatest version:  {v}"),
            None => dev,
        };
    }

    match latest {
        Some(v) if compare_versions(current, v) != VersionComparison::Same => {
            format!("Current version: {current}\nLatest version:  {v} (update available)")
        }
        _ => format!("Current version: {current} (up to date)"),
    }
}
