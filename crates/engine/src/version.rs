//! Semantic version parsing and bumping for contract versions.

use semver::Version;

use crate::diff::ChangeType;
use crate::error::{EngineError, Result};

/// Version assigned to the first contract of an asset when the publisher
/// does not supply one.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Parse a strict semantic version (`major.minor.patch[-pre][+build]`).
pub fn parse_version(raw: &str) -> Result<Version> {
    Version::parse(raw).map_err(|_| EngineError::InvalidVersion(raw.to_string()))
}

/// Bump a version according to the classified change type.
///
/// Pre-release and build metadata are cleared: a bumped version is always a
/// plain release.
pub fn bump(version: &Version, change_type: ChangeType) -> Version {
    match change_type {
        ChangeType::Major => Version::new(version.major + 1, 0, 0),
        ChangeType::Minor => Version::new(version.major, version.minor + 1, 0),
        ChangeType::Patch => Version::new(version.major, version.minor, version.patch + 1),
    }
}

/// Require `candidate` to be strictly greater than `predecessor`.
pub fn ensure_greater(candidate: &Version, predecessor: &Version) -> Result<()> {
    if candidate > predecessor {
        Ok(())
    } else {
        Err(EngineError::VersionNotGreater {
            candidate: candidate.to_string(),
            predecessor: predecessor.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        let v = parse_version("1.2.3").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let v = parse_version("2.0.0-rc.1+build.5").unwrap();
        assert_eq!(v.major, 2);
        assert_eq!(v.pre.as_str(), "rc.1");
        assert_eq!(v.build.as_str(), "build.5");
    }

    #[test]
    fn test_parse_rejects_partial_version() {
        assert!(parse_version("1.2").is_err());
        assert!(parse_version("v1.2.3").is_err());
        assert!(parse_version("").is_err());
    }

    #[test]
    fn test_bump_major_resets_minor_and_patch() {
        let v = parse_version("1.4.7").unwrap();
        assert_eq!(bump(&v, ChangeType::Major).to_string(), "2.0.0");
    }

    #[test]
    fn test_bump_minor_resets_patch() {
        let v = parse_version("1.4.7").unwrap();
        assert_eq!(bump(&v, ChangeType::Minor).to_string(), "1.5.0");
    }

    #[test]
    fn test_bump_patch() {
        let v = parse_version("1.4.7").unwrap();
        assert_eq!(bump(&v, ChangeType::Patch).to_string(), "1.4.8");
    }

    #[test]
    fn test_bump_clears_prerelease() {
        let v = parse_version("1.0.0-beta.2").unwrap();
        assert_eq!(bump(&v, ChangeType::Patch).to_string(), "1.0.1");
    }

    #[test]
    fn test_ensure_greater() {
        let old = parse_version("1.0.0").unwrap();
        let new = parse_version("1.0.1").unwrap();
        assert!(ensure_greater(&new, &old).is_ok());
        assert!(ensure_greater(&old, &new).is_err());
        assert!(ensure_greater(&old, &old).is_err());
    }
}
