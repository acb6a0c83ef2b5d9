//! Metadata format versions and version ranges.
//!
//! IL2CPP does not have a single metadata format. Unity revises individual record layouts
//! between releases, and the community numbers those revisions as decimals (`24.1`, `24.15`,
//! `27.2`, ...). Every layout decision is gated on comparisons against that number, which is why
//! comparisons here tolerate a small epsilon instead of relying on exact float equality.

use std::fmt;

const EPSILON: f32 = 0.001;

/// The decimal format revision of a loaded metadata blob.
///
/// Equality is epsilon based (`24.1` written in code equals `24.1` parsed from elsewhere).
#[derive(Clone, Copy, Default)]
pub struct MetadataVersion(f32);

impl MetadataVersion {
    /// Lowest revision with a known layout
    pub const MIN_SUPPORTED: MetadataVersion = MetadataVersion(23.0);
    /// Highest revision with a known layout
    pub const MAX_SUPPORTED: MetadataVersion = MetadataVersion(31.0);

    /// Wrap a raw revision number
    #[must_use]
    pub const fn new(version: f32) -> Self {
        MetadataVersion(version)
    }

    /// The raw revision number
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// `self >= version`
    #[must_use]
    pub fn is_at_least(self, version: f32) -> bool {
        self.0 - version > -EPSILON
    }

    /// `self <= version`
    #[must_use]
    pub fn is_at_most(self, version: f32) -> bool {
        self.0 - version < EPSILON
    }

    /// `self < version`
    #[must_use]
    pub fn is_less_than(self, version: f32) -> bool {
        !self.is_at_least(version)
    }

    /// `self == version`
    #[must_use]
    pub fn is(self, version: f32) -> bool {
        (self.0 - version).abs() < EPSILON
    }

    /// `self != version`
    #[must_use]
    pub fn is_not(self, version: f32) -> bool {
        !self.is(version)
    }

    /// True if any range of `ranges` contains this version, or if `ranges` is empty
    #[must_use]
    pub fn within(self, ranges: &[VersionRange]) -> bool {
        ranges.is_empty() || ranges.iter().any(|range| range.contains(self))
    }

    /// True if this crate knows the record layouts of this version
    #[must_use]
    pub fn is_supported(self) -> bool {
        self.is_at_least(Self::MIN_SUPPORTED.0) && self.is_at_most(Self::MAX_SUPPORTED.0)
    }
}

impl PartialEq for MetadataVersion {
    fn eq(&self, other: &Self) -> bool {
        self.is(other.0)
    }
}

impl PartialOrd for MetadataVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.is(other.0) {
            Some(std::cmp::Ordering::Equal)
        } else {
            self.0.partial_cmp(&other.0)
        }
    }
}

impl From<f32> for MetadataVersion {
    fn from(version: f32) -> Self {
        MetadataVersion(version)
    }
}

impl fmt::Debug for MetadataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:?}", self.0)
    }
}

impl fmt::Display for MetadataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// An inclusive version interval; absent bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VersionRange {
    /// Lowest included version
    pub min: Option<f32>,
    /// Highest included version
    pub max: Option<f32>,
}

impl VersionRange {
    /// Every version
    pub const ANY: VersionRange = VersionRange {
        min: None,
        max: None,
    };

    /// `[min, ∞)`
    #[must_use]
    pub const fn since(min: f32) -> Self {
        VersionRange {
            min: Some(min),
            max: None,
        }
    }

    /// `(-∞, max]`
    #[must_use]
    pub const fn until(max: f32) -> Self {
        VersionRange {
            min: None,
            max: Some(max),
        }
    }

    /// `[min, max]`
    #[must_use]
    pub const fn between(min: f32, max: f32) -> Self {
        VersionRange {
            min: Some(min),
            max: Some(max),
        }
    }

    /// `[version, version]`
    #[must_use]
    pub const fn only(version: f32) -> Self {
        Self::between(version, version)
    }

    /// True if `version` lies inside this range
    #[must_use]
    pub fn contains(&self, version: MetadataVersion) -> bool {
        self.min.map_or(true, |min| version.is_at_least(min))
            && self.max.map_or(true, |max| version.is_at_most(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon_comparisons() {
        let version = MetadataVersion::new(24.1);

        assert!(version.is(24.1));
        assert!(version.is(24.1005));
        assert!(version.is_not(24.15));
        assert!(version.is_at_least(24.1));
        assert!(version.is_at_most(24.1));
        assert!(version.is_less_than(24.15));
        assert!(!version.is_less_than(24.1));
        assert_eq!(version, MetadataVersion::from(24.1_f32));
    }

    #[test]
    fn test_ranges() {
        let hash_value = [VersionRange::until(24.1), VersionRange::between(24.2, 24.3)];

        assert!(MetadataVersion::new(24.0).within(&hash_value));
        assert!(MetadataVersion::new(24.1).within(&hash_value));
        assert!(!MetadataVersion::new(24.15).within(&hash_value));
        assert!(MetadataVersion::new(24.2).within(&hash_value));
        assert!(MetadataVersion::new(24.3).within(&hash_value));
        assert!(!MetadataVersion::new(24.4).within(&hash_value));
        assert!(!MetadataVersion::new(29.0).within(&hash_value));

        assert!(MetadataVersion::new(29.0).within(&[]));
        assert!(VersionRange::ANY.contains(MetadataVersion::new(1.0)));
        assert!(VersionRange::only(27.1).contains(MetadataVersion::new(27.1)));
        assert!(!VersionRange::only(27.1).contains(MetadataVersion::new(27.2)));
    }

    #[test]
    fn test_supported() {
        assert!(MetadataVersion::new(24.5).is_supported());
        assert!(MetadataVersion::new(31.0).is_supported());
        assert!(!MetadataVersion::new(22.0).is_supported());
        assert!(!MetadataVersion::new(32.0).is_supported());
    }

    #[test]
    fn test_display() {
        assert_eq!(MetadataVersion::new(27.0).to_string(), "27.0");
        assert_eq!(MetadataVersion::new(24.15).to_string(), "24.15");
    }
}
