use std::fmt;
use std::str::FromStr;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Semantic version of a module.
///
/// Ordering follows semver precedence, so pre-release versions sort before
/// the release they lead up to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleVersion(Version);

impl ModuleVersion {
    /// Creates a release version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    /// Parses a version string like "1.2.3" or "1.2.3-alpha.1"
    pub fn parse(version: &str) -> Result<Self, semver::Error> {
        Version::parse(version.trim()).map(Self)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn is_pre_release(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// First version outside this version's patch line.
    ///
    /// Every patch release of `1.2` lies in `[1.2.0, 1.2.0.next_patch())`,
    /// so `1.2.0` and `1.2.7` both map to `1.3.0`.
    pub fn next_patch(&self) -> Self {
        Self::new(self.0.major, self.0.minor + 1, 0)
    }

    /// First version of the next major line (`1.2.3` -> `2.0.0`)
    pub fn next_major(&self) -> Self {
        Self::new(self.0.major + 1, 0, 0)
    }

    /// Returns the underlying `semver::Version`.
    pub fn as_semver(&self) -> &Version {
        &self.0
    }
}

impl FromStr for ModuleVersion {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleVersion::parse(s)
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Version> for ModuleVersion {
    fn from(version: Version) -> Self {
        Self(version)
    }
}

impl Serialize for ModuleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ModuleVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Half-open version interval `[min, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VersionRange {
    min: ModuleVersion,
    max: ModuleVersion,
}

impl VersionRange {
    /// Creates a range; `None` when `min >= max` (the range would be empty).
    pub fn new(min: ModuleVersion, max: ModuleVersion) -> Option<Self> {
        if min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Every patch release of `version`'s line, starting at `version`.
    pub fn patch_line(version: &ModuleVersion) -> Self {
        Self {
            min: version.clone(),
            max: version.next_patch(),
        }
    }

    pub fn min(&self) -> &ModuleVersion {
        &self.min
    }

    pub fn max(&self) -> &ModuleVersion {
        &self.max
    }

    /// Checks whether `version` lies inside the range.
    pub fn contains(&self, version: &ModuleVersion) -> bool {
        &self.min <= version && version < &self.max
    }

    /// Intersection of two ranges, `None` when they do not overlap.
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let min = std::cmp::max(&self.min, &other.min).clone();
        let max = std::cmp::min(&self.max, &other.max).clone();
        VersionRange::new(min, max)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}
