use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Result of comparing the latest published version against the running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    Newer,
    Same,
    Older,
}

impl From<Ordering> for VersionOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Greater => VersionOrdering::Newer,
            Ordering::Equal => VersionOrdering::Same,
            Ordering::Less => VersionOrdering::Older,
        }
    }
}

/// Dotted version string. Every `.`-separated segment that is not a
/// non-negative integer counts as `0`, and missing trailing segments count as
/// `0` too, so `1.2`, `1.2.0` and `1.2.x` are all equal.
#[derive(Debug, Clone)]
pub struct Version {
    string: String,
    segments: Vec<u64>,
}

impl Version {
    pub fn new(string: impl Into<String>) -> Self {
        let string = string.into();
        let segments = string
            .split('.')
            .map(|segment| segment.parse::<u64>().unwrap_or(0))
            .collect();
        Version { string, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.string
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Compare `latest` against `current`. Never fails: malformed segments are
/// read as `0`.
pub fn compare(latest: &str, current: &str) -> VersionOrdering {
    Version::new(latest).cmp(&Version::new(current)).into()
}

/// Release tags are conventionally `vMAJOR.MINOR.PATCH`; drop the prefix.
pub fn normalize_tag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix('v')
        .or_else(|| tag.strip_prefix('V'))
        .unwrap_or(tag)
}
