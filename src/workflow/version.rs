use std::cmp::Ordering;
use std::fmt;

use crate::providers::ado::types::WorkItem;

/// A `major.minor.patch.build` tuple parsed from a run name.
///
/// Missing and non-numeric components read as `0`; anything past the fourth
/// component is ignored. Ordering is component-wise, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version([u64; 4]);

impl Version {
    pub fn parse(raw: &str) -> Self {
        let mut parts = [0u64; 4];
        for (slot, segment) in parts.iter_mut().zip(raw.trim().split('.')) {
            *slot = segment.trim().parse().unwrap_or(0);
        }
        Self(parts)
    }

    /// `-1` when `self < other`, `1` when greater, `0` when equal.
    pub fn compare(&self, other: &Self) -> i8 {
        match self.cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, build] = self.0;
        write!(f, "{major}.{minor}.{patch}.{build}")
    }
}

/// Whether a work item's recorded version must be replaced by `candidate`.
///
/// True when nothing is recorded under `field_name` or the recorded version is
/// strictly lower than the candidate.
pub fn needs_update(item: &WorkItem, field_name: &str, candidate: Version) -> bool {
    match item.field_str(field_name).map(str::trim) {
        None | Some("") => true,
        Some(recorded) => Version::parse(recorded).compare(&candidate) < 0,
    }
}
