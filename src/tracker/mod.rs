//! Range trackers.
//!
//! A tracker tells a fuzzing engine which byte ranges of the current sample
//! are worth mutating. Three sources are supported:
//!
//! - [`ConstantRangeTracker`]: one range fixed by configuration
//! - [`ShmRangeTracker`]: ranges written by an external producer into a
//!   shared-memory region, consolidated on every read
//! - [`ZipRangeTracker`]: the byte range of a payload embedded in a ZIP
//!   container, located from a central directory record near the sample's end
//!
//! Every call starts from an empty output and reads fresh input; trackers
//! keep no state between calls besides their configuration.

mod constant;
mod shm;
mod zip;

pub use constant::ConstantRangeTracker;
pub use shm::ShmRangeTracker;
pub use zip::{DEFAULT_SCAN_WINDOW, DEFAULT_TARGET_FILE_START, ZipLayout, ZipRangeTracker};

use crate::range::Range;

/// A producer of interesting byte ranges for a sample.
pub trait RangeTracker {
    /// Replace the contents of `ranges` with the ranges for `sample`.
    ///
    /// Sources that do not depend on the sample ignore it. The same inputs
    /// always produce the same output.
    fn extract_ranges(&mut self, sample: &[u8], ranges: &mut Vec<Range>);
}

/// A tracker chosen at runtime.
#[derive(Debug)]
pub enum Tracker {
    Constant(ConstantRangeTracker),
    Shm(ShmRangeTracker),
    Zip(ZipRangeTracker),
}

impl RangeTracker for Tracker {
    fn extract_ranges(&mut self, sample: &[u8], ranges: &mut Vec<Range>) {
        match self {
            Tracker::Constant(t) => t.extract_ranges(sample, ranges),
            Tracker::Shm(t) => t.extract_ranges(sample, ranges),
            Tracker::Zip(t) => t.extract_ranges(sample, ranges),
        }
    }
}

impl From<ConstantRangeTracker> for Tracker {
    fn from(tracker: ConstantRangeTracker) -> Self {
        Tracker::Constant(tracker)
    }
}

impl From<ShmRangeTracker> for Tracker {
    fn from(tracker: ShmRangeTracker) -> Self {
        Tracker::Shm(tracker)
    }
}

impl From<ZipRangeTracker> for Tracker {
    fn from(tracker: ZipRangeTracker) -> Self {
        Tracker::Zip(tracker)
    }
}
