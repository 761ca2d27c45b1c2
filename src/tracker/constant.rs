use super::RangeTracker;
use crate::range::Range;

/// Reports one fixed range, whatever the sample.
///
/// The range is used exactly as configured; callers are responsible for
/// passing `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantRangeTracker {
    from: u64,
    to: u64,
}

impl ConstantRangeTracker {
    pub const fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    pub const fn range(&self) -> Range {
        Range::new(self.from, self.to)
    }
}

impl RangeTracker for ConstantRangeTracker {
    fn extract_ranges(&mut self, _sample: &[u8], ranges: &mut Vec<Range>) {
        ranges.clear();
        ranges.push(self.range());
    }
}
