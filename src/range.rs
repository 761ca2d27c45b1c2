//! Byte ranges and interval consolidation.

use tracing::trace;

/// A closed interval `[from, to]` of byte offsets inside a sample.
///
/// Trackers only ever emit ranges with `from <= to`. Ranges decoded from
/// shared memory are taken as written by the producer, so an inverted
/// range can still reach [`consolidate_ranges`] on that path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub from: u64,
    pub to: u64,
}

impl Range {
    pub const fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Number of bytes covered, or 0 for an inverted range.
    pub fn len(&self) -> u64 {
        if self.from > self.to {
            0
        } else {
            (self.to - self.from).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.from <= offset && offset <= self.to
    }
}

/// Merge overlapping or touching ranges into the minimal sorted covering set.
///
/// `input` is sorted in place by `from` (unstable, ties in any order) and
/// then swept once from left to right. Each range is compared only with the
/// last output range: if it starts at or before that range's end the two
/// are merged, otherwise it opens a new output range. Results are appended
/// to `out`.
pub fn consolidate_ranges(input: &mut [Range], out: &mut Vec<Range>) {
    if input.is_empty() {
        return;
    }

    input.sort_unstable_by_key(|r| r.from);

    let start = out.len();
    out.push(input[0]);

    for current in &input[1..] {
        let last = out.len() - 1;
        if current.from <= out[last].to {
            if current.to > out[last].to {
                out[last].to = current.to;
            }
        } else {
            out.push(*current);
        }
    }

    trace!(
        input = input.len(),
        output = out.len() - start,
        "consolidated ranges"
    );
}
