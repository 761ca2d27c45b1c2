use anyhow::{Result, bail};
use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;
use tracing::trace;

use super::RangeTracker;
use crate::diag::{TracingWarn, Warn};
use crate::range::{Range, consolidate_ranges};
use crate::shm::{MmapSharedMemory, SharedMemory};

/// Size of the leading range count.
const COUNT_SIZE: usize = 4;

/// Size of one `(from, to)` pair.
const PAIR_SIZE: usize = 8;

/// Reads ranges that an external producer writes into shared memory.
///
/// ## Buffer layout
///
/// All integers are little-endian u32:
///
/// ```text
/// +-------+-------+-----+-------+-----+-------+-----+
/// | count | from0 | to0 | from1 | to1 |  ...  | ... |
/// +-------+-------+-----+-------+-----+-------+-----+
/// ```
///
/// At most `(size - 4) / 8` pairs fit; a larger count is clamped with a
/// warning. The producer writes without any synchronisation, so each call
/// sees a best-effort snapshot that may mix old and new values.
///
/// Pairs are used as written. An inverted pair (`from > to`) is not
/// rejected and takes part in consolidation like any other.
#[derive(Debug)]
pub struct ShmRangeTracker<S: SharedMemory = MmapSharedMemory, W: Warn = TracingWarn> {
    region: S,
    max_ranges: usize,
    warn: W,
}

impl ShmRangeTracker {
    /// Open the named region under `/dev/shm` and reset its range count.
    pub fn open(name: &str, size: usize) -> Result<Self> {
        Self::with_region(MmapSharedMemory::open(name, size)?, TracingWarn)
    }

    /// Open the named region under `dir` and reset its range count.
    pub fn open_in(dir: &Path, name: &str, size: usize) -> Result<Self> {
        Self::with_region(MmapSharedMemory::open_in(dir, name, size)?, TracingWarn)
    }
}

impl<S: SharedMemory, W: Warn> ShmRangeTracker<S, W> {
    /// Take ownership of an open region.
    ///
    /// The range count is set to zero so that a producer that has not
    /// written yet is seen as reporting no ranges. This is the only write
    /// the tracker ever makes to the region.
    pub fn with_region(mut region: S, warn: W) -> Result<Self> {
        let size = region.data().len();
        if size < COUNT_SIZE {
            bail!("Shared memory region of {size} bytes cannot hold a range count");
        }

        LittleEndian::write_u32(&mut region.data_mut()[..COUNT_SIZE], 0);

        Ok(Self {
            region,
            max_ranges: (size - COUNT_SIZE) / PAIR_SIZE,
            warn,
        })
    }

    /// Maximum number of pairs the region can hold.
    pub fn max_ranges(&self) -> usize {
        self.max_ranges
    }

    pub fn region(&self) -> &S {
        &self.region
    }

    /// Decode the region and write the consolidated ranges into `ranges`.
    pub fn read_ranges(&self, ranges: &mut Vec<Range>) {
        ranges.clear();

        let mut header = [0u8; COUNT_SIZE];
        if !self.region.snapshot(0, &mut header) {
            return;
        }

        let mut count = LittleEndian::read_u32(&header) as usize;
        if count == 0 {
            return;
        }

        if count > self.max_ranges {
            self.warn.warn(&format!(
                "Number of ranges ({count}) exceeds buffer size ({} ranges), clamping",
                self.max_ranges
            ));
            count = self.max_ranges;
        }

        // The count and the pairs are read separately, so a producer that is
        // mid-write can leave them inconsistent. That snapshot is accepted.
        let mut pairs = vec![0u8; count * PAIR_SIZE];
        if !self.region.snapshot(COUNT_SIZE, &mut pairs) {
            return;
        }

        let mut raw: Vec<Range> = pairs
            .chunks_exact(PAIR_SIZE)
            .map(|pair| {
                Range::new(
                    LittleEndian::read_u32(&pair[..4]) as u64,
                    LittleEndian::read_u32(&pair[4..]) as u64,
                )
            })
            .collect();

        trace!(count, "decoded shared memory ranges");

        consolidate_ranges(&mut raw, ranges);
    }
}

impl<S: SharedMemory, W: Warn> RangeTracker for ShmRangeTracker<S, W> {
    fn extract_ranges(&mut self, _sample: &[u8], ranges: &mut Vec<Range>) {
        self.read_ranges(ranges);
    }
}

impl<S: SharedMemory, W: Warn> Drop for ShmRangeTracker<S, W> {
    fn drop(&mut self) {
        self.region.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::testing::RecordingWarn;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Heap-backed region that reports when it is closed.
    struct HeapRegion {
        bytes: Vec<u8>,
        closed: Rc<Cell<usize>>,
        snapshots: Cell<usize>,
    }

    impl HeapRegion {
        fn new(bytes: Vec<u8>) -> (Self, Rc<Cell<usize>>) {
            let closed = Rc::new(Cell::new(0));
            (
                Self {
                    bytes,
                    closed: closed.clone(),
                    snapshots: Cell::new(0),
                },
                closed,
            )
        }
    }

    impl SharedMemory for HeapRegion {
        fn data(&self) -> &[u8] {
            &self.bytes
        }

        fn data_mut(&mut self) -> &mut [u8] {
            &mut self.bytes
        }

        fn close(&mut self) {
            self.closed.set(self.closed.get() + 1);
        }

        fn snapshot(&self, offset: usize, buf: &mut [u8]) -> bool {
            self.snapshots.set(self.snapshots.get() + 1);
            match self.bytes.get(offset..offset + buf.len()) {
                Some(src) => {
                    buf.copy_from_slice(src);
                    true
                }
                None => false,
            }
        }
    }

    fn write_ranges(bytes: &mut [u8], count: u32, pairs: &[(u32, u32)]) {
        LittleEndian::write_u32(&mut bytes[..4], count);
        for (i, &(from, to)) in pairs.iter().enumerate() {
            let at = 4 + i * 8;
            LittleEndian::write_u32(&mut bytes[at..at + 4], from);
            LittleEndian::write_u32(&mut bytes[at + 4..at + 8], to);
        }
    }

    fn tracker(size: usize, warn: &RecordingWarn) -> ShmRangeTracker<HeapRegion, &RecordingWarn> {
        let (region, _) = HeapRegion::new(vec![0u8; size]);
        ShmRangeTracker::with_region(region, warn).unwrap()
    }

    #[test]
    fn test_open_resets_count() {
        let mut bytes = vec![0u8; 44];
        write_ranges(&mut bytes, 2, &[(1, 2), (3, 4)]);
        let (region, _) = HeapRegion::new(bytes);
        let warn = RecordingWarn::default();

        let tracker = ShmRangeTracker::with_region(region, &warn).unwrap();
        assert_eq!(&tracker.region().data()[..4], &[0, 0, 0, 0]);
        assert_eq!(tracker.max_ranges(), 5);

        let mut ranges = vec![Range::new(9, 9)];
        tracker.read_ranges(&mut ranges);
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_zero_count_yields_nothing() {
        let warn = RecordingWarn::default();
        for size in [4, 5, 12, 1024] {
            let mut tracker = tracker(size, &warn);
            let mut ranges = vec![Range::new(1, 1)];
            tracker.extract_ranges(&[], &mut ranges);
            assert!(ranges.is_empty(), "size {size}");
        }
        assert_eq!(warn.count(), 0);
    }

    #[test]
    fn test_ranges_are_consolidated() {
        let warn = RecordingWarn::default();
        let mut tracker = tracker(4 + 8 * 8, &warn);
        write_ranges(
            &mut tracker.region.bytes,
            4,
            &[(5, 10), (1, 3), (9, 15), (20, 20)],
        );

        let mut ranges = Vec::new();
        tracker.extract_ranges(&[], &mut ranges);
        assert_eq!(
            ranges,
            vec![Range::new(1, 3), Range::new(5, 15), Range::new(20, 20)]
        );
        assert_eq!(warn.count(), 0);
    }

    #[test]
    fn test_count_is_clamped_with_one_warning() {
        let warn = RecordingWarn::default();
        // Room for exactly three pairs plus two stray bytes.
        let mut tracker = tracker(4 + 3 * 8 + 2, &warn);
        assert_eq!(tracker.max_ranges(), 3);
        write_ranges(&mut tracker.region.bytes, 1000, &[(0, 1), (10, 11), (20, 21)]);

        let mut ranges = Vec::new();
        tracker.extract_ranges(&[], &mut ranges);
        assert_eq!(
            ranges,
            vec![Range::new(0, 1), Range::new(10, 11), Range::new(20, 21)]
        );
        assert_eq!(warn.count(), 1);

        // Clamping does not reset the producer's data.
        assert_eq!(LittleEndian::read_u32(&tracker.region().data()[..4]), 1000);
    }

    #[test]
    fn test_reads_go_through_snapshots() {
        let warn = RecordingWarn::default();
        let mut tracker = tracker(4 + 2 * 8, &warn);
        let mut ranges = Vec::new();

        tracker.extract_ranges(&[], &mut ranges);
        assert_eq!(tracker.region().snapshots.get(), 1);

        write_ranges(&mut tracker.region.bytes, 1, &[(3, 9)]);
        tracker.extract_ranges(&[], &mut ranges);
        assert_eq!(tracker.region().snapshots.get(), 3);
        assert_eq!(ranges, vec![Range::new(3, 9)]);

        // The producer rewrites the pair between two reads.
        write_ranges(&mut tracker.region.bytes, 1, &[(4, 5)]);
        tracker.extract_ranges(&[], &mut ranges);
        assert_eq!(ranges, vec![Range::new(4, 5)]);
    }

    #[test]
    fn test_inverted_pair_is_kept() {
        let warn = RecordingWarn::default();
        let mut tracker = tracker(4 + 2 * 8, &warn);
        write_ranges(&mut tracker.region.bytes, 2, &[(10, 2), (4, 6)]);

        let mut ranges = Vec::new();
        tracker.extract_ranges(&[], &mut ranges);
        assert_eq!(ranges, vec![Range::new(4, 6), Range::new(10, 2)]);
    }

    #[test]
    fn test_region_too_small() {
        let (region, _) = HeapRegion::new(vec![0u8; 3]);
        assert!(ShmRangeTracker::with_region(region, TracingWarn).is_err());
    }

    #[test]
    fn test_drop_closes_region() {
        let (region, closed) = HeapRegion::new(vec![0u8; 12]);
        let tracker = ShmRangeTracker::with_region(region, TracingWarn).unwrap();
        assert_eq!(closed.get(), 0);
        drop(tracker);
        assert_eq!(closed.get(), 1);
    }
}
