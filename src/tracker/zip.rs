use anyhow::Result;
use tracing::{debug, trace};

use super::RangeTracker;
use crate::io::ReadAt;
use crate::range::Range;
use crate::zip::{CDFH_SIGNATURE, CentralDirectoryHeader, is_zip_file, read_u32_at};

/// Offset at which the embedded payload starts in the reference container.
pub const DEFAULT_TARGET_FILE_START: u64 = 0x1FEC;

/// Number of trailing bytes searched for a central directory record.
pub const DEFAULT_SCAN_WINDOW: usize = 0x60;

/// Container layout a [`ZipRangeTracker`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipLayout {
    /// Absolute offset where the payload begins, before the matched entry's
    /// file name length is added. This is a property of one known container
    /// layout and is not derived from the archive.
    pub target_file_start: u64,
    /// Size of the tail window to scan. Samples smaller than this are skipped.
    pub scan_window: usize,
    /// Default for the local file header check used by [`RangeTracker::extract_ranges`].
    pub validate_zip: bool,
}

impl Default for ZipLayout {
    fn default() -> Self {
        Self {
            target_file_start: DEFAULT_TARGET_FILE_START,
            scan_window: DEFAULT_SCAN_WINDOW,
            validate_zip: true,
        }
    }
}

/// Locates a payload embedded in a ZIP container.
///
/// ## Algorithm
///
/// 1. Skip samples shorter than the scan window
/// 2. Optionally require a Local File Header signature at offset 0
/// 3. Walk the last `scan_window` bytes one byte at a time looking for a
///    Central Directory File Header signature
/// 4. For a match, decode the fixed 46-byte header. If it runs past the end
///    of the sample, stop
/// 5. The payload is `uncompressed_size` bytes starting at
///    `target_file_start + file_name_length`. If that range lies inside the
///    sample it is the result, otherwise keep scanning
///
/// At most one range is produced. Anything that does not fit yields no
/// range rather than an error.
#[derive(Debug, Clone, Default)]
pub struct ZipRangeTracker {
    layout: ZipLayout,
}

impl ZipRangeTracker {
    pub fn new(layout: ZipLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ZipLayout {
        &self.layout
    }

    /// Replace `ranges` with the payload range found in `sample`, if any.
    pub fn extract_ranges_with(&self, ranges: &mut Vec<Range>, sample: &[u8], validate_zip: bool) {
        ranges.clear();
        if let Some(range) = self.locate(sample, validate_zip) {
            ranges.push(range);
        }
    }

    /// Find the payload range in an in-memory sample.
    pub fn locate(&self, sample: &[u8], validate_zip: bool) -> Option<Range> {
        if sample.len() < self.layout.scan_window {
            return None;
        }

        if validate_zip && !is_zip_file(sample) {
            trace!("sample does not start with a local file header");
            return None;
        }

        let search_start = sample.len() - self.layout.scan_window;
        self.scan_tail(&sample[search_start..], search_start as u64, sample.len() as u64)
    }

    /// Find the payload range by reading only the head and tail of `reader`.
    ///
    /// Gives the same answer as [`Self::locate`] on the full sample while
    /// reading at most `4 + scan_window` bytes.
    pub async fn scan_reader<R: ReadAt + ?Sized>(
        &self,
        reader: &R,
        validate_zip: bool,
    ) -> Result<Option<Range>> {
        let sample_size = reader.size();
        let window = self.layout.scan_window as u64;
        if sample_size < window {
            return Ok(None);
        }

        if validate_zip {
            let mut head = [0u8; 4];
            if sample_size < head.len() as u64 {
                return Ok(None);
            }
            reader.read_exact_at(0, &mut head).await?;
            if !is_zip_file(&head) {
                trace!("sample does not start with a local file header");
                return Ok(None);
            }
        }

        let search_start = sample_size - window;
        let mut tail = vec![0u8; self.layout.scan_window];
        reader.read_exact_at(search_start, &mut tail).await?;

        Ok(self.scan_tail(&tail, search_start, sample_size))
    }

    /// Scan `tail`, the bytes of the sample from `tail_start` to its end.
    fn scan_tail(&self, tail: &[u8], tail_start: u64, sample_size: u64) -> Option<Range> {
        for i in 0..tail.len().saturating_sub(3) {
            if read_u32_at(tail, i) != Some(CDFH_SIGNATURE) {
                continue;
            }

            let offset = tail_start + i as u64;
            let Some(header) = CentralDirectoryHeader::from_bytes(&tail[i..]) else {
                debug!(offset, "central directory header truncated by end of sample");
                return None;
            };

            match self.payload_range(&header, sample_size) {
                Some(range) => {
                    debug!(
                        offset,
                        file_name_length = header.file_name_length,
                        uncompressed_size = header.uncompressed_size,
                        from = range.from,
                        to = range.to,
                        "located embedded payload"
                    );
                    return Some(range);
                }
                None => {
                    trace!(
                        offset,
                        file_name_length = header.file_name_length,
                        uncompressed_size = header.uncompressed_size,
                        sample_size,
                        "payload range outside sample"
                    );
                }
            }
        }

        None
    }

    fn payload_range(&self, header: &CentralDirectoryHeader, sample_size: u64) -> Option<Range> {
        let start = self
            .layout
            .target_file_start
            .checked_add(header.file_name_length as u64)?;
        let end = start
            .checked_add(header.uncompressed_size as u64)?
            .checked_sub(1)?;

        if start < sample_size && end < sample_size && start <= end {
            Some(Range::new(start, end))
        } else {
            None
        }
    }
}

impl RangeTracker for ZipRangeTracker {
    fn extract_ranges(&mut self, sample: &[u8], ranges: &mut Vec<Range>) {
        self.extract_ranges_with(ranges, sample, self.layout.validate_zip);
    }
}
