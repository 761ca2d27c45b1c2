//! # rangetrack
//!
//! Tells a fuzzing engine which byte ranges of a sample are interesting.
//!
//! Ranges come from one of three trackers:
//!
//! - a fixed range from configuration
//! - a shared-memory buffer filled by an external producer process
//! - a payload embedded in a ZIP container, located through the central
//!   directory record near the end of the sample
//!
//! Whatever the source, results are plain [`Range`] values. Ranges read from
//! shared memory are merged into a minimal sorted set with
//! [`consolidate_ranges`].
//!
//! ## Features
//!
//! - Unaligned little-endian decoding of ZIP headers from arbitrary offsets
//! - Bounds checks against truncated or hostile samples; bad input yields
//!   no ranges instead of an error
//! - Named shared-memory regions mapped with `memmap2`
//! - Tail-only scanning of samples on disk through [`ReadAt`]
//!
//! ## Example
//!
//! ```no_run
//! use rangetrack::{Range, RangeTracker, ZipRangeTracker};
//!
//! let sample = std::fs::read("sample.zip").unwrap();
//! let mut tracker = ZipRangeTracker::default();
//! let mut ranges: Vec<Range> = Vec::new();
//! tracker.extract_ranges(&sample, &mut ranges);
//! for range in &ranges {
//!     println!("{:#x}-{:#x}", range.from, range.to);
//! }
//! ```

pub mod cli;
pub mod diag;
pub mod io;
pub mod range;
pub mod shm;
pub mod tracker;
pub mod zip;

pub use cli::Cli;
pub use diag::{TracingWarn, Warn};
pub use io::{LocalFileReader, ReadAt};
pub use range::{Range, consolidate_ranges};
pub use shm::{MmapSharedMemory, SharedMemory};
pub use tracker::{
    ConstantRangeTracker, RangeTracker, ShmRangeTracker, Tracker, ZipLayout, ZipRangeTracker,
};
