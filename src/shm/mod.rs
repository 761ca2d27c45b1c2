//! Named shared-memory regions.
//!
//! A region is a fixed-size byte buffer that an external producer process
//! writes and this crate reads. On Linux, POSIX shared memory objects are
//! files under `/dev/shm`, so a region is opened by creating (or reusing)
//! that file and mapping it with [`memmap2`]. Any directory on a shared
//! filesystem works the same way, see [`MmapSharedMemory::open_in`].
//!
//! The consumer never removes the backing file: the named object outlives
//! the mapping, as with `shm_open` without `shm_unlink`.

use anyhow::{Context, Result, bail};
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding POSIX shared memory objects on Linux.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Backing store for a shared-memory range buffer.
pub trait SharedMemory {
    /// The mapped bytes, or an empty slice once closed.
    fn data(&self) -> &[u8];

    /// Mutable view of the mapped bytes, or an empty slice once closed.
    fn data_mut(&mut self) -> &mut [u8];

    /// Release the mapping. Calling it again is a no-op.
    fn close(&mut self);

    /// Copy `buf.len()` bytes starting at `offset` with volatile reads.
    ///
    /// Bytes written concurrently by the producer are read fresh on every
    /// call and may be torn. Returns `false`, leaving `buf` untouched, if
    /// the range is outside the region.
    fn snapshot(&self, offset: usize, buf: &mut [u8]) -> bool {
        let data = self.data();
        let Some(end) = offset.checked_add(buf.len()) else {
            return false;
        };
        if end > data.len() {
            return false;
        }

        let base = data[offset..end].as_ptr();
        for (i, byte) in buf.iter_mut().enumerate() {
            // SAFETY: `base + i` is inside the bounds-checked sub-slice.
            *byte = unsafe { std::ptr::read_volatile(base.add(i)) };
        }
        true
    }
}

/// A named region backed by a memory-mapped file.
#[derive(Debug)]
pub struct MmapSharedMemory {
    name: String,
    path: PathBuf,
    mmap: Option<MmapMut>,
}

impl MmapSharedMemory {
    /// Open (creating if needed) the region `name` under [`DEFAULT_SHM_DIR`].
    pub fn open(name: &str, size: usize) -> Result<Self> {
        Self::open_in(Path::new(DEFAULT_SHM_DIR), name, size)
    }

    /// Open (creating if needed) the region `name` under `dir`.
    ///
    /// The backing file is grown to `size` bytes if it is shorter and is
    /// never truncated, so a producer that created a larger region keeps
    /// its data. Only the first `size` bytes are mapped.
    pub fn open_in(dir: &Path, name: &str, size: usize) -> Result<Self> {
        let file_name = region_file_name(name)?;
        if size == 0 {
            bail!("Shared memory region '{name}' must not be empty");
        }

        let path = dir.join(file_name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open shared memory region {}", path.display()))?;

        let current = file.metadata()?.len();
        if current < size as u64 {
            file.set_len(size as u64).with_context(|| {
                format!("Failed to resize shared memory region {} to {size} bytes", path.display())
            })?;
        }

        // SAFETY: the file may be resized or written by the producer while
        // mapped. Readers copy bytes out through `SharedMemory::snapshot`.
        let mmap = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .with_context(|| format!("Failed to map shared memory region {}", path.display()))?;

        debug!(name, path = %path.display(), size, "opened shared memory region");

        Ok(Self {
            name: name.to_string(),
            path,
            mmap: Some(mmap),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.mmap.is_some()
    }
}

impl SharedMemory for MmapSharedMemory {
    fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    fn data_mut(&mut self) -> &mut [u8] {
        self.mmap.as_deref_mut().unwrap_or(&mut [])
    }

    fn close(&mut self) {
        if self.mmap.take().is_some() {
            debug!(name = %self.name, "closed shared memory region");
        }
    }
}

impl Drop for MmapSharedMemory {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a POSIX-style region name (`/name` or `name`) to a file name.
fn region_file_name(name: &str) -> Result<&str> {
    let trimmed = name.strip_prefix('/').unwrap_or(name);
    if trimmed.is_empty() {
        bail!("Shared memory region name must not be empty");
    }
    if trimmed.contains('/') || trimmed == "." || trimmed == ".." {
        bail!("Invalid shared memory region name: {name}");
    }
    Ok(trimmed)
}
