//! ZIP format structures needed to locate an embedded payload.
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Only two things are read here: the Local File Header signature at the
//! start of a sample, as a cheap "looks like a ZIP" check, and the fixed
//! 46-byte part of a Central Directory File Header found near the end of
//! a sample. Archives are not walked or decompressed.

mod structures;

pub use structures::*;
