//! ustar archive walking.
//!
//! This module answers path queries against a POSIX ustar archive without
//! extracting it or building an index.
//!
//! ## Architecture
//!
//! The module is organized into three main components:
//!
//! - [`structures`]: the 512-byte header block and its field decoding
//! - [`parser`]: the block cursor that hops from header to header, and
//!   archive validation
//! - [`walker`]: path lookups, directory listing and file reads for end users
//!
//! ## Tar Format Overview
//!
//! A tar archive is a flat run of 512-byte blocks:
//! 1. A header block describing an entry (name, type, size, link target)
//! 2. The entry's data, padded to whole blocks
//! 3. Repeat, then two all-zero blocks mark the end
//!
//! There is no table of contents, so every query walks the archive from
//! its first block. Each walk reads only the headers plus whatever payload
//! it returns, which keeps HTTP Range sources cheap.
//!
//! ## Limitations
//!
//! - No GNU long names or PAX extended headers
//! - No multi-volume archives
//! - Read-only

mod parser;
mod structures;
mod walker;

pub use parser::{Records, TarParser};
pub use structures::*;
pub use walker::{DEFAULT_MAX_SYMLINK_DEPTH, FileRead, TarWalker};

#[cfg(test)]
pub(crate) use structures::testutil;
