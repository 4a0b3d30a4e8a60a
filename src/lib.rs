//! # runtar
//!
//! A read-only ustar archive walker with HTTP URL support using Range requests.
//!
//! This library answers questions about a tar archive without unpacking it:
//! whether it is well formed, whether a path exists and what kind of entry it
//! is, what a directory contains, and what bytes a file holds. The archive can
//! live on the local filesystem, in memory, or on an HTTP server that supports
//! Range requests, in which case only the headers and the requested bytes are
//! downloaded.
//!
//! ## Features
//!
//! - Structural validation (magic, version and checksum of every header)
//! - Entry existence and type probes
//! - Non-recursive directory listing
//! - Chunked reads of file contents at any offset
//! - Bounded symbolic link resolution
//! - Gzip-compressed archives (inflated into memory)
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use runtar::{LocalFileReader, TarWalker};
//!
//! fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(LocalFileReader::new(Path::new("archive.tar"))?);
//!     let walker = TarWalker::new(reader);
//!
//!     println!("{} headers", walker.check_archive()?);
//!     for name in walker.list("dir/")? {
//!         println!("{}", name);
//!     }
//!
//!     let mut buf = [0u8; 4096];
//!     let mut offset = 0;
//!     loop {
//!         let read = walker.read_file("dir/file.txt", offset, &mut buf)?;
//!         // consume &buf[..read.written]
//!         offset += read.written as u64;
//!         if read.is_complete() {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod tar;

pub use cli::{Cli, Command};
pub use error::{Result, TarError};
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use tar::{EntryType, FileRead, TarEntry, TarParser, TarWalker};
