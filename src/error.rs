//! Error types for tar archive queries.
//!
//! Every fallible library operation returns [`Result<T>`]. The variants fall
//! into three groups:
//!
//! - structural faults reported by [`TarParser::check_archive`]:
//!   [`TarError::InvalidMagic`], [`TarError::InvalidVersion`] and
//!   [`TarError::InvalidChecksum`];
//! - lookup outcomes reported by [`TarWalker`]: [`TarError::NotFound`],
//!   [`TarError::OffsetOutOfRange`], [`TarError::CapacityExceeded`] and
//!   [`TarError::TooManySymlinks`];
//! - failures of the byte source itself.
//!
//! A wrong entry type is not an error: the type probes return `Ok(false)`.
//!
//! [`TarParser::check_archive`]: crate::tar::TarParser::check_archive
//! [`TarWalker`]: crate::tar::TarWalker

use std::io;

use thiserror::Error;

/// Errors that can occur while walking a tar archive.
#[derive(Debug, Error)]
pub enum TarError {
    /// A header's magic field is not `"ustar\0"`.
    #[error("invalid magic in header at offset {offset}")]
    InvalidMagic { offset: u64 },

    /// A header's version field is not `"00"`.
    #[error("invalid version in header at offset {offset}")]
    InvalidVersion { offset: u64 },

    /// The stored checksum does not match the recomputed one.
    ///
    /// `expected` is `None` when the stored field is not valid octal.
    #[error("invalid checksum in header at offset {offset}: stored {expected:?}, computed {computed}")]
    InvalidChecksum {
        offset: u64,
        expected: Option<u64>,
        computed: u64,
    },

    /// A numeric header field contains something other than octal digits.
    #[error("invalid numeric field `{field}` in header at offset {offset}")]
    InvalidNumeric { field: &'static str, offset: u64 },

    /// The byte source ended before the end-of-archive terminator.
    #[error("archive truncated at offset {offset}")]
    Truncated { offset: u64 },

    /// No entry with a suitable type exists at the path.
    #[error("no such entry: {path}")]
    NotFound { path: String },

    /// A read offset lies beyond the end of the entry.
    #[error("offset {offset} is outside the entry ({size} bytes)")]
    OffsetOutOfRange { offset: u64, size: u64 },

    /// A directory has more children than the caller has slots for.
    #[error("directory has more than {capacity} entries")]
    CapacityExceeded { capacity: usize },

    /// Symlink resolution did not terminate within the configured depth.
    #[error("too many levels of symbolic links resolving {path} (limit {depth})")]
    TooManySymlinks { path: String, depth: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The remote server answered, but not in a way we can use.
    #[error("{0}")]
    Remote(String),
}

impl TarError {
    /// Returns true for the faults raised by archive validation.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TarError::InvalidMagic { .. }
                | TarError::InvalidVersion { .. }
                | TarError::InvalidChecksum { .. }
        )
    }

    pub(crate) fn not_found(path: &str) -> Self {
        TarError::NotFound {
            path: path.to_string(),
        }
    }
}

/// Result type for tar operations.
pub type Result<T> = std::result::Result<T, TarError>;
