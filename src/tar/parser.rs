//! Block cursor and structural validation.
//!
//! A tar archive has no directory: the only way to find anything is to start
//! at block 0 and hop from header to header, using each header's size to skip
//! its payload. [`Records`] is that hop, and every query in this crate is
//! built on it.
//!
//! ## End of archive
//!
//! The archive ends at two consecutive all-zero blocks. A source that simply
//! runs out of bytes before that point is reported as
//! [`TarError::Truncated`] rather than being mistaken for a terminator.

use std::sync::Arc;

use crate::error::{Result, TarError};
use crate::io::ReadAt;

use super::structures::*;

/// Low-level tar parser.
///
/// Holds the byte source and hands out fresh [`Records`] cursors. It keeps no
/// state between calls, so every traversal starts again at block 0.
pub struct TarParser<R: ReadAt + ?Sized> {
    /// The underlying data source
    reader: Arc<R>,
}

impl<R: ReadAt + ?Sized> TarParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    /// Iterate over every record from the start of the archive.
    pub fn records(&self) -> Records<'_, R> {
        Records {
            reader: &self.reader,
            offset: 0,
            done: false,
        }
    }

    /// Collect every record in archive order.
    pub fn list_entries(&self) -> Result<Vec<TarEntry>> {
        self.records().collect()
    }

    /// Validate every header and count them.
    ///
    /// Each header is checked for the ustar magic, then the version, then
    /// the checksum. The first fault anywhere stops the scan. An archive
    /// holding only the terminator is valid and has zero headers.
    ///
    /// # Errors
    ///
    /// [`TarError::InvalidMagic`], [`TarError::InvalidVersion`] or
    /// [`TarError::InvalidChecksum`] for the first bad header; source errors
    /// and [`TarError::Truncated`] as for any traversal.
    pub fn check_archive(&self) -> Result<usize> {
        let mut count = 0;
        let mut offset = 0;

        while let Some(header) = read_header(&*self.reader, offset)? {
            verify_header(&header, offset)?;
            let entry = TarEntry::from_header(&header, offset)?;
            offset = next_offset(&entry)?;
            count += 1;
        }

        log::debug!("archive valid: {count} headers");
        Ok(count)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Cursor over the records of an archive.
///
/// Yields each decoded header in order and stops at the terminator. After an
/// error it yields nothing more.
pub struct Records<'a, R: ReadAt + ?Sized> {
    reader: &'a Arc<R>,
    offset: u64,
    done: bool,
}

impl<R: ReadAt + ?Sized> Records<'_, R> {
    /// Byte offset of the next header to be read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn advance(&mut self) -> Result<Option<TarEntry>> {
        let Some(header) = read_header(&**self.reader, self.offset)? else {
            return Ok(None);
        };
        let entry = TarEntry::from_header(&header, self.offset)?;
        log::trace!(
            "record at {}: {:?} {} ({} bytes)",
            entry.header_offset,
            entry.entry_type,
            entry.path,
            entry.size
        );
        self.offset = next_offset(&entry)?;
        Ok(Some(entry))
    }
}

impl<R: ReadAt + ?Sized> Iterator for Records<'_, R> {
    type Item = Result<TarEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: ReadAt + ?Sized> std::iter::FusedIterator for Records<'_, R> {}

/// Read the header at `offset`, or `None` at the terminator.
///
/// Two blocks are probed at once. Fewer than one full block, or a lone zero
/// block with nothing behind it, means the source ended early.
fn read_header<R: ReadAt + ?Sized>(reader: &R, offset: u64) -> Result<Option<HeaderBlock>> {
    let mut probe = [0u8; 2 * BLOCK_SIZE];
    let n = reader.read_full_at(offset, &mut probe)?;

    if n == probe.len() && is_zero_block(&probe) {
        log::debug!("end-of-archive terminator at offset {offset}");
        return Ok(None);
    }

    let header = match HeaderBlock::from_slice(&probe[..n]) {
        Some(header) if n == probe.len() || !header.is_zero() => header,
        _ => return Err(TarError::Truncated { offset: offset + n as u64 }),
    };

    Ok(Some(header))
}

fn verify_header(header: &HeaderBlock, offset: u64) -> Result<()> {
    if !header.has_ustar_magic() {
        return Err(TarError::InvalidMagic { offset });
    }
    if !header.has_ustar_version() {
        return Err(TarError::InvalidVersion { offset });
    }

    let expected = header.stored_checksum();
    let computed = header.compute_checksum();
    if expected != Some(computed) {
        return Err(TarError::InvalidChecksum {
            offset,
            expected,
            computed,
        });
    }
    Ok(())
}

fn next_offset(entry: &TarEntry) -> Result<u64> {
    entry.next_header_offset().ok_or(TarError::Truncated {
        offset: entry.header_offset,
    })
}
