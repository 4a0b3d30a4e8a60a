mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use std::io::{self, BufReader, Read};

use flate2::bufread::GzDecoder;

use crate::error::Result;

/// Magic bytes at the start of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compressed bytes fetched per read while inflating.
const INFLATE_CHUNK: usize = 1024 * 1024;

/// Trait for random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    ///
    /// Returns the number of bytes read; 0 means the offset is at or past
    /// the end of the source.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Read until `buf` is full or the source ends.
    ///
    /// Returns the number of bytes placed in `buf`. A result shorter than
    /// `buf.len()` only ever means end-of-source.
    fn read_full_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

/// Check whether the source starts with a gzip header.
pub fn is_gzip<R: ReadAt + ?Sized>(reader: &R) -> Result<bool> {
    let mut magic = [0u8; 2];
    let n = reader.read_full_at(0, &mut magic)?;
    Ok(n == magic.len() && magic == GZIP_MAGIC)
}

/// Sequential [`Read`] over a [`ReadAt`] source, starting at offset 0.
pub struct SourceCursor<'a, R: ?Sized> {
    reader: &'a R,
    offset: u64,
}

impl<'a, R: ReadAt + ?Sized> SourceCursor<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self { reader, offset: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.offset
    }
}

impl<R: ReadAt + ?Sized> Read for SourceCursor<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read_at(self.offset, buf).map_err(io::Error::other)?;
        self.offset += n as u64;
        Ok(n)
    }
}

/// Decompress a gzip-wrapped source into memory.
///
/// A compressed stream cannot be addressed by block, so the whole archive is
/// inflated up front. The compressed bytes are streamed, only the inflated
/// archive is held.
pub fn inflate<R: ReadAt + ?Sized>(reader: &R) -> Result<MemoryReader> {
    let mut decoder = GzDecoder::new(BufReader::with_capacity(
        INFLATE_CHUNK,
        SourceCursor::new(reader),
    ));

    let mut data = Vec::new();
    decoder.read_to_end(&mut data)?;
    log::debug!(
        "inflated {} compressed bytes to {}",
        decoder.get_ref().get_ref().position(),
        data.len()
    );

    Ok(MemoryReader::new(data))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    /// Hands out at most three bytes per call.
    struct Trickle(Vec<u8>);

    impl ReadAt for Trickle {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
            let start = (offset as usize).min(self.0.len());
            let n = buf.len().min(3).min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    #[test]
    fn read_full_at_loops_over_short_reads() {
        let src = Trickle((0u8..20).collect());
        let mut buf = [0u8; 10];
        assert_eq!(src.read_full_at(5, &mut buf).unwrap(), 10);
        assert_eq!(buf, [5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn read_full_at_stops_at_end() {
        let src = Trickle(vec![1; 8]);
        let mut buf = [0u8; 16];
        assert_eq!(src.read_full_at(4, &mut buf).unwrap(), 4);
        assert_eq!(src.read_full_at(8, &mut buf).unwrap(), 0);
    }

    #[test]
    fn gzip_detection_and_inflate() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"payload bytes").unwrap();
        let gz = MemoryReader::new(encoder.finish().unwrap());

        assert!(is_gzip(&gz).unwrap());
        let plain = inflate(&gz).unwrap();
        assert_eq!(plain.as_bytes(), b"payload bytes");
        assert!(!is_gzip(&plain).unwrap());
    }

    #[test]
    fn inflate_streams_through_short_reads() {
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&payload).unwrap();
        let gz = Trickle(encoder.finish().unwrap());

        assert_eq!(inflate(&gz).unwrap().as_bytes(), &payload[..]);
    }

    #[test]
    fn cursor_reads_sequentially() {
        let src = MemoryReader::new(b"abcdefgh".to_vec());
        let mut cursor = SourceCursor::new(&src);
        let mut buf = [0u8; 3];
        cursor.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"abc");
        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"defgh");
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let gz = MemoryReader::new(vec![0x1f, 0x8b, 0x08, 0, 0, 0]);
        assert!(inflate(&gz).is_err());
    }

    #[test]
    fn tiny_source_is_not_gzip() {
        assert!(!is_gzip(&MemoryReader::new(vec![0x1f])).unwrap());
    }
}
