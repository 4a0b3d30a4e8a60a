use std::fmt;
use std::ops::Range;

use crate::error::{Result, TarError};

/// Size of a tar block (headers and payload are both block-aligned).
pub const BLOCK_SIZE: usize = 512;

/// Magic field of a POSIX ustar header ("ustar" plus NUL).
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version field of a POSIX ustar header (no terminator).
pub const USTAR_VERSION: &[u8; 2] = b"00";

const NAME: Range<usize> = 0..100;
const SIZE: Range<usize> = 124..136;
const CHECKSUM: Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const LINKNAME: Range<usize> = 157..257;
const MAGIC: Range<usize> = 257..263;
const VERSION: Range<usize> = 263..265;
const PREFIX: Range<usize> = 345..500;

/// Kind of filesystem object a header describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file, type '0' or the legacy '\0'
    Regular,
    HardLink,
    Symlink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    Contiguous,
    Other(u8),
}

impl EntryType {
    pub fn from_byte(value: u8) -> Self {
        match value {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::HardLink,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::CharDevice,
            b'4' => EntryType::BlockDevice,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Contiguous,
            _ => EntryType::Other(value),
        }
    }

    /// Single character used by `runtar entries`, in the style of `ls -l`
    pub fn as_char(&self) -> char {
        match self {
            EntryType::Regular | EntryType::Contiguous => '-',
            EntryType::HardLink => 'h',
            EntryType::Symlink => 'l',
            EntryType::CharDevice => 'c',
            EntryType::BlockDevice => 'b',
            EntryType::Directory => 'd',
            EntryType::Fifo => 'p',
            EntryType::Other(_) => '?',
        }
    }
}

/// One raw 512-byte header block.
///
/// Accessors decode fields on demand; nothing is cached.
#[derive(Clone)]
pub struct HeaderBlock {
    bytes: [u8; BLOCK_SIZE],
}

impl HeaderBlock {
    pub fn new(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes = data.get(..BLOCK_SIZE)?.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    pub fn is_zero(&self) -> bool {
        is_zero_block(&self.bytes)
    }

    pub fn name_bytes(&self) -> &[u8] {
        truncate_null(&self.bytes[NAME])
    }

    pub fn prefix_bytes(&self) -> &[u8] {
        truncate_null(&self.bytes[PREFIX])
    }

    pub fn link_name_bytes(&self) -> &[u8] {
        truncate_null(&self.bytes[LINKNAME])
    }

    /// Full stored path: `prefix/name` when the ustar prefix is set.
    pub fn path(&self) -> String {
        let name = String::from_utf8_lossy(self.name_bytes());
        let prefix = self.prefix_bytes();
        if prefix.is_empty() {
            return name.into_owned();
        }
        let mut path = String::from_utf8_lossy(prefix).into_owned();
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(&name);
        path
    }

    pub fn link_name(&self) -> String {
        String::from_utf8_lossy(self.link_name_bytes()).into_owned()
    }

    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.bytes[TYPEFLAG])
    }

    pub fn size(&self) -> Option<u64> {
        parse_octal(&self.bytes[SIZE])
    }

    pub fn stored_checksum(&self) -> Option<u64> {
        parse_octal(&self.bytes[CHECKSUM])
    }

    /// Unsigned sum of the block with the checksum field counted as spaces
    pub fn compute_checksum(&self) -> u64 {
        self.bytes
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                if CHECKSUM.contains(&i) {
                    u64::from(b' ')
                } else {
                    u64::from(b)
                }
            })
            .sum()
    }

    pub fn has_ustar_magic(&self) -> bool {
        &self.bytes[MAGIC] == USTAR_MAGIC
    }

    pub fn has_ustar_version(&self) -> bool {
        &self.bytes[VERSION] == USTAR_VERSION
    }
}

impl fmt::Debug for HeaderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderBlock")
            .field("path", &self.path())
            .field("entry_type", &self.entry_type())
            .field("size", &self.size())
            .field("ustar", &self.has_ustar_magic())
            .finish()
    }
}

/// A decoded archive record: header fields plus where the header sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    pub path: String,
    pub entry_type: EntryType,
    pub size: u64,
    pub link_name: String,
    /// Byte offset of the header block within the archive
    pub header_offset: u64,
}

impl TarEntry {
    /// Decode the fields the walker needs from a header block.
    pub fn from_header(header: &HeaderBlock, header_offset: u64) -> Result<Self> {
        let size = header.size().ok_or(TarError::InvalidNumeric {
            field: "size",
            offset: header_offset,
        })?;

        Ok(Self {
            path: header.path(),
            entry_type: header.entry_type(),
            size,
            link_name: header.link_name(),
            header_offset,
        })
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::Regular
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.entry_type == EntryType::Symlink
    }

    /// Number of blocks the payload occupies
    pub fn data_blocks(&self) -> u64 {
        self.size.div_ceil(BLOCK_SIZE as u64)
    }

    /// Offset of the first payload byte
    pub fn data_offset(&self) -> u64 {
        self.header_offset + BLOCK_SIZE as u64
    }

    /// Offset of the following header, `None` on overflow
    pub fn next_header_offset(&self) -> Option<u64> {
        self.data_blocks()
            .checked_add(1)?
            .checked_mul(BLOCK_SIZE as u64)?
            .checked_add(self.header_offset)
    }
}

pub fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Cut a fixed-width text field at its first NUL.
pub fn truncate_null(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

/// Parse an octal text field.
///
/// Leading spaces are skipped and the number ends at the first space or NUL.
/// An empty field is zero. Returns `None` for any other byte or on overflow.
pub fn parse_octal(bytes: &[u8]) -> Option<u64> {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let digits = &bytes[start..];
    let end = digits
        .iter()
        .position(|&b| b == b' ' || b == b'\0')
        .unwrap_or(digits.len());

    digits[..end].iter().try_fold(0u64, |value, &b| {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        value.checked_mul(8)?.checked_add(u64::from(b - b'0'))
    })
}
