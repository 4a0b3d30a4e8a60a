//! Shared fixtures: archives produced by the `tar` crate's builder.

#![allow(dead_code)]

use std::sync::Arc;

use runtar::{MemoryReader, TarWalker};

/// Builds a ustar archive in memory, one entry at a time.
///
/// Names are written straight into the header so trailing slashes survive
/// exactly as given.
pub struct ArchiveBuilder {
    builder: tar::Builder<Vec<u8>>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
        }
    }

    fn append(mut self, name: &str, kind: tar::EntryType, link: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_ustar();
        let old = header.as_old_mut();
        old.name[..name.len()].copy_from_slice(name.as_bytes());
        old.linkname[..link.len()].copy_from_slice(link.as_bytes());
        header.set_entry_type(kind);
        header.set_size(data.len() as u64);
        header.set_mode(if kind == tar::EntryType::Directory { 0o755 } else { 0o644 });
        header.set_mtime(1_700_000_000);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.append(name, tar::EntryType::Regular, "", data)
    }

    pub fn dir(self, name: &str) -> Self {
        self.append(name, tar::EntryType::Directory, "", &[])
    }

    pub fn symlink(self, name: &str, target: &str) -> Self {
        self.append(name, tar::EntryType::Symlink, target, &[])
    }

    pub fn fifo(self, name: &str) -> Self {
        self.append(name, tar::EntryType::Fifo, "", &[])
    }

    /// Append an entry whose path goes through the builder's own path
    /// handling, which splits long paths into the ustar prefix field.
    pub fn file_with_path(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = tar::Header::new_ustar();
        header.set_path(path).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Finish the archive, writing the two-block terminator.
    pub fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

pub fn walker(data: Vec<u8>) -> TarWalker<MemoryReader> {
    TarWalker::new(Arc::new(MemoryReader::new(data)))
}

/// The directory layout used across the tests.
///
/// ```text
/// dir/
///  ├── a
///  ├── b
///  ├── c/
///  │   └── d
///  └── e/
/// ```
///
/// with unrelated entries interleaved and appended after it.
pub fn sample_tree() -> Vec<u8> {
    ArchiveBuilder::new()
        .file("foo.txt", b"hello")
        .dir("dir/")
        .file("dir/a", b"first file")
        .dir("other/")
        .file("dir/b", b"")
        .dir("dir/c/")
        .file("dir/c/d", b"nested")
        .file("other/x", b"elsewhere")
        .dir("dir/e/")
        .symlink("to_foo", "foo.txt")
        .symlink("to_dir", "dir/")
        .symlink("to_to_foo", "to_foo")
        .fifo("pipe")
        .file("dirt", b"prefix lookalike")
        .finish()
}
