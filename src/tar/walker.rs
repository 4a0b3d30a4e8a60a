use std::sync::Arc;

use crate::error::{Result, TarError};
use crate::io::ReadAt;

use super::parser::{Records, TarParser};
use super::structures::{EntryType, TarEntry};

/// Default bound on symlink hops, the same as Linux's `MAXSYMLINKS`.
pub const DEFAULT_MAX_SYMLINK_DEPTH: usize = 40;

/// Outcome of a [`TarWalker::read_file`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRead {
    /// Bytes copied into the caller's buffer
    pub written: usize,
    /// Bytes left between the end of this read and the end of the entry
    pub remaining: u64,
}

impl FileRead {
    /// True once the read reached the end of the entry.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// What a path lookup stopped on
enum Lookup {
    Found(TarEntry),
    Redirect(String),
    Missing,
}

/// Path queries over a tar archive
///
/// Every call walks the archive from the first block; nothing is remembered
/// between calls.
pub struct TarWalker<R: ReadAt + ?Sized> {
    parser: TarParser<R>,
    max_symlink_depth: usize,
}

impl<R: ReadAt + ?Sized> TarWalker<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: TarParser::new(reader),
            max_symlink_depth: DEFAULT_MAX_SYMLINK_DEPTH,
        }
    }

    /// Limit how many symlinks `list` and `read_file` follow for one path
    pub fn with_max_symlink_depth(mut self, depth: usize) -> Self {
        self.max_symlink_depth = depth;
        self
    }

    pub fn parser(&self) -> &TarParser<R> {
        &self.parser
    }

    /// Validate the archive, see [`TarParser::check_archive`]
    pub fn check_archive(&self) -> Result<usize> {
        self.parser.check_archive()
    }

    /// True if some entry is stored at `path`
    pub fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.first_named(path)?.is_some())
    }

    /// True if the entry at `path` is a directory
    pub fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.first_named(path)?.is_some_and(|e| e.is_dir()))
    }

    /// True if a regular file is stored at `path`
    ///
    /// Headers with the same name but another type are skipped, so this
    /// agrees with [`TarWalker::read_file`].
    pub fn is_file(&self, path: &str) -> Result<bool> {
        self.any_named(path, TarEntry::is_file)
    }

    /// True if a symbolic link is stored at `path` (not followed)
    pub fn is_symlink(&self, path: &str) -> Result<bool> {
        self.any_named(path, TarEntry::is_symlink)
    }

    /// List the immediate children of the directory at `path`.
    ///
    /// Symlinks are followed. Children are returned in archive order; entries
    /// nested deeper than one level are left out.
    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.resolve(path, EntryType::Directory)?;
        self.children(&dir.path, None)
    }

    /// List into caller-provided slots.
    ///
    /// `entries.len()` is the capacity. On success the first `n` slots hold
    /// the children and `n` is returned.
    ///
    /// # Errors
    ///
    /// [`TarError::CapacityExceeded`] if the directory has more children than
    /// slots; the slot contents are unspecified in that case.
    pub fn list_into(&self, path: &str, entries: &mut [String]) -> Result<usize> {
        let dir = self.resolve(path, EntryType::Directory)?;
        let children = self.children(&dir.path, Some(entries.len()))?;
        let count = children.len();
        for (slot, child) in entries.iter_mut().zip(children) {
            *slot = child;
        }
        Ok(count)
    }

    /// Copy bytes of the regular file at `path`, starting at `offset`.
    ///
    /// At most `buf.len()` bytes are copied. Call again with
    /// `offset + written` until [`FileRead::remaining`] is zero to stream the
    /// whole entry. Symlinks are followed.
    ///
    /// # Errors
    ///
    /// [`TarError::NotFound`] if no regular file is stored at `path`,
    /// [`TarError::OffsetOutOfRange`] if `offset` is past the end of it.
    pub fn read_file(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<FileRead> {
        let entry = self.resolve(path, EntryType::Regular)?;
        if offset > entry.size {
            return Err(TarError::OffsetOutOfRange {
                offset,
                size: entry.size,
            });
        }

        let available = entry.size - offset;
        let len = usize::try_from(available).map_or(buf.len(), |a| a.min(buf.len()));
        let start = entry.data_offset() + offset;

        let n = self.parser.reader().read_full_at(start, &mut buf[..len])?;
        if n < len {
            return Err(TarError::Truncated {
                offset: start + n as u64,
            });
        }

        Ok(FileRead {
            written: len,
            remaining: available - len as u64,
        })
    }

    fn records(&self) -> Records<'_, R> {
        self.parser.records()
    }

    fn first_named(&self, path: &str) -> Result<Option<TarEntry>> {
        for entry in self.records() {
            let entry = entry?;
            if entry.path == path {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    fn any_named(&self, path: &str, matches: impl Fn(&TarEntry) -> bool) -> Result<bool> {
        for entry in self.records() {
            let entry = entry?;
            if entry.path == path && matches(&entry) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Find the first entry at `path` that is either of `kind` or a symlink.
    fn lookup(&self, path: &str, kind: EntryType) -> Result<Lookup> {
        for entry in self.records() {
            let entry = entry?;
            if entry.path != path {
                continue;
            }
            if entry.entry_type == kind {
                return Ok(Lookup::Found(entry));
            }
            if entry.is_symlink() {
                return Ok(Lookup::Redirect(entry.link_name));
            }
        }
        Ok(Lookup::Missing)
    }

    /// Follow symlinks from `path` until an entry of `kind` is found.
    fn resolve(&self, path: &str, kind: EntryType) -> Result<TarEntry> {
        let mut current = path.to_string();
        let mut hops = 0;

        loop {
            let mut outcome = self.lookup(&current, kind)?;

            // link targets name directories without the slash archivers store
            if hops > 0
                && kind == EntryType::Directory
                && matches!(outcome, Lookup::Missing)
                && !current.ends_with('/')
            {
                current.push('/');
                outcome = self.lookup(&current, kind)?;
            }

            match outcome {
                Lookup::Found(entry) => return Ok(entry),
                Lookup::Missing => return Err(TarError::not_found(path)),
                Lookup::Redirect(target) => {
                    hops += 1;
                    if hops > self.max_symlink_depth {
                        return Err(TarError::TooManySymlinks {
                            path: path.to_string(),
                            depth: self.max_symlink_depth,
                        });
                    }
                    log::debug!("following symlink {current} -> {target}");
                    current = target;
                }
            }
        }
    }

    /// Names of the immediate children of `dir`, in archive order.
    fn children(&self, dir: &str, capacity: Option<usize>) -> Result<Vec<String>> {
        let mut prefix = dir.to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }

        let mut names = Vec::new();
        for entry in self.records() {
            let entry = entry?;
            if !is_immediate_child(&prefix, &entry.path) {
                continue;
            }
            if capacity.is_some_and(|cap| names.len() == cap) {
                return Err(TarError::CapacityExceeded {
                    capacity: names.len(),
                });
            }
            names.push(entry.path);
        }

        log::debug!("{dir}: {} children", names.len());
        Ok(names)
    }
}

/// True if `path` is exactly one segment below `prefix` (which ends in '/').
fn is_immediate_child(prefix: &str, path: &str) -> bool {
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };
    let segment = rest.strip_suffix('/').unwrap_or(rest);
    !segment.is_empty() && !segment.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::tar::structures::testutil::*;

    fn walker(data: Vec<u8>) -> TarWalker<MemoryReader> {
        TarWalker::new(Arc::new(MemoryReader::new(data)))
    }

    fn tree() -> TarWalker<MemoryReader> {
        walker(
            Fixture::new()
                .file("foo.txt", b"hello")
                .dir("dir/")
                .file("dir/a", b"alpha")
                .file("dir/b", b"")
                .dir("dir/c/")
                .file("dir/c/d", b"deep")
                .dir("dir/e/")
                .symlink("link", "foo.txt")
                .symlink("dirlink", "dir")
                .file("dirty", b"not a child")
                .finish(),
        )
    }

    #[test]
    fn immediate_child() {
        assert!(is_immediate_child("dir/", "dir/a"));
        assert!(is_immediate_child("dir/", "dir/c/"));
        assert!(!is_immediate_child("dir/", "dir/"));
        assert!(!is_immediate_child("dir/", "dir/c/d"));
        assert!(!is_immediate_child("dir/", "dirty"));
        assert!(!is_immediate_child("dir/", "dir//"));
    }

    #[test]
    fn type_probes() {
        let w = tree();
        assert!(w.exists("foo.txt").unwrap());
        assert!(w.is_file("foo.txt").unwrap());
        assert!(!w.is_dir("foo.txt").unwrap());
        assert!(!w.is_symlink("foo.txt").unwrap());

        assert!(w.is_dir("dir/").unwrap());
        assert!(!w.is_dir("dir").unwrap());
        assert!(w.is_symlink("link").unwrap());
        assert!(!w.is_file("link").unwrap());

        assert!(!w.exists("missing").unwrap());
        assert!(!w.is_file("missing").unwrap());
    }

    #[test]
    fn legacy_regular_type() {
        let w = walker(
            Fixture::new()
                .record(header("old", b'\0', 0, ""), b"")
                .finish(),
        );
        assert!(w.is_file("old").unwrap());
    }

    #[test]
    fn lists_immediate_children() {
        let w = tree();
        assert_eq!(w.list("dir/").unwrap(), vec!["dir/a", "dir/b", "dir/c/", "dir/e/"]);
        assert_eq!(w.list("dir/c/").unwrap(), vec!["dir/c/d"]);
        assert!(w.list("dir/e/").unwrap().is_empty());
    }

    #[test]
    fn list_into_capacity() {
        let w = tree();
        let mut slots = vec![String::new(); 4];
        assert_eq!(w.list_into("dir/", &mut slots).unwrap(), 4);
        assert_eq!(slots[2], "dir/c/");

        let mut slots = vec![String::new(); 3];
        assert!(matches!(
            w.list_into("dir/", &mut slots),
            Err(TarError::CapacityExceeded { capacity: 3 })
        ));
    }

    #[test]
    fn list_rejects_non_directories() {
        let w = tree();
        assert!(matches!(w.list("foo.txt"), Err(TarError::NotFound { .. })));
        assert!(matches!(w.list("nope/"), Err(TarError::NotFound { .. })));
    }

    #[test]
    fn list_through_symlink() {
        let w = tree();
        assert_eq!(w.list("dirlink").unwrap(), w.list("dir/").unwrap());
    }

    #[test]
    fn read_example() {
        let w = tree();
        let mut buf = [0u8; 10];

        let r = w.read_file("foo.txt", 0, &mut buf).unwrap();
        assert_eq!(r, FileRead { written: 5, remaining: 0 });
        assert_eq!(&buf[..5], b"hello");

        let r = w.read_file("foo.txt", 3, &mut buf).unwrap();
        assert_eq!(r.written, 2);
        assert!(r.is_complete());
        assert_eq!(&buf[..2], b"lo");
    }

    #[test]
    fn read_partial_and_bounds() {
        let w = tree();
        let mut buf = [0u8; 2];
        let r = w.read_file("foo.txt", 1, &mut buf).unwrap();
        assert_eq!(r, FileRead { written: 2, remaining: 2 });
        assert_eq!(&buf, b"el");

        let r = w.read_file("foo.txt", 5, &mut buf).unwrap();
        assert_eq!(r, FileRead { written: 0, remaining: 0 });

        assert!(matches!(
            w.read_file("foo.txt", 6, &mut buf),
            Err(TarError::OffsetOutOfRange { offset: 6, size: 5 })
        ));
    }

    #[test]
    fn read_rejects_directories() {
        let w = tree();
        let mut buf = [0u8; 8];
        assert!(matches!(
            w.read_file("dir/", 0, &mut buf),
            Err(TarError::NotFound { .. })
        ));
    }

    #[test]
    fn read_through_symlink() {
        let w = tree();
        let mut buf = [0u8; 16];
        let r = w.read_file("link", 0, &mut buf).unwrap();
        assert_eq!(r.written, 5);
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn symlink_cycle_is_bounded() {
        let w = walker(
            Fixture::new()
                .symlink("a", "b")
                .symlink("b", "a")
                .symlink("self", "self")
                .finish(),
        )
        .with_max_symlink_depth(5);
        let mut buf = [0u8; 4];
        assert!(matches!(
            w.read_file("a", 0, &mut buf),
            Err(TarError::TooManySymlinks { depth: 5, .. })
        ));
        assert!(matches!(
            w.list("self"),
            Err(TarError::TooManySymlinks { .. })
        ));
    }

    #[test]
    fn dangling_symlink_is_not_found() {
        let w = walker(Fixture::new().symlink("ghost", "nowhere").finish());
        let mut buf = [0u8; 4];
        match w.read_file("ghost", 0, &mut buf) {
            Err(TarError::NotFound { path }) => assert_eq!(path, "ghost"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn truncated_payload_is_reported() {
        let payload = vec![7u8; 1000];
        let mut data = Fixture::new().file("big", &payload).finish();
        data.truncate(512 + 600);
        let w = walker(data);
        let mut buf = vec![0u8; 1000];
        assert!(matches!(
            w.read_file("big", 0, &mut buf),
            Err(TarError::Truncated { offset: 1112 })
        ));
    }
}
