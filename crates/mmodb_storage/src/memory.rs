//! In-memory flat store for testing.

use crate::error::{StorageError, StorageResult};
use crate::store::{DumpWriter, FlatStore};
use parking_lot::RwLock;
use std::io::{self, BufRead, Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// An in-memory flat store.
///
/// Clones share the same contents, so a test can hand one clone to a backend
/// and inspect what was published through another. The store counts commits
/// and can be told to fail them, to exercise flush error paths.
///
/// # Example
///
/// ```rust
/// use mmodb_storage::{FlatStore, MemoryStore};
/// use std::io::Write;
///
/// let observer = MemoryStore::with_contents("20080409\n");
/// let mut store = observer.clone();
///
/// let mut dump = store.begin_dump().unwrap();
/// dump.write_all(b"replaced\n").unwrap();
/// dump.commit().unwrap();
///
/// assert_eq!(observer.contents().as_deref(), Some("replaced\n"));
/// assert_eq!(observer.commits(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: Option<Vec<u8>>,
    commits: usize,
    fail_commits: bool,
}

impl MemoryStore {
    /// Creates a store with no durable copy; readers get `Missing`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose durable copy is `text`.
    #[must_use]
    pub fn with_contents(text: impl Into<String>) -> Self {
        let store = Self::new();
        store.inner.write().data = Some(text.into().into_bytes());
        store
    }

    /// Returns the durable copy, if any.
    #[must_use]
    pub fn contents(&self) -> Option<String> {
        self.inner
            .read()
            .data
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of successful commits so far.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.inner.read().commits
    }

    /// Makes every following commit fail (or succeed again).
    pub fn set_fail_commits(&self, fail: bool) {
        self.inner.write().fail_commits = fail;
    }
}

impl FlatStore for MemoryStore {
    fn open_reader(&self) -> StorageResult<Box<dyn BufRead + '_>> {
        match &self.inner.read().data {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(StorageError::Missing {
                path: PathBuf::from(self.location()),
            }),
        }
    }

    fn begin_dump(&mut self) -> StorageResult<Box<dyn DumpWriter + '_>> {
        Ok(Box::new(MemoryDump {
            buffer: Vec::new(),
            inner: Arc::clone(&self.inner),
        }))
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

struct MemoryDump {
    buffer: Vec<u8>,
    inner: Arc<RwLock<MemoryInner>>,
}

impl Write for MemoryDump {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DumpWriter for MemoryDump {
    fn commit(self: Box<Self>) -> StorageResult<()> {
        let MemoryDump { buffer, inner } = *self;
        let mut inner = inner.write();
        if inner.fail_commits {
            return Err(StorageError::Io(io::Error::other("injected commit failure")));
        }
        inner.data = Some(buffer);
        inner.commits += 1;
        Ok(())
    }
}
