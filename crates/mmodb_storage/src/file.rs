//! File-based flat store with atomic replacement.

use crate::error::{StorageError, StorageResult};
use crate::store::{DumpWriter, FlatStore};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A flat store backed by one file on disk.
///
/// Dumps go through a write-then-rename sequence:
/// 1. Take an advisory exclusive lock on `<path>.lock`
/// 2. Write the new contents to `<path>.tmp`
/// 3. Sync the temporary file to disk
/// 4. Rename it over `<path>`
/// 5. Fsync the parent directory so the rename is durable
///
/// A crash at any point leaves either the old or the new copy in place, never
/// a partial one. The commit succeeds once the rename has happened: a failed
/// directory fsync is logged, not returned, since the new copy is already
/// the one readers see.
///
/// # Example
///
/// ```no_run
/// use mmodb_storage::{FileStore, FlatStore};
/// use std::io::Write;
///
/// let mut store = FileStore::new("save/account.txt");
/// let mut dump = store.begin_dump().unwrap();
/// dump.write_all(b"20080409\n").unwrap();
/// dump.commit().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store for the file at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates an empty file at `path` if none exists, with parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be created.
    pub fn create_if_missing(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(path);
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&store.path)?;
        Ok(store)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }
}

impl FlatStore for FileStore {
    fn open_reader(&self) -> StorageResult<Box<dyn io::BufRead + '_>> {
        match File::open(&self.path) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::Missing {
                path: self.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn begin_dump(&mut self) -> StorageResult<Box<dyn DumpWriter + '_>> {
        Ok(Box::new(self.open_dump()?))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

impl FileStore {
    fn open_dump(&self) -> StorageResult<FileDump> {
        let lock_path = self.sibling(".lock");
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked { path: lock_path });
        }

        let temp_path = self.sibling(".tmp");
        let file = File::create(&temp_path)?;

        Ok(FileDump {
            writer: BufWriter::new(file),
            temp_path,
            target: self.path.clone(),
            lock,
            committed: false,
        })
    }
}

/// Exclusive write handle for [`FileStore`].
struct FileDump {
    writer: BufWriter<File>,
    temp_path: PathBuf,
    target: PathBuf,
    lock: File,
    committed: bool,
}

impl Write for FileDump {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl FileDump {
    fn replace_target(&mut self, sync_dir: fn(&Path) -> StorageResult<()>) -> StorageResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        fs::rename(&self.temp_path, &self.target)?;
        self.committed = true;

        if let Err(e) = sync_dir(&self.target) {
            tracing::warn!(path = %self.target.display(), error = %e, "directory fsync failed after rename");
        }
        Ok(())
    }
}

impl DumpWriter for FileDump {
    fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.replace_target(sync_directory)
    }
}

impl Drop for FileDump {
    fn drop(&mut self) {
        if !self.committed {
            // Abandoned dump: the previous copy stays authoritative.
            let _ = fs::remove_file(&self.temp_path);
        }
        let _ = FileExt::unlock(&self.lock);
    }
}

/// Fsyncs the directory holding `path` so a rename into it is durable.
#[cfg(unix)]
fn sync_directory(path: &Path) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> StorageResult<()> {
    // NTFS journals metadata; directory handles cannot be fsynced on Windows.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn read_all(store: &FileStore) -> String {
        let mut text = String::new();
        store.open_reader().unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("account.txt"));
        assert!(matches!(store.open_reader(), Err(StorageError::Missing { .. })));
    }

    #[test]
    fn create_if_missing_makes_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("account.txt");
        let store = FileStore::create_if_missing(&path).unwrap();
        assert!(path.exists());
        assert_eq!(read_all(&store), "");
    }

    #[test]
    fn commit_replaces_contents() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::create_if_missing(dir.path().join("account.txt")).unwrap();

        let mut dump = store.begin_dump().unwrap();
        dump.write_all(b"first\n").unwrap();
        dump.commit().unwrap();
        assert_eq!(read_all(&store), "first\n");

        let mut dump = store.begin_dump().unwrap();
        dump.write_all(b"second\n").unwrap();
        dump.commit().unwrap();
        assert_eq!(read_all(&store), "second\n");
        assert!(!store.sibling(".tmp").exists());
    }

    #[test]
    fn abandoned_dump_keeps_previous_copy() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::create_if_missing(dir.path().join("account.txt")).unwrap();

        let mut dump = store.begin_dump().unwrap();
        dump.write_all(b"durable\n").unwrap();
        dump.commit().unwrap();

        {
            let mut dump = store.begin_dump().unwrap();
            dump.write_all(b"half writ").unwrap();
        }

        assert_eq!(read_all(&store), "durable\n");
        assert!(!store.sibling(".tmp").exists());
    }

    #[test]
    fn failed_directory_sync_still_commits() {
        let dir = tempdir().unwrap();
        let store = FileStore::create_if_missing(dir.path().join("account.txt")).unwrap();

        let mut dump = store.open_dump().unwrap();
        dump.write_all(b"renamed\n").unwrap();
        dump.replace_target(|_| Err(io::Error::other("fsync refused").into()))
            .unwrap();
        drop(dump);

        assert_eq!(read_all(&store), "renamed\n");
        assert!(!store.sibling(".tmp").exists());
    }

    #[test]
    fn concurrent_dump_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("account.txt");
        let mut first = FileStore::create_if_missing(&path).unwrap();
        let mut second = FileStore::new(&path);

        let held = first.begin_dump().unwrap();
        assert!(matches!(second.begin_dump(), Err(StorageError::Locked { .. })));
        drop(held);

        assert!(second.begin_dump().is_ok());
    }

    #[test]
    fn location_is_the_path() {
        let store = FileStore::new("save/account.txt");
        assert_eq!(store.location(), "save/account.txt");
        assert_eq!(store.path(), Path::new("save/account.txt"));
    }
}
