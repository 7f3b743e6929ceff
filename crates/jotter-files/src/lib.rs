//! File-based key-value storage for Jotter.
//!
//! Each key is one file, named after the namespace and the key:
//!
//! ```text
//! .jotter/
//!   .lock                    # Lock file for atomic operations
//!   jotter-notes.json
//!   jotter-id.json
//!   work-notes.json          # another namespace sharing the directory
//! ```

use fs2::FileExt;
use jotter_core::{namespaced_key, validate_namespace, Error, KeyValueStorage};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const FILE_EXTENSION: &str = "json";

/// File-based storage implementation.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    namespace: String,
}

impl FileStorage {
    /// Open storage for `namespace` in the given directory, creating it if needed.
    pub fn open<P: AsRef<Path>>(root: P, namespace: &str) -> Result<Self, Error> {
        validate_namespace(namespace)?;
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .map_err(|e| Error::Storage(format!("Failed to create storage dir: {}", e)))?;

        Ok(Self {
            root,
            namespace: namespace.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Acquire an exclusive lock on the storage directory.
    fn lock(&self) -> Result<FileLock, Error> {
        let lock_path = self.root.join(".lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| Error::Persistence(format!("Failed to open lock file: {}", e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::Persistence(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }

    /// Get the path of the file holding `key`.
    fn key_path(&self, key: &str) -> PathBuf {
        let name = sanitize_key(&namespaced_key(&self.namespace, key));
        self.root.join(format!("{}.{}", name, FILE_EXTENSION))
    }

    /// Write a value to disk atomically.
    fn write_file(&self, path: &Path, contents: &str) -> Result<(), Error> {
        let temp_path = path.with_extension(format!("{}.tmp", FILE_EXTENSION));

        let mut file = File::create(&temp_path)
            .map_err(|e| Error::Persistence(format!("Failed to create temp file: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| Error::Persistence(format!("Failed to write temp file: {}", e)))?;

        file.sync_all()
            .map_err(|e| Error::Persistence(format!("Failed to sync temp file: {}", e)))?;

        fs::rename(&temp_path, path)
            .map_err(|e| Error::Persistence(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }
}

/// Keys become file names, so anything outside a safe set is replaced.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// RAII guard for file locking.
struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[async_trait::async_trait(?Send)]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let _lock = self.lock()?;
        let path = self.key_path(key);
        self.write_file(&path, value)?;
        log::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let _lock = self.lock()?;
        let path = self.key_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Persistence(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use jotter_core::{load_state, FixedClock, NoteStore, ID_KEY, NOTES_KEY};
    use std::thread;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path(), "jotter").unwrap();
        (temp_dir, storage)
    }

    fn clock() -> FixedClock {
        FixedClock(
            NaiveDate::from_ymd_opt(2025, 4, 2)
                .unwrap()
                .and_hms_opt(18, 7, 0)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_get_set_remove() {
        let (temp, storage) = setup();

        assert_eq!(storage.get(NOTES_KEY).await.unwrap(), None);

        storage.set(NOTES_KEY, "[]").await.unwrap();
        assert_eq!(storage.get(NOTES_KEY).await.unwrap().as_deref(), Some("[]"));
        assert!(temp.path().join("jotter-notes.json").exists());

        storage.remove(NOTES_KEY).await.unwrap();
        assert_eq!(storage.get(NOTES_KEY).await.unwrap(), None);
        assert!(!temp.path().join("jotter-notes.json").exists());

        // Removing a missing key is fine
        storage.remove(NOTES_KEY).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let (temp, storage) = setup();

        storage.set(ID_KEY, "1").await.unwrap();
        storage.set(ID_KEY, "2").await.unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(storage.get(ID_KEY).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_namespaces_share_directory() {
        let (temp, storage) = setup();
        let other = FileStorage::open(temp.path(), "work").unwrap();

        storage.set(ID_KEY, "1").await.unwrap();
        other.set(ID_KEY, "9").await.unwrap();

        assert_eq!(storage.get(ID_KEY).await.unwrap().as_deref(), Some("1"));
        assert_eq!(other.get(ID_KEY).await.unwrap().as_deref(), Some("9"));
    }

    #[test]
    fn test_invalid_namespace() {
        let temp = TempDir::new().unwrap();
        let err = FileStorage::open(temp.path(), "../escape").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("jotter-notes"), "jotter-notes");
        assert_eq!(sanitize_key("a/b c"), "a_b_c");
    }

    #[tokio::test]
    async fn test_store_survives_reopen() {
        let (temp, storage) = setup();

        let mut store = NoteStore::open(storage, clock()).await.unwrap();
        store.add("Groceries", "Milk, eggs").await.unwrap();
        store.add("Todo", "Call Bob").await.unwrap();
        store.remove(0).await.unwrap();
        let expected = store.notes().to_vec();
        drop(store);

        let storage = FileStorage::open(temp.path(), "jotter").unwrap();
        let store = NoteStore::open(storage, clock()).await.unwrap();
        assert_eq!(store.notes(), expected.as_slice());
        assert_eq!(store.next_id(), 2);
        assert_eq!(store.notes()[0].timestamp, "18:07 - 2/4/2025");
    }

    #[tokio::test]
    async fn test_counter_survives_reopen() {
        let (temp, storage) = setup();

        let mut store = NoteStore::open(storage, clock()).await.unwrap();
        store.add("a", "").await.unwrap();
        store.add("b", "").await.unwrap();
        store.add("c", "").await.unwrap();
        store.remove(2).await.unwrap();
        drop(store);

        let storage = FileStorage::open(temp.path(), "jotter").unwrap();
        let mut store = NoteStore::open(storage, clock()).await.unwrap();
        assert_eq!(store.next_id(), 3);
        assert_eq!(store.add("d", "").await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_clear_keeps_other_namespaces() {
        let (temp, storage) = setup();
        let other = FileStorage::open(temp.path(), "work").unwrap();
        let mut other_store = NoteStore::open(other.clone(), clock()).await.unwrap();
        other_store.add("Keep", "me").await.unwrap();

        let mut store = NoteStore::open(storage, clock()).await.unwrap();
        store.add("Drop", "me").await.unwrap();
        store.clear().await.unwrap();

        assert!(!temp.path().join("jotter-notes.json").exists());
        assert!(!temp.path().join("jotter-id.json").exists());

        let state = load_state(&other).await.unwrap();
        assert_eq!(state.notes.len(), 1);
        assert_eq!(state.notes[0].title, "Keep");
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let (temp, storage) = setup();
        fs::write(temp.path().join("jotter-notes.json"), "not json").unwrap();

        assert!(load_state(&storage).await.unwrap_err().is_corrupt_state());

        let mut store = NoteStore::open(storage, clock()).await.unwrap();
        assert!(store.notes().is_empty());
        assert_eq!(store.add("Fresh", "").await.unwrap().id, 0);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let root = root.clone();
                thread::spawn(move || {
                    let rt = tokio::runtime::Runtime::new().unwrap();
                    rt.block_on(async {
                        let storage = FileStorage::open(&root, &format!("ns{}", i)).unwrap();
                        let mut store = NoteStore::open(storage, clock()).await.unwrap();
                        store.add(format!("Note {}", i), "").await.unwrap();
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..10 {
            let storage = FileStorage::open(&root, &format!("ns{}", i)).unwrap();
            let state = load_state(&storage).await.unwrap();
            assert_eq!(state.notes.len(), 1);
            assert_eq!(state.notes[0].title, format!("Note {}", i));
        }
    }
}
