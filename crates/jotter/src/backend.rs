//! Runtime choice between the storage backends.

use clap::ValueEnum;
use jotter_core::{Error, KeyValueStorage};
use jotter_files::FileStorage;
use jotter_sqlite::SqliteStorage;
use std::path::Path;

const SQLITE_FILE: &str = "jotter.sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// One JSON file per key
    Files,
    /// A single SQLite database
    Sqlite,
}

/// The storage backend selected on the command line.
pub enum Backend {
    Files(FileStorage),
    Sqlite(SqliteStorage),
}

impl Backend {
    /// Open the selected backend inside the data directory.
    pub fn open(kind: BackendKind, dir: &Path, namespace: &str) -> Result<Self, Error> {
        log::debug!("Opening {:?} storage in {} ({})", kind, dir.display(), namespace);
        match kind {
            BackendKind::Files => FileStorage::open(dir, namespace).map(Backend::Files),
            BackendKind::Sqlite => {
                SqliteStorage::open(dir.join(SQLITE_FILE), namespace).map(Backend::Sqlite)
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl KeyValueStorage for Backend {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match self {
            Backend::Files(storage) => storage.get(key).await,
            Backend::Sqlite(storage) => storage.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        match self {
            Backend::Files(storage) => storage.set(key, value).await,
            Backend::Sqlite(storage) => storage.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        match self {
            Backend::Files(storage) => storage.remove(key).await,
            Backend::Sqlite(storage) => storage.remove(key).await,
        }
    }
}
