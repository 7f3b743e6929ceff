//! Jotter core library - notes, the note store, storage trait and search.
//!
//! Backends for durable storage live in their own crates; this crate only
//! ships an in-memory one.

mod error;
mod note;
mod storage;
mod store;
mod search;
mod timestamp;
mod debounce;
mod migrations;

pub use error::Error;
pub use note::Note;
pub use storage::{
    namespaced_key, validate_namespace, KeyValueStorage, MemoryStorage, ID_KEY, NOTES_KEY,
};
pub use store::{load_state, IdCounter, NoteStore, StoreOptions, StoredState};
pub use search::{search_notes, SearchResults};
pub use timestamp::{format_timestamp, Clock, FixedClock, SystemClock};
pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use migrations::{get_pending_migrations, Migration, META_TABLE, MIGRATIONS, SCHEMA_VERSION};
