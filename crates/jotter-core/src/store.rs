use crate::search::{search_notes, SearchResults};
use crate::storage::{ID_KEY, NOTES_KEY};
use crate::timestamp::{format_timestamp, Clock, SystemClock};
use crate::{Error, KeyValueStorage, Note};
use std::collections::HashSet;

/// The next id to hand out. Issuing is pure; persisting the counter is the
/// store's job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdCounter(u64);

impl IdCounter {
    pub fn new(next: u64) -> Self {
        Self(next)
    }

    /// The id the next call to [`issue`](Self::issue) would return.
    pub fn peek(self) -> u64 {
        self.0
    }

    /// Returns the assigned id and the advanced counter, or an error once
    /// every id has been handed out.
    pub fn issue(self) -> Result<(u64, IdCounter), Error> {
        let advanced = self
            .0
            .checked_add(1)
            .ok_or_else(|| Error::Validation("note ids exhausted".into()))?;
        Ok((self.0, IdCounter(advanced)))
    }

    /// Raise the counter so it is at least `floor`.
    pub fn at_least(self, floor: u64) -> IdCounter {
        IdCounter(self.0.max(floor))
    }
}

/// Notes and counter as read from durable storage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoredState {
    pub notes: Vec<Note>,
    pub counter: IdCounter,
}

/// Behavior knobs for [`NoteStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Reset the id counter to zero on [`NoteStore::clear`].
    pub reset_counter_on_clear: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            reset_counter_on_clear: true,
        }
    }
}

/// Read the persisted notes and counter without touching storage.
///
/// Missing keys yield an empty list and a zero counter. Data that does not
/// parse, notes sharing an id, or a note with the largest possible id fail
/// with [`Error::CorruptState`]. A counter that is missing or behind the
/// stored ids is raised past the largest id.
pub async fn load_state<S: KeyValueStorage>(storage: &S) -> Result<StoredState, Error> {
    let notes: Vec<Note> = match storage.get(NOTES_KEY).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| Error::CorruptState(format!("Failed to parse notes: {}", e)))?,
        None => Vec::new(),
    };

    let mut seen = HashSet::new();
    for note in &notes {
        if !seen.insert(note.id) {
            return Err(Error::CorruptState(format!("duplicate note id {}", note.id)));
        }
    }

    let counter = match storage.get(ID_KEY).await? {
        Some(raw) => serde_json::from_str::<u64>(raw.trim())
            .map(IdCounter::new)
            .map_err(|e| Error::CorruptState(format!("Failed to parse id counter: {}", e)))?,
        None => IdCounter::default(),
    };

    let floor = match notes.iter().map(|n| n.id).max() {
        Some(max) => max.checked_add(1).ok_or_else(|| {
            Error::CorruptState(format!("note id {} leaves no id to continue from", max))
        })?,
        None => 0,
    };
    if counter.peek() < floor {
        log::warn!(
            "Stored id counter {} is behind note ids, continuing from {}",
            counter.peek(),
            floor
        );
    }

    Ok(StoredState {
        notes,
        counter: counter.at_least(floor),
    })
}

/// The note collection, kept in sync with durable storage.
///
/// Every mutating operation has written its result to storage by the time it
/// returns. If a write fails, the in-memory state is rolled back and the error
/// is returned.
pub struct NoteStore<S: KeyValueStorage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    options: StoreOptions,
    notes: Vec<Note>,
    counter: IdCounter,
}

impl<S: KeyValueStorage, C: Clock> NoteStore<S, C> {
    /// Open a store over `storage` with default options.
    pub async fn open(storage: S, clock: C) -> Result<Self, Error> {
        Self::open_with_options(storage, clock, StoreOptions::default()).await
    }

    /// Open a store, discarding persisted state that is corrupt.
    pub async fn open_with_options(
        storage: S,
        clock: C,
        options: StoreOptions,
    ) -> Result<Self, Error> {
        let state = match load_state(&storage).await {
            Ok(state) => state,
            Err(Error::CorruptState(msg)) => {
                log::warn!("Discarding unreadable notes, starting empty: {}", msg);
                StoredState::default()
            }
            Err(e) => return Err(e),
        };

        log::info!(
            "Opened note store with {} notes (next id {})",
            state.notes.len(),
            state.counter.peek()
        );

        Ok(Self {
            storage,
            clock,
            options,
            notes: state.notes,
            counter: state.counter,
        })
    }

    /// All notes in display order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn next_id(&self) -> u64 {
        self.counter.peek()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Create a note and append it to the list.
    pub async fn add(
        &mut self,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Note, Error> {
        let (id, advanced) = self.counter.issue()?;
        let note = Note {
            id,
            title: title.into(),
            text: text.into(),
            timestamp: format_timestamp(self.clock.now()),
        };

        self.write_counter(advanced).await?;

        self.notes.push(note.clone());
        if let Err(e) = self.write_notes().await {
            self.notes.pop();
            self.restore_counter().await;
            return Err(e);
        }

        self.counter = advanced;
        log::debug!("Added note {}", id);
        Ok(note)
    }

    /// Delete a note by id. Returns false if no note has that id.
    pub async fn remove(&mut self, id: u64) -> Result<bool, Error> {
        let index = match self.notes.iter().position(|n| n.id == id) {
            Some(index) => index,
            None => return Ok(false),
        };

        let removed = self.notes.remove(index);
        if let Err(e) = self.write_notes().await {
            self.notes.insert(index, removed);
            return Err(e);
        }

        log::debug!("Removed note {}", id);
        Ok(true)
    }

    /// Delete every note and erase this store's keys from storage.
    ///
    /// Only the `notes` and `id` keys are removed; anything else in the
    /// backend is left alone.
    pub async fn clear(&mut self) -> Result<(), Error> {
        self.storage.remove(NOTES_KEY).await?;

        if let Err(e) = self.storage.remove(ID_KEY).await {
            if let Err(restore) = self.write_notes().await {
                log::error!("Failed to restore notes after failed clear: {}", restore);
            }
            return Err(e);
        }

        let count = self.notes.len();
        self.notes.clear();
        if self.options.reset_counter_on_clear {
            self.counter = IdCounter::default();
        }

        log::info!("Cleared {} notes", count);
        Ok(())
    }

    /// Case-insensitive search over titles and texts. See [`search_notes`].
    pub fn search(&self, query: &str) -> SearchResults {
        search_notes(&self.notes, query)
    }

    async fn write_notes(&self) -> Result<(), Error> {
        let contents = serde_json::to_string(&self.notes)
            .map_err(|e| Error::Persistence(format!("Failed to serialize notes: {}", e)))?;
        self.storage.set(NOTES_KEY, &contents).await
    }

    async fn write_counter(&self, counter: IdCounter) -> Result<(), Error> {
        self.storage.set(ID_KEY, &counter.peek().to_string()).await
    }

    async fn restore_counter(&self) {
        if let Err(e) = self.write_counter(self.counter).await {
            log::error!("Failed to restore id counter: {}", e);
        }
    }
}
