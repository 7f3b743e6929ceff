use crate::Note;

/// Outcome of a search over the note list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub notes: Vec<Note>,
    /// False when the query was empty and `notes` is the whole list.
    pub filtered: bool,
}

impl SearchResults {
    /// The `Results: N` line shown above filtered results, if any.
    pub fn annotation(&self) -> Option<String> {
        if self.filtered {
            Some(format!("Results: {}", self.notes.len()))
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Case-insensitive substring search over titles and texts.
///
/// Matches keep their relative order. An empty query returns every note
/// unfiltered.
pub fn search_notes(notes: &[Note], query: &str) -> SearchResults {
    if query.is_empty() {
        return SearchResults {
            notes: notes.to_vec(),
            filtered: false,
        };
    }

    let needle = query.to_lowercase();
    let notes = notes
        .iter()
        .filter(|note| note.contains_lowercase(&needle))
        .cloned()
        .collect();

    SearchResults {
        notes,
        filtered: true,
    }
}
