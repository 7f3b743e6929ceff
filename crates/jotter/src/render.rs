//! Plain-text rendering of notes and search results.

use jotter_core::{Note, SearchResults};

const HIGHLIGHT_MARKER: &str = ">> ";

/// Render one note as a block: id and title, text, then timestamp.
/// Highlighted notes get a marker in front of every line.
pub fn render_note(note: &Note, highlight: bool) -> String {
    let mut lines = vec![format!("[{}] {}", note.id, note.title)];
    if !note.text.is_empty() {
        lines.extend(note.text.lines().map(String::from));
    }
    lines.push(note.timestamp.clone());

    let prefix = if highlight { HIGHLIGHT_MARKER } else { "" };
    lines
        .iter()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render notes in order, separated by blank lines.
pub fn render_notes(notes: &[Note], highlight: bool) -> String {
    notes
        .iter()
        .map(|note| render_note(note, highlight))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render search results. Filtered results get a `Results: N` line and
/// highlighted notes; an unfiltered result is just the plain list.
pub fn render_results(results: &SearchResults) -> String {
    let body = render_notes(&results.notes, results.filtered);
    match results.annotation() {
        Some(annotation) if body.is_empty() => annotation,
        Some(annotation) => format!("{}\n\n{}", annotation, body),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jotter_core::search_notes;

    fn note(id: u64, title: &str, text: &str) -> Note {
        Note {
            id,
            title: title.to_string(),
            text: text.to_string(),
            timestamp: "09:05 - 6/1/2025".to_string(),
        }
    }

    #[test]
    fn test_render_note() {
        let rendered = render_note(&note(3, "Todo", "Call Bob"), false);
        assert_eq!(rendered, "[3] Todo\nCall Bob\n09:05 - 6/1/2025");
    }

    #[test]
    fn test_render_note_highlighted() {
        let rendered = render_note(&note(3, "Todo", "Call Bob"), true);
        assert_eq!(
            rendered,
            ">> [3] Todo\n>> Call Bob\n>> 09:05 - 6/1/2025"
        );
    }

    #[test]
    fn test_render_empty_text() {
        let rendered = render_note(&note(0, "", ""), false);
        assert_eq!(rendered, "[0] \n09:05 - 6/1/2025");
    }

    #[test]
    fn test_render_filtered_results() {
        let notes = vec![note(0, "Groceries", "Milk"), note(1, "Todo", "Call Bob")];
        let rendered = render_results(&search_notes(&notes, "BOB"));
        assert_eq!(
            rendered,
            "Results: 1\n\n>> [1] Todo\n>> Call Bob\n>> 09:05 - 6/1/2025"
        );
    }

    #[test]
    fn test_render_unfiltered_results() {
        let notes = vec![note(0, "Groceries", "Milk"), note(1, "Todo", "Call Bob")];
        let rendered = render_results(&search_notes(&notes, ""));
        assert!(!rendered.contains("Results"));
        assert!(!rendered.contains(HIGHLIGHT_MARKER));
        assert_eq!(rendered, render_notes(&notes, false));
    }

    #[test]
    fn test_render_no_matches() {
        let notes = vec![note(0, "Groceries", "Milk")];
        assert_eq!(render_results(&search_notes(&notes, "zzz")), "Results: 0");
    }
}
