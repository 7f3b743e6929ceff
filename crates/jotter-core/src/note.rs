use serde::{Deserialize, Deserializer, Serialize};

/// A single note as shown to the user and persisted under the `notes` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    pub title: String,
    pub text: String,
    /// Creation time formatted as `HH:MM - D/M/YYYY`.
    pub timestamp: String,
}

impl Note {
    /// Whether the title or the text contains `needle`.
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn contains_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.text.to_lowercase().contains(needle)
    }
}

/// Ids written through a string-only storage come back as `"3"` rather than `3`.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid note id: {:?}", s))),
    }
}
