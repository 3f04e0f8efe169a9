use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::{Error, Result};

pub const BUILTIN_TOPIC_TABLE_VERSION: u32 = 1;

const BUILTIN_TOPICS: &[(&str, &[&str])] = &[
    ("Opsparing", &["opsparing", "spare", "spareri"]),
    ("Investering", &["investering", "aktiesparekonto", "fonde"]),
    ("Gæld", &["gæld", "lån", "rente", "gældfri", "gældfrihed", "boliglån"]),
    ("Budget", &["budget", "økonomi", "privatøkonomi"]),
    ("Pension", &["pension", "pensionsopsparing", "aldersopsparing", "ratepension"]),
    ("Forsikring", &["forsikring"]),
    ("Bolig", &["bolig", "huskøb", "lejlighed", "ejendom", "boligmarked"]),
    ("Skatter", &["skat", "skatter"]),
    ("Børn & Familie", &["børnefamilie", "familieøkonomi"]),
    ("Studerende", &["studerende"]),
    ("Begynder", &["begynder"]),
    ("Øvet", &["øvet"]),
    ("Avanceret", &["avanceret"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub label: String,
    pub synonyms: Vec<String>,
}

/// The single mapping from sidebar topic labels to tag substrings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicTable {
    version: u32,
    topics: Vec<TopicEntry>,
}

#[derive(Deserialize)]
struct RawTopicTable {
    #[serde(default = "default_version")]
    version: u32,
    topics: Vec<TopicEntry>,
}

fn default_version() -> u32 {
    1
}

impl TopicTable {
    pub fn builtin() -> Self {
        Self {
            version: BUILTIN_TOPIC_TABLE_VERSION,
            topics: BUILTIN_TOPICS
                .iter()
                .map(|(label, synonyms)| TopicEntry {
                    label: label.to_string(),
                    synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Builds a validated table. Labels must be non-blank and unique
    /// (ignoring case); every label needs at least one non-blank synonym.
    /// Synonyms are lowercased.
    pub fn new(version: u32, topics: Vec<TopicEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(topics.len());

        for entry in topics {
            let label = entry.label.trim().to_string();
            if label.is_empty() {
                return Err(Error::InvalidTopicTable("blank topic label".to_string()));
            }
            if !seen.insert(label.to_lowercase()) {
                return Err(Error::InvalidTopicTable(format!(
                    "duplicate topic label '{}'",
                    label
                )));
            }
            if entry.synonyms.is_empty() {
                return Err(Error::InvalidTopicTable(format!(
                    "topic '{}' has no synonyms",
                    label
                )));
            }
            let mut synonyms = Vec::with_capacity(entry.synonyms.len());
            for synonym in entry.synonyms {
                let synonym = synonym.trim().to_lowercase();
                if synonym.is_empty() {
                    return Err(Error::InvalidTopicTable(format!(
                        "topic '{}' has a blank synonym",
                        label
                    )));
                }
                synonyms.push(synonym);
            }
            normalized.push(TopicEntry { label, synonyms });
        }

        Ok(Self {
            version,
            topics: normalized,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawTopicTable = serde_json::from_str(json)?;
        Self::new(raw.version, raw.topics)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.topics
    }

    pub fn lookup(&self, label: &str) -> Option<&TopicEntry> {
        let wanted = label.trim().to_lowercase();
        self.topics
            .iter()
            .find(|entry| entry.label.to_lowercase() == wanted)
    }

    /// Synonyms for `label`. Unknown labels expand to themselves, lowercased.
    pub fn expand(&self, label: &str) -> Vec<String> {
        match self.lookup(label) {
            Some(entry) => entry.synonyms.clone(),
            None => {
                debug!("Topic '{}' is not in the topic table, matching it literally", label);
                vec![label.trim().to_lowercase()]
            }
        }
    }
}

impl Default for TopicTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Loose Danish-friendly match: the tag contains a synonym or a synonym
/// contains the tag. `tag` must already be lowercased.
pub fn tag_matches_any(tag: &str, synonyms: &[String]) -> bool {
    let tag = tag.trim();
    if tag.is_empty() {
        return false;
    }
    synonyms
        .iter()
        .any(|synonym| tag.contains(synonym.as_str()) || synonym.contains(tag))
}
