//! Core domain types for the word pack catalog.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::CatalogError;

/// Store-assigned identifier of a word pack.
pub type PackId = i64;

/// Store-assigned identifier of a word.
pub type WordId = i64;

/// Languages with a remote word corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "DE")]
    De,
    #[serde(rename = "EN")]
    En,
}

impl Language {
    /// Every supported language, in seeding order.
    pub const ALL: [Language; 2] = [Language::De, Language::En];

    /// Upper-case language code, also used as the default pack name.
    pub fn code(&self) -> &'static str {
        match self {
            Self::De => "DE",
            Self::En => "EN",
        }
    }

    /// Lower-case path segment used in remote URLs and on-disk layouts.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
        }
    }

    /// Number of remote groups in this language's corpus.
    pub fn group_count(&self) -> u32 {
        match self {
            Self::De => 56,
            Self::En => 20,
        }
    }

    /// Every remote group number for this language.
    pub fn all_groups(&self) -> BTreeSet<u32> {
        (0..self.group_count()).collect()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DE" => Ok(Self::De),
            "EN" => Ok(Self::En),
            other => Err(CatalogError::invalid_argument(format!(
                "unsupported language: {}",
                other
            ))),
        }
    }
}

/// Discriminant of a pack's source, persisted as `source_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Default,
    File,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "file" => Ok(Self::File),
            other => Err(CatalogError::database(format!(
                "unknown source type: {}",
                other
            ))),
        }
    }
}

/// Group bookkeeping for a pack backed by a remote corpus.
///
/// `local_groups` and `remote_groups` partition `0..language.group_count()`.
/// Groups only ever move from remote to local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSource {
    pub language: Language,
    pub local_groups: BTreeSet<u32>,
    pub remote_groups: BTreeSet<u32>,
}

impl DefaultSource {
    /// Fresh bookkeeping: nothing local, every group remote.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            local_groups: BTreeSet::new(),
            remote_groups: language.all_groups(),
        }
    }

    /// Check that the two sets are disjoint and cover exactly the
    /// language's group range.
    pub fn is_consistent(&self) -> bool {
        if !self.local_groups.is_disjoint(&self.remote_groups) {
            return false;
        }
        let union: BTreeSet<u32> = self
            .local_groups
            .union(&self.remote_groups)
            .copied()
            .collect();
        union == self.language.all_groups()
    }

    /// Move `group` from remote to local.
    ///
    /// Returns false (and changes nothing) if the group is not remote.
    pub fn mark_merged(&mut self, group: u32) -> bool {
        if !self.remote_groups.remove(&group) {
            return false;
        }
        self.local_groups.insert(group);
        true
    }
}

/// Source payload of a pack, keyed by its source type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackSource {
    /// Backed by a remote corpus organized into numbered groups.
    Default(DefaultSource),
    /// A finite local word list, fully inserted at creation.
    File,
}

impl PackSource {
    pub fn source_type(&self) -> SourceType {
        match self {
            Self::Default(_) => SourceType::Default,
            Self::File => SourceType::File,
        }
    }
}

/// A named collection of guessable words.
#[derive(Debug, Clone)]
pub struct WordPack {
    /// Store-assigned identifier.
    pub id: PackId,

    /// Display label.
    pub name: String,

    /// Creation timestamp (Unix millis).
    pub created_at: u64,

    /// Source payload.
    pub source: PackSource,
}

impl WordPack {
    pub fn source_type(&self) -> SourceType {
        self.source.source_type()
    }

    pub fn is_default(&self) -> bool {
        matches!(self.source, PackSource::Default(_))
    }

    /// Group bookkeeping, if this pack has a remote corpus.
    pub fn default_source(&self) -> Option<&DefaultSource> {
        match &self.source {
            PackSource::Default(source) => Some(source),
            PackSource::File => None,
        }
    }

    pub fn language(&self) -> Option<Language> {
        self.default_source().map(|s| s.language)
    }
}

/// A stored word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Store-assigned identifier.
    pub id: WordId,

    /// Owning pack.
    pub pack_id: PackId,

    /// The literal text.
    pub word: String,

    /// Dense zero-based position inside the pack.
    pub index: u64,

    /// Remote group this word was merged from (default packs only).
    pub group_index: Option<u32>,
}

/// A word waiting to be appended. The store assigns id and index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub pack_id: PackId,
    pub word: String,
}

impl NewWord {
    pub fn new(pack_id: PackId, word: impl Into<String>) -> Self {
        Self {
            pack_id,
            word: word.into(),
        }
    }

    /// Build a batch for one pack from a list of words.
    pub fn batch<I, S>(pack_id: PackId, words: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        words.into_iter().map(|w| Self::new(pack_id, w)).collect()
    }
}

/// Read-only summary of a pack for presentation code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPackInfo {
    pub id: PackId,
    pub name: String,
    pub is_default: bool,
    pub word_count: u64,
}

/// Current time in Unix millis.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::De.code(), "DE");
        assert_eq!(Language::En.path_segment(), "en");
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_default_source_partition() {
        let mut source = DefaultSource::new(Language::En);
        assert!(source.is_consistent());
        assert_eq!(source.remote_groups.len(), 20);

        assert!(source.mark_merged(1));
        assert!(!source.mark_merged(1));
        assert!(!source.mark_merged(99));
        assert!(source.is_consistent());
        assert_eq!(source.local_groups.len(), 1);
        assert_eq!(source.remote_groups.len(), 19);
    }

    #[test]
    fn test_default_source_detects_stale_shape() {
        let mut source = DefaultSource::new(Language::En);
        source.remote_groups.remove(&5);
        assert!(!source.is_consistent());

        let mut source = DefaultSource::new(Language::En);
        source.local_groups.insert(3);
        assert!(!source.is_consistent());
    }

    #[test]
    fn test_default_source_json_shape() {
        let source = DefaultSource::new(Language::En);
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["language"], "EN");
        assert!(json["localGroups"].as_array().unwrap().is_empty());
        assert_eq!(json["remoteGroups"].as_array().unwrap().len(), 20);
    }

    #[test]
    fn test_new_word_batch() {
        let batch = NewWord::batch(7, ["a", "b"]);
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|w| w.pack_id == 7));
    }
}
