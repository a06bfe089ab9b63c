//! Core traits defining the interfaces between components.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Language, NewWord, PackId, Word, WordPack, WordPackInfo};

/// Durable bookkeeping of word packs and words.
///
/// Every multi-step mutation must run as one atomic transaction so that
/// concurrent callers never observe or produce duplicate indices or a
/// half-merged group.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // Lifecycle
    async fn initialize(&self) -> Result<()>;
    async fn clear(&self) -> Result<()>;

    // Pack operations
    async fn list_packs(&self) -> Result<Vec<WordPack>>;
    async fn get_pack(&self, id: PackId) -> Result<WordPack>;
    async fn get_default_pack(&self, language: Language) -> Result<WordPack>;
    async fn list_pack_infos(&self) -> Result<Vec<WordPackInfo>>;

    // Word operations
    async fn list_words(&self, pack_id: PackId) -> Result<Vec<Word>>;
    async fn get_word(&self, pack_id: PackId, index: u64) -> Result<Option<Word>>;
    async fn word_count(&self, pack_id: PackId) -> Result<u64>;

    /// Append a batch of words to one pack.
    ///
    /// Indices continue from the pack's current word count. When `group`
    /// is given it is moved from the pack's remote groups to its local
    /// groups in the same transaction; if it is not remote the whole call
    /// fails with `GroupAlreadySaved` and nothing is written.
    async fn append_words(&self, words: &[NewWord], group: Option<u32>) -> Result<Vec<Word>>;

    // File packs
    async fn add_file_word_pack(&self, name: &str, words: &[String]) -> Result<PackId>;
    async fn delete_file_word_pack(&self, id: PackId) -> Result<()>;
}

/// Retrieves the raw text of one remote word group.
#[async_trait]
pub trait GroupFetcher: Send + Sync {
    /// Fetch the group's words as newline-separated text.
    ///
    /// Must have no side effects on failure.
    async fn fetch_group(&self, language: Language, group: u32) -> Result<String>;
}
