//! Random word selection across packs.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use wordpack_core::{CatalogError, CatalogStore, GroupFetcher, PackId, Result, Word};

use crate::population::PopulationService;

/// Picks one random word from a set of packs, populating an empty default
/// pack on demand.
pub struct SelectionService<S, F: ?Sized> {
    /// Catalog store.
    store: Arc<S>,

    /// Used when the chosen pack holds no words yet.
    population: Arc<PopulationService<S, F>>,
}

impl<S, F> SelectionService<S, F>
where
    S: CatalogStore + 'static,
    F: GroupFetcher + ?Sized + 'static,
{
    /// Create a new selection service.
    pub fn new(store: Arc<S>, population: Arc<PopulationService<S, F>>) -> Self {
        Self { store, population }
    }

    /// Pick one word from one of `candidates`, chosen uniformly at random.
    ///
    /// Never fails: errors are logged and yield `None`, and asking again
    /// later is the retry.
    pub async fn pick_word(&self, candidates: &[PackId]) -> Option<Word> {
        let pack_id = *candidates.choose(&mut rand::thread_rng())?;

        match self.pick_from_pack(pack_id).await {
            Ok(word) => word,
            Err(e) => {
                warn!("Failed to get next word from pack {}: {}", pack_id, e);
                None
            }
        }
    }

    async fn pick_from_pack(&self, pack_id: PackId) -> Result<Option<Word>> {
        if let Some(word) = self.pick_local(pack_id).await? {
            return Ok(Some(word));
        }

        let pack = self.store.get_pack(pack_id).await?;
        let Some(source) = pack.default_source() else {
            debug!("File pack {} has no words", pack_id);
            return Ok(None);
        };

        let group = {
            let remote: Vec<u32> = source.remote_groups.iter().copied().collect();
            remote.choose(&mut rand::thread_rng()).copied()
        };
        let Some(group) = group else {
            debug!("Pack {} has no remote groups left", pack_id);
            return Ok(None);
        };

        match self.population.ensure_group_populated(&pack, group).await {
            Ok(words) => Ok(words.choose(&mut rand::thread_rng()).cloned()),
            // A concurrent request merged the same group first; its words
            // are local now.
            Err(CatalogError::GroupAlreadySaved { .. }) => self.pick_local(pack_id).await,
            Err(e) => Err(e),
        }
    }

    /// Pick uniformly among the words already stored for the pack.
    async fn pick_local(&self, pack_id: PackId) -> Result<Option<Word>> {
        let count = self.store.word_count(pack_id).await?;
        if count == 0 {
            return Ok(None);
        }

        let index = rand::thread_rng().gen_range(0..count);
        self.store.get_word(pack_id, index).await
    }
}
