//! Lazy population of default word packs from remote groups.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use wordpack_core::{
    CatalogError, CatalogStore, GroupFetcher, Language, NewWord, Result, Word, WordPack,
};

use crate::text::split_group_text;

/// Outcome of one prefetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Groups merged by this run, ascending.
    pub merged: Vec<u32>,

    /// Groups that failed, with the reason, ascending by group.
    pub failed: Vec<(u32, String)>,
}

impl PrefetchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Decides which remote group to fetch and merges each group exactly once.
pub struct PopulationService<S, F: ?Sized> {
    /// Catalog store.
    store: Arc<S>,

    /// Remote group source.
    fetcher: Arc<F>,
}

impl<S, F> PopulationService<S, F>
where
    S: CatalogStore + 'static,
    F: GroupFetcher + ?Sized + 'static,
{
    /// Create a new population service.
    pub fn new(store: Arc<S>, fetcher: Arc<F>) -> Self {
        Self { store, fetcher }
    }

    /// Fetch `group` for a default pack and merge it.
    ///
    /// A fetch failure writes nothing, so the group stays remote and can be
    /// retried. Merging a group that is already local fails with
    /// `GroupAlreadySaved`, which is not retryable.
    pub async fn ensure_group_populated(&self, pack: &WordPack, group: u32) -> Result<Vec<Word>> {
        populate(self.store.as_ref(), self.fetcher.as_ref(), pack, group).await
    }

    /// Top up `pack` toward `max_local_groups` local groups.
    ///
    /// Missing groups are sampled from the remote set without replacement
    /// and merged by independent tasks; one failure never stops the others.
    pub async fn prefetch_groups(
        &self,
        pack: &WordPack,
        max_local_groups: usize,
    ) -> Result<PrefetchReport> {
        let pack = self.store.get_pack(pack.id).await?;
        let source = pack.default_source().ok_or_else(|| {
            CatalogError::invalid_argument(format!("pack {} has no remote groups", pack.id))
        })?;

        let missing = max_local_groups.saturating_sub(source.local_groups.len());
        let groups: Vec<u32> = {
            let remote: Vec<u32> = source.remote_groups.iter().copied().collect();
            remote
                .choose_multiple(&mut rand::thread_rng(), missing)
                .copied()
                .collect()
        };

        if groups.is_empty() {
            debug!(
                "Pack {} already has {} local groups",
                pack.id,
                source.local_groups.len()
            );
            return Ok(PrefetchReport::default());
        }

        debug!("Prefetching groups {:?} for pack {}", groups, pack.id);

        let pack = Arc::new(pack);
        let mut tasks = JoinSet::new();
        for group in groups {
            let store = self.store.clone();
            let fetcher = self.fetcher.clone();
            let pack = pack.clone();
            tasks.spawn(async move {
                let outcome = populate(store.as_ref(), fetcher.as_ref(), &pack, group).await;
                (group, outcome)
            });
        }

        let mut report = PrefetchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((group, Ok(_))) => report.merged.push(group),
                Ok((group, Err(e))) => {
                    warn!("Failed to pre-fetch group {} for pack {}: {}", group, pack.id, e);
                    report.failed.push((group, e.to_string()));
                }
                Err(e) => warn!("Prefetch task for pack {} aborted: {}", pack.id, e),
            }
        }

        report.merged.sort_unstable();
        report.failed.sort_by_key(|(group, _)| *group);

        info!(
            "Prefetch for pack {}: {} merged, {} failed",
            pack.id,
            report.merged.len(),
            report.failed.len()
        );

        Ok(report)
    }

    /// Prefetch every default pack.
    pub async fn prefetch_all(
        &self,
        max_local_groups: usize,
    ) -> Result<Vec<(Language, PrefetchReport)>> {
        let mut reports = Vec::new();
        for pack in self.store.list_packs().await? {
            let Some(language) = pack.language() else {
                continue;
            };
            let report = self.prefetch_groups(&pack, max_local_groups).await?;
            reports.push((language, report));
        }
        Ok(reports)
    }
}

async fn populate<S, F>(store: &S, fetcher: &F, pack: &WordPack, group: u32) -> Result<Vec<Word>>
where
    S: CatalogStore + ?Sized,
    F: GroupFetcher + ?Sized,
{
    let source = pack.default_source().ok_or_else(|| {
        CatalogError::invalid_argument(format!("pack {} has no remote groups", pack.id))
    })?;
    let language = source.language;

    // Local groups never return to remote, so this check can't be stale.
    if source.local_groups.contains(&group) {
        return Err(CatalogError::GroupAlreadySaved {
            pack_id: pack.id,
            group,
        });
    }

    let text = fetcher.fetch_group(language, group).await?;
    let words = split_group_text(&text);
    if words.is_empty() {
        return Err(CatalogError::fetch(language, group, "group contains no words"));
    }

    let stored = store
        .append_words(&NewWord::batch(pack.id, words), Some(group))
        .await?;

    info!(
        "{}: downloaded group {} ({} words) into pack {}",
        language,
        group,
        stored.len(),
        pack.id
    );

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordpack_fetch::StaticGroupFetcher;
    use wordpack_store::SqliteStore;

    async fn setup(fetcher: StaticGroupFetcher) -> (Arc<SqliteStore>, Arc<StaticGroupFetcher>) {
        let store = SqliteStore::open_memory().unwrap();
        store.initialize().await.unwrap();
        (Arc::new(store), Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_ensure_group_populated() {
        let (store, fetcher) =
            setup(StaticGroupFetcher::new().with_group(Language::En, 4, "apple\nbanana\n")).await;
        let service = PopulationService::new(store.clone(), fetcher.clone());
        let pack = store.get_default_pack(Language::En).await.unwrap();

        let words = service.ensure_group_populated(&pack, 4).await.unwrap();
        assert_eq!(words.len(), 2);
        assert!(words.iter().all(|w| w.group_index == Some(4)));

        let stored = store.list_words(pack.id).await.unwrap();
        assert_eq!(stored[0].word, "apple");
        assert_eq!(stored[1].index, 1);

        let pack = store.get_pack(pack.id).await.unwrap();
        let source = pack.default_source().unwrap();
        assert!(source.local_groups.contains(&4));
        assert!(!source.remote_groups.contains(&4));
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let fetcher = StaticGroupFetcher::new().with_group(Language::En, 1, "one\n");
        fetcher.fail_group(Language::En, 1);
        let (store, fetcher) = setup(fetcher).await;
        let service = PopulationService::new(store.clone(), fetcher.clone());
        let pack = store.get_default_pack(Language::En).await.unwrap();

        let err = service.ensure_group_populated(&pack, 1).await.unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(store.word_count(pack.id).await.unwrap(), 0);
        let pack = store.get_pack(pack.id).await.unwrap();
        assert!(pack.default_source().unwrap().remote_groups.contains(&1));
    }

    #[tokio::test]
    async fn test_empty_group_is_fetch_error() {
        let (store, fetcher) =
            setup(StaticGroupFetcher::new().with_group(Language::De, 0, "\n\n")).await;
        let service = PopulationService::new(store.clone(), fetcher);
        let pack = store.get_default_pack(Language::De).await.unwrap();

        let err = service.ensure_group_populated(&pack, 0).await.unwrap_err();
        assert!(matches!(err, CatalogError::Fetch { group: 0, .. }));
        assert_eq!(store.word_count(pack.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_merge_is_conflict() {
        let (store, fetcher) =
            setup(StaticGroupFetcher::new().with_generated_language(Language::En, 3)).await;
        let service = PopulationService::new(store.clone(), fetcher.clone());
        let stale = store.get_default_pack(Language::En).await.unwrap();

        service.ensure_group_populated(&stale, 2).await.unwrap();

        // Stale snapshot: the store detects the duplicate after fetching.
        let err = service.ensure_group_populated(&stale, 2).await.unwrap_err();
        assert!(matches!(err, CatalogError::GroupAlreadySaved { group: 2, .. }));
        assert!(!err.is_retryable());
        assert_eq!(fetcher.calls(), 2);

        // Fresh snapshot: rejected before contacting the fetcher.
        let fresh = store.get_pack(stale.id).await.unwrap();
        let err = service.ensure_group_populated(&fresh, 2).await.unwrap_err();
        assert!(matches!(err, CatalogError::GroupAlreadySaved { group: 2, .. }));
        assert_eq!(fetcher.calls(), 2);

        assert_eq!(store.word_count(stale.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_file_pack_is_rejected() {
        let (store, fetcher) = setup(StaticGroupFetcher::new()).await;
        let service = PopulationService::new(store.clone(), fetcher.clone());
        let id = store
            .add_file_word_pack("list", &["word".to_string()])
            .await
            .unwrap();
        let pack = store.get_pack(id).await.unwrap();

        let err = service.ensure_group_populated(&pack, 0).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument { .. }));
        assert_eq!(fetcher.calls(), 0);

        let err = service.prefetch_groups(&pack, 3).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prefetch_tops_up_to_target() {
        let (store, fetcher) =
            setup(StaticGroupFetcher::new().with_generated_language(Language::De, 4)).await;
        let service = PopulationService::new(store.clone(), fetcher.clone());
        let pack = store.get_default_pack(Language::De).await.unwrap();

        let report = service.prefetch_groups(&pack, 5).await.unwrap();
        assert_eq!(report.merged.len(), 5);
        assert!(report.is_complete());

        let pack = store.get_pack(pack.id).await.unwrap();
        let source = pack.default_source().unwrap();
        assert_eq!(source.local_groups.len(), 5);
        assert_eq!(source.remote_groups.len(), 51);
        assert_eq!(
            source.local_groups.iter().copied().collect::<Vec<_>>(),
            report.merged
        );

        let words = store.list_words(pack.id).await.unwrap();
        let indices: Vec<u64> = words.iter().map(|w| w.index).collect();
        assert_eq!(indices, (0..20).collect::<Vec<u64>>());

        // Already at target: nothing to do.
        let report = service.prefetch_groups(&pack, 5).await.unwrap();
        assert_eq!(report, PrefetchReport::default());
        assert_eq!(fetcher.calls(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_prefetch_failures_are_isolated() {
        let fetcher = StaticGroupFetcher::new().with_generated_language(Language::En, 2);
        for group in [3, 7, 11] {
            fetcher.fail_group(Language::En, group);
        }
        let (store, fetcher) = setup(fetcher).await;
        let service = PopulationService::new(store.clone(), fetcher);
        let pack = store.get_default_pack(Language::En).await.unwrap();

        let report = service.prefetch_groups(&pack, 20).await.unwrap();
        assert_eq!(report.merged.len(), 17);
        assert_eq!(
            report.failed.iter().map(|(g, _)| *g).collect::<Vec<_>>(),
            vec![3, 7, 11]
        );

        let pack = store.get_pack(pack.id).await.unwrap();
        let source = pack.default_source().unwrap();
        assert_eq!(
            source.remote_groups.iter().copied().collect::<Vec<_>>(),
            vec![3, 7, 11]
        );
        assert!(source.is_consistent());
        assert_eq!(store.word_count(pack.id).await.unwrap(), 34);
    }

    #[tokio::test]
    async fn test_prefetch_all() {
        let fetcher = StaticGroupFetcher::new()
            .with_generated_language(Language::En, 1)
            .with_generated_language(Language::De, 1);
        let (store, fetcher) = setup(fetcher).await;
        store
            .add_file_word_pack("mine", &["x".to_string()])
            .await
            .unwrap();
        let service = PopulationService::new(store.clone(), fetcher);

        let reports = service.prefetch_all(2).await.unwrap();
        assert_eq!(reports.len(), 2);
        for (language, report) in &reports {
            assert_eq!(report.merged.len(), 2, "{}", language);
        }
        for language in Language::ALL {
            let pack = store.get_default_pack(language).await.unwrap();
            assert_eq!(store.word_count(pack.id).await.unwrap(), 2);
        }
    }
}
