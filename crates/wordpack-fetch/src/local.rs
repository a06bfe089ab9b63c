//! Local group fetchers: directory-backed and in-memory.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use wordpack_core::{CatalogError, GroupFetcher, Language, Result};

/// Reads groups from `<root>/<lang>/<group>`, the same layout the remote
/// server exposes under `/languages`.
pub struct DirGroupFetcher {
    root: PathBuf,
}

impl DirGroupFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn group_path(&self, language: Language, group: u32) -> PathBuf {
        self.root
            .join(language.path_segment())
            .join(group.to_string())
    }
}

#[async_trait]
impl GroupFetcher for DirGroupFetcher {
    async fn fetch_group(&self, language: Language, group: u32) -> Result<String> {
        let path = self.group_path(language, group);
        debug!("Reading group file {:?}", path);

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CatalogError::fetch(language, group, format!("{}: {}", path.display(), e)))
    }
}

/// In-memory fetcher for tests and demos.
///
/// Counts calls, and fails any group that has no text or was marked
/// with [`StaticGroupFetcher::fail_group`].
#[derive(Default)]
pub struct StaticGroupFetcher {
    groups: Mutex<HashMap<(Language, u32), String>>,
    failing: Mutex<HashSet<(Language, u32)>>,
    calls: AtomicUsize,
}

impl StaticGroupFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the text served for a group.
    pub fn with_group(self, language: Language, group: u32, text: impl Into<String>) -> Self {
        self.insert_group(language, group, text);
        self
    }

    /// Serve `words_per_group` generated words for every group of `language`.
    pub fn with_generated_language(self, language: Language, words_per_group: usize) -> Self {
        for group in 0..language.group_count() {
            let text = (0..words_per_group)
                .map(|i| format!("{}-{}-{}", language.path_segment(), group, i))
                .collect::<Vec<_>>()
                .join("\n");
            self.insert_group(language, group, text);
        }
        self
    }

    pub fn insert_group(&self, language: Language, group: u32, text: impl Into<String>) {
        if let Ok(mut groups) = self.groups.lock() {
            groups.insert((language, group), text.into());
        }
    }

    /// Make every fetch of this group fail.
    pub fn fail_group(&self, language: Language, group: u32) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert((language, group));
        }
    }

    /// Number of `fetch_group` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GroupFetcher for StaticGroupFetcher {
    async fn fetch_group(&self, language: Language, group: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failing
            .lock()
            .map_err(|e| CatalogError::internal(e.to_string()))?
            .contains(&(language, group));
        if failing {
            return Err(CatalogError::fetch(language, group, "Bad response code! (503)"));
        }

        self.groups
            .lock()
            .map_err(|e| CatalogError::internal(e.to_string()))?
            .get(&(language, group))
            .cloned()
            .ok_or_else(|| CatalogError::fetch(language, group, "Bad response code! (404)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticGroupFetcher::new().with_group(Language::En, 2, "apple\nbanana\n");

        let text = fetcher.fetch_group(Language::En, 2).await.unwrap();
        assert_eq!(text, "apple\nbanana\n");

        let err = fetcher.fetch_group(Language::En, 3).await.unwrap_err();
        assert!(err.is_retryable());

        fetcher.fail_group(Language::En, 2);
        assert!(fetcher.fetch_group(Language::En, 2).await.is_err());
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_generated_language() {
        let fetcher = StaticGroupFetcher::new().with_generated_language(Language::En, 3);
        let text = fetcher.fetch_group(Language::En, 19).await.unwrap();
        assert_eq!(text, "en-19-0\nen-19-1\nen-19-2");
        assert!(fetcher.fetch_group(Language::De, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_dir_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("de")).unwrap();
        std::fs::write(dir.path().join("de").join("4"), "Apfel\nBirne\n").unwrap();

        let fetcher = DirGroupFetcher::new(dir.path());
        assert_eq!(
            fetcher.fetch_group(Language::De, 4).await.unwrap(),
            "Apfel\nBirne\n"
        );

        let err = fetcher.fetch_group(Language::De, 5).await.unwrap_err();
        assert!(matches!(err, CatalogError::Fetch { group: 5, .. }));
    }
}
