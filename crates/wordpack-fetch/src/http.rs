//! HTTP group fetcher.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use wordpack_core::{CatalogError, GroupFetcher, Language, RemoteConfig, Result};

/// Fetches groups from `<base_url>/languages/<lang>/<group>`.
///
/// `ureq` is blocking, so each request runs on the tokio blocking pool.
pub struct HttpGroupFetcher {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpGroupFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// URL of one group.
    pub fn group_url(&self, language: Language, group: u32) -> String {
        format!(
            "{}/languages/{}/{}",
            self.base_url.trim_end_matches('/'),
            language.path_segment(),
            group
        )
    }
}

#[async_trait]
impl GroupFetcher for HttpGroupFetcher {
    async fn fetch_group(&self, language: Language, group: u32) -> Result<String> {
        let url = self.group_url(language, group);
        let agent = self.agent.clone();

        debug!("Fetching {}", url);

        tokio::task::spawn_blocking(move || {
            let response = match agent.get(&url).call() {
                Ok(response) => response,
                Err(ureq::Error::Status(code, _)) => {
                    return Err(CatalogError::fetch(
                        language,
                        group,
                        format!("Bad response code! ({})", code),
                    ));
                }
                Err(err) => return Err(CatalogError::fetch(language, group, err.to_string())),
            };

            response
                .into_string()
                .map_err(|e| CatalogError::fetch(language, group, format!("read body: {}", e)))
        })
        .await
        .map_err(|e| CatalogError::internal(format!("fetch task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_url() {
        let fetcher = HttpGroupFetcher::new("https://words.example/", Duration::from_secs(1));
        assert_eq!(
            fetcher.group_url(Language::En, 7),
            "https://words.example/languages/en/7"
        );
        assert_eq!(
            fetcher.group_url(Language::De, 55),
            "https://words.example/languages/de/55"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let fetcher = HttpGroupFetcher::new("http://127.0.0.1:9", Duration::from_millis(500));
        let err = fetcher.fetch_group(Language::En, 0).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            CatalogError::Fetch {
                language: Language::En,
                group: 0,
                ..
            }
        ));
    }
}
