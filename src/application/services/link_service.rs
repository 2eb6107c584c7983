//! Link creation, resolution, listing and deletion service.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::delete_task::DeleteTask;
use crate::domain::deletion_pipeline::DeletionPipeline;
use crate::domain::entities::{BatchItem, BatchOutcome, Link, OwnerLink, Resolution};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::url_validator::{check_url, join_short_url, validate_original_url};
use serde_json::json;

/// Outcome of [`LinkService::create_link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenOutcome {
    pub short_url: String,
    /// True when the URL was already shortened earlier.
    pub conflict: bool,
}

/// Facade over the link store and the deletion pipeline.
///
/// Composes canonical short URLs from the configured base URL and bounds
/// every backend call with a deadline.
pub struct LinkService {
    repository: Arc<dyn LinkRepository>,
    pipeline: Arc<DeletionPipeline>,
    base_url: String,
    request_timeout: Duration,
}

impl LinkService {
    /// Creates a new link service.
    pub fn new(
        repository: Arc<dyn LinkRepository>,
        pipeline: Arc<DeletionPipeline>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            pipeline,
            base_url: base_url.into(),
            request_timeout,
        }
    }

    /// Constructs the full short URL for `short_id`.
    pub fn short_url(&self, short_id: &str) -> String {
        join_short_url(&self.base_url, short_id)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| {
                tracing::warn!(operation, "Storage call timed out");
                AppError::unavailable(
                    "Storage did not respond in time",
                    json!({
                        "operation": operation,
                        "timeout_ms": self.request_timeout.as_millis() as u64,
                    }),
                )
            })?
    }

    /// Shortens `original_url` on behalf of `owner_id`.
    ///
    /// Shortening an already stored URL is not an error: the existing short
    /// URL is returned with `conflict = true`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is empty or not an absolute
    /// http(s) URL.
    /// Returns [`AppError::IdSpaceExhausted`] if no free short ID was found.
    pub async fn create_link(
        &self,
        owner_id: &str,
        original_url: &str,
    ) -> Result<ShortenOutcome, AppError> {
        let original_url = original_url.trim();
        validate_original_url(original_url)?;

        let created = self
            .bounded("create", self.repository.create(owner_id, original_url))
            .await?;

        if created.conflict {
            metrics::counter!("links_conflicts_total").increment(1);
            tracing::debug!(short_id = %created.short_id, "URL already shortened");
        } else {
            metrics::counter!("links_created_total").increment(1);
            tracing::info!(
                owner_id = %owner_id,
                short_id = %created.short_id,
                "Short link created"
            );
        }

        Ok(ShortenOutcome {
            short_url: self.short_url(&created.short_id),
            conflict: created.conflict,
        })
    }

    /// Shortens many URLs at once.
    ///
    /// Invalid items are dropped from the result. Output follows input order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `items` is empty or no item is valid.
    pub async fn create_links_batch(
        &self,
        owner_id: &str,
        items: Vec<BatchItem>,
    ) -> Result<Vec<BatchOutcome>, AppError> {
        if items.is_empty() {
            return Err(AppError::bad_request("Empty batch", json!({})));
        }

        let total = items.len();
        let valid: Vec<BatchItem> = items
            .into_iter()
            .map(|item| BatchItem {
                original_url: item.original_url.trim().to_string(),
                ..item
            })
            .filter(|item| check_url(&item.original_url).is_ok())
            .collect();

        if valid.is_empty() {
            return Err(AppError::bad_request(
                "No valid URLs in batch",
                json!({ "items": total }),
            ));
        }
        if valid.len() < total {
            tracing::debug!(
                skipped = total - valid.len(),
                "Invalid URLs skipped in batch"
            );
        }

        let mut seen = HashSet::new();
        let urls: Vec<String> = valid
            .iter()
            .filter(|item| seen.insert(item.original_url.as_str()))
            .map(|item| item.original_url.clone())
            .collect();

        let mapping = self
            .bounded("create_batch", self.repository.create_batch(owner_id, &urls))
            .await?;

        let outcomes: Vec<BatchOutcome> = valid
            .into_iter()
            .filter_map(|item| {
                mapping.get(&item.original_url).map(|short_id| BatchOutcome {
                    correlation_id: item.correlation_id,
                    short_url: self.short_url(short_id),
                })
            })
            .collect();

        metrics::counter!("links_batch_items_total").increment(outcomes.len() as u64);
        tracing::info!(owner_id = %owner_id, count = outcomes.len(), "Batch shortened");

        Ok(outcomes)
    }

    /// Looks up the original URL behind `short_id`.
    pub async fn resolve(&self, short_id: &str) -> Result<Resolution, AppError> {
        self.bounded("resolve", self.repository.resolve(short_id))
            .await
    }

    /// Lists live links of `owner_id`, most recent first.
    pub async fn list_owner_links(&self, owner_id: &str) -> Result<Vec<OwnerLink>, AppError> {
        let links = self
            .bounded("list", self.repository.list_by_owner(owner_id))
            .await?;

        Ok(links
            .into_iter()
            .map(|link| OwnerLink {
                short_url: self.short_url(&link.short_id),
                original_url: link.original_url,
            })
            .collect())
    }

    /// Queues a soft delete of `short_ids` owned by `owner_id`.
    ///
    /// Returns once the request is accepted; the links disappear shortly
    /// after. An empty list is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Busy`] when the queue stays full past its timeout.
    /// Returns [`AppError::Unavailable`] during shutdown.
    pub async fn enqueue_delete(
        &self,
        owner_id: &str,
        short_ids: Vec<String>,
    ) -> Result<(), AppError> {
        let task = DeleteTask::new(owner_id, short_ids);
        if task.is_empty() {
            return Ok(());
        }

        self.pipeline.enqueue(task).await
    }

    /// Returns stored links for `short_ids`, live and deleted.
    pub async fn lookup(&self, short_ids: &[String]) -> Result<Vec<Link>, AppError> {
        self.bounded("lookup", self.repository.find_by_short_ids(short_ids))
            .await
    }

    /// Checks the storage backend and the deletion pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unavailable`] if either is down.
    pub async fn health(&self) -> Result<(), AppError> {
        if self.pipeline.is_closed() {
            return Err(AppError::unavailable(
                "Delete pipeline is closed",
                json!({}),
            ));
        }

        self.ping_storage().await
    }

    /// Checks the storage backend alone.
    pub async fn ping_storage(&self) -> Result<(), AppError> {
        self.bounded("ping", self.repository.ping()).await
    }

    /// Free slots of the delete queue, `None` once it is closed.
    pub fn delete_queue_slots(&self) -> Option<usize> {
        (!self.pipeline.is_closed()).then(|| self.pipeline.available_capacity())
    }

    /// Drains the deletion pipeline, then releases the storage backend.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
        self.repository.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deletion_pipeline::PipelineSettings;
    use crate::domain::entities::CreatedLink;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::persistence::MemoryLinkRepository;
    use std::collections::HashMap;

    const BASE_URL: &str = "http://localhost:8080";

    fn fast_settings() -> PipelineSettings {
        PipelineSettings {
            flush_interval: Duration::from_millis(10),
            ..PipelineSettings::default()
        }
    }

    fn service_with(repository: Arc<dyn LinkRepository>) -> LinkService {
        let pipeline = Arc::new(DeletionPipeline::spawn(repository.clone(), fast_settings()));
        LinkService::new(repository, pipeline, BASE_URL, Duration::from_secs(5))
    }

    fn memory_service() -> LinkService {
        service_with(Arc::new(MemoryLinkRepository::in_memory()))
    }

    fn item(correlation_id: &str, url: &str) -> BatchItem {
        BatchItem {
            correlation_id: correlation_id.to_string(),
            original_url: url.to_string(),
        }
    }

    async fn wait_for_deleted(service: &LinkService, short_id: &str) -> bool {
        for _ in 0..100 {
            if service.resolve(short_id).await.unwrap().is_deleted() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn short_id_of(short_url: &str) -> &str {
        short_url.rsplit('/').next().unwrap()
    }

    #[tokio::test]
    async fn test_create_link_composes_short_url() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_create()
            .withf(|owner, url| owner == "u1" && url == "https://example.com")
            .times(1)
            .returning(|_, _| Ok(CreatedLink::created("abcd1234".to_string())));

        let service = service_with(Arc::new(mock_repo));
        let outcome = service
            .create_link("u1", "https://example.com")
            .await
            .unwrap();

        assert_eq!(outcome.short_url, "http://localhost:8080/abcd1234");
        assert!(!outcome.conflict);
    }

    #[tokio::test]
    async fn test_create_link_invalid_url_skips_store() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_create().times(0);

        let service = service_with(Arc::new(mock_repo));
        let result = service.create_link("u1", "   ").await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_link_twice_is_idempotent() {
        let service = memory_service();

        let first = service
            .create_link("u1", "https://example.com")
            .await
            .unwrap();
        let second = service
            .create_link("u1", "https://example.com")
            .await
            .unwrap();

        assert!(!first.conflict);
        assert!(second.conflict);
        assert_eq!(first.short_url, second.short_url);
    }

    #[tokio::test]
    async fn test_storage_timeout_is_unavailable() {
        struct SlowRepository;

        #[async_trait::async_trait]
        impl LinkRepository for SlowRepository {
            async fn create(&self, _: &str, _: &str) -> Result<CreatedLink, AppError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(CreatedLink::created("never123".to_string()))
            }
            async fn create_batch(
                &self,
                _: &str,
                _: &[String],
            ) -> Result<HashMap<String, String>, AppError> {
                Ok(HashMap::new())
            }
            async fn resolve(&self, _: &str) -> Result<Resolution, AppError> {
                Ok(Resolution::NotFound)
            }
            async fn list_by_owner(&self, _: &str) -> Result<Vec<Link>, AppError> {
                Ok(Vec::new())
            }
            async fn mark_deleted(&self, _: &str, _: &[String]) -> Result<u64, AppError> {
                Ok(0)
            }
            async fn find_by_short_ids(&self, _: &[String]) -> Result<Vec<Link>, AppError> {
                Ok(Vec::new())
            }
            async fn ping(&self) -> Result<(), AppError> {
                Ok(())
            }
            async fn shutdown(&self) {}
        }

        let repository: Arc<dyn LinkRepository> = Arc::new(SlowRepository);
        let pipeline = Arc::new(DeletionPipeline::spawn(repository.clone(), fast_settings()));
        let service = LinkService::new(repository, pipeline, BASE_URL, Duration::from_millis(20));

        let result = service.create_link("u1", "https://example.com").await;

        assert!(matches!(result, Err(AppError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_batch_keeps_existing_short_url() {
        let service = memory_service();
        let existing = service
            .create_link("u1", "https://a.example")
            .await
            .unwrap();

        let outcomes = service
            .create_links_batch(
                "u1",
                vec![
                    item("1", "https://a.example"),
                    item("2", "https://b.example"),
                    item("3", "https://c.example"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].correlation_id, "1");
        assert_eq!(outcomes[0].short_url, existing.short_url);
        assert_ne!(outcomes[1].short_url, outcomes[2].short_url);
    }

    #[tokio::test]
    async fn test_batch_skips_invalid_items() {
        let service = memory_service();

        let outcomes = service
            .create_links_batch(
                "u1",
                vec![item("1", "not a url"), item("2", "https://b.example")],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].correlation_id, "2");
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_or_all_invalid() {
        let service = memory_service();

        let empty = service.create_links_batch("u1", Vec::new()).await;
        assert!(matches!(empty, Err(AppError::Validation { .. })));

        let invalid = service
            .create_links_batch("u1", vec![item("1", ""), item("2", "ftp://x")])
            .await;
        assert!(matches!(invalid, Err(AppError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_batch_duplicate_urls_share_short_url() {
        let service = memory_service();

        let outcomes = service
            .create_links_batch(
                "u1",
                vec![item("1", "https://a.example"), item("2", "https://a.example")],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].short_url, outcomes[1].short_url);
    }

    #[tokio::test]
    async fn test_list_owner_links() {
        let service = memory_service();
        let a = service.create_link("u1", "https://a.example").await.unwrap();
        let b = service.create_link("u1", "https://b.example").await.unwrap();
        service.create_link("u2", "https://c.example").await.unwrap();

        let links = service.list_owner_links("u1").await.unwrap();

        assert_eq!(
            links,
            vec![
                OwnerLink {
                    short_url: b.short_url,
                    original_url: "https://b.example".to_string(),
                },
                OwnerLink {
                    short_url: a.short_url,
                    original_url: "https://a.example".to_string(),
                },
            ]
        );
        assert!(service.list_owner_links("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_delete_flips_links_eventually() {
        let service = memory_service();
        let a = service.create_link("u1", "https://a.example").await.unwrap();
        let b = service.create_link("u2", "https://b.example").await.unwrap();
        let a_id = short_id_of(&a.short_url).to_string();
        let b_id = short_id_of(&b.short_url).to_string();

        service
            .enqueue_delete("u1", vec![a_id.clone(), b_id.clone()])
            .await
            .unwrap();

        assert!(wait_for_deleted(&service, &a_id).await);
        assert_eq!(
            service.resolve(&b_id).await.unwrap(),
            Resolution::Live("https://b.example".to_string())
        );
        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_empty_delete_is_noop() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_mark_deleted().times(0);

        let service = service_with(Arc::new(mock_repo));

        assert!(service.enqueue_delete("u1", Vec::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_health_reports_pipeline_shutdown() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo.expect_ping().returning(|| Ok(()));
        mock_repo.expect_shutdown().returning(|| ());

        let service = service_with(Arc::new(mock_repo));
        assert!(service.health().await.is_ok());

        service.shutdown().await;
        assert!(matches!(
            service.health().await,
            Err(AppError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_reports_backend_failure() {
        let mut mock_repo = MockLinkRepository::new();
        mock_repo
            .expect_ping()
            .returning(|| Err(AppError::unavailable("Database unavailable", json!({}))));

        let service = service_with(Arc::new(mock_repo));

        assert!(matches!(
            service.health().await,
            Err(AppError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_returns_owners() {
        let service = memory_service();
        let a = service.create_link("u1", "https://a.example").await.unwrap();
        let a_id = short_id_of(&a.short_url).to_string();

        let links = service.lookup(&[a_id]).await.unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].owner_id, "u1");
    }
}
