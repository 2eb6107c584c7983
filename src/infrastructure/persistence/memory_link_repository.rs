//! In-process link store with optional JSON snapshots.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::entities::{CreatedLink, Link, Resolution};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::persistence::snapshot::{
    SnapshotRecord, SnapshotSource, SnapshotWriter, load_snapshot,
};
use crate::utils::code_generator::allocate_short_id;
use crate::utils::url_validator::validate_original_url;

/// All indices of the memory store, guarded by one lock.
#[derive(Debug, Default)]
pub struct LinkIndex {
    links: HashMap<String, Link>,
    by_url: HashMap<String, String>,
    /// Short IDs per owner in creation order.
    by_owner: HashMap<String, Vec<String>>,
    next_id: i64,
}

impl LinkIndex {
    fn from_records(mut records: Vec<SnapshotRecord>) -> Self {
        records.sort_by_key(|r| r.created_at);

        let mut index = Self::default();
        for record in records {
            if record.short_id.is_empty()
                || index.links.contains_key(&record.short_id)
                || index.by_url.contains_key(&record.original_url)
            {
                continue;
            }

            let id = if record.id > 0 {
                record.id
            } else {
                index.next_id + 1
            };
            index.next_id = index.next_id.max(id);

            index.insert(Link::new(
                id,
                record.short_id,
                record.original_url,
                record.user_id,
                record.is_deleted,
                record.created_at.unwrap_or_else(Utc::now),
            ));
        }
        index
    }

    fn insert(&mut self, link: Link) {
        self.by_url
            .insert(link.original_url.clone(), link.short_id.clone());
        if !link.owner_id.is_empty() {
            self.by_owner
                .entry(link.owner_id.clone())
                .or_default()
                .push(link.short_id.clone());
        }
        self.links.insert(link.short_id.clone(), link);
    }

    fn new_link(&mut self, short_id: String, owner_id: &str, original_url: &str) -> Link {
        self.next_id += 1;
        Link::new(
            self.next_id,
            short_id,
            original_url.to_string(),
            owner_id.to_string(),
            false,
            Utc::now(),
        )
    }

    fn is_taken(&self, short_id: &str) -> bool {
        self.links.contains_key(short_id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl SnapshotSource for RwLock<LinkIndex> {
    fn snapshot(&self) -> Vec<SnapshotRecord> {
        let index = self.read();
        let mut records: Vec<SnapshotRecord> =
            index.links.values().map(SnapshotRecord::from).collect();
        records.sort_by_key(|r| r.id);
        records
    }
}

/// Memory-backed [`LinkRepository`].
///
/// Critical sections are synchronous, so a cancelled request never leaves
/// the indices half-updated.
pub struct MemoryLinkRepository {
    index: Arc<RwLock<LinkIndex>>,
    snapshots: Option<SnapshotWriter>,
}

impl MemoryLinkRepository {
    /// Opens the store, loading `path` if given and persisting to it afterwards.
    pub async fn open(path: Option<PathBuf>, debounce: Duration) -> Self {
        let Some(path) = path else {
            return Self::in_memory();
        };

        let index = Arc::new(RwLock::new(LinkIndex::from_records(
            load_snapshot(&path).await,
        )));
        info!(
            path = %path.display(),
            links = index.read().len(),
            "Memory store opened"
        );

        let snapshots = SnapshotWriter::spawn(path, index.clone(), debounce);

        Self {
            index,
            snapshots: Some(snapshots),
        }
    }

    /// Creates a store that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            index: Arc::new(RwLock::new(LinkIndex::default())),
            snapshots: None,
        }
    }

    fn request_snapshot(&self) {
        if let Some(snapshots) = &self.snapshots {
            snapshots.request();
        }
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, owner_id: &str, original_url: &str) -> Result<CreatedLink, AppError> {
        validate_original_url(original_url)?;

        let created = {
            let mut index = self.index.write();

            if let Some(existing) = index.by_url.get(original_url) {
                return Ok(CreatedLink::existing(existing.clone()));
            }

            let short_id = allocate_short_id(|candidate| index.is_taken(candidate))?;
            let link = index.new_link(short_id.clone(), owner_id, original_url);
            index.insert(link);
            CreatedLink::created(short_id)
        };

        self.request_snapshot();
        Ok(created)
    }

    async fn create_batch(
        &self,
        owner_id: &str,
        original_urls: &[String],
    ) -> Result<HashMap<String, String>, AppError> {
        for url in original_urls {
            validate_original_url(url)?;
        }

        let mut result = HashMap::with_capacity(original_urls.len());
        let mut inserted = 0usize;
        {
            let mut index = self.index.write();

            // Allocate every ID before touching the indices so a failure
            // leaves the store unchanged.
            let mut chosen: HashSet<String> = HashSet::new();
            let mut pending: Vec<(String, String)> = Vec::new();
            for url in original_urls {
                if result.contains_key(url) {
                    continue;
                }
                if let Some(existing) = index.by_url.get(url) {
                    result.insert(url.clone(), existing.clone());
                    continue;
                }

                let short_id = allocate_short_id(|candidate| {
                    index.is_taken(candidate) || chosen.contains(candidate)
                })?;
                chosen.insert(short_id.clone());
                result.insert(url.clone(), short_id.clone());
                pending.push((url.clone(), short_id));
            }

            for (url, short_id) in pending {
                let link = index.new_link(short_id, owner_id, &url);
                index.insert(link);
                inserted += 1;
            }
        }

        if inserted > 0 {
            self.request_snapshot();
        }
        debug!(owner_id = %owner_id, inserted, total = result.len(), "Batch stored");
        Ok(result)
    }

    async fn resolve(&self, short_id: &str) -> Result<Resolution, AppError> {
        let index = self.index.read();
        Ok(match index.links.get(short_id) {
            None => Resolution::NotFound,
            Some(link) if link.is_deleted => Resolution::Deleted,
            Some(link) => Resolution::Live(link.original_url.clone()),
        })
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Link>, AppError> {
        let index = self.index.read();
        let Some(short_ids) = index.by_owner.get(owner_id) else {
            return Ok(Vec::new());
        };

        Ok(short_ids
            .iter()
            .rev()
            .filter_map(|short_id| index.links.get(short_id))
            .filter(|link| !link.is_deleted)
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, owner_id: &str, short_ids: &[String]) -> Result<u64, AppError> {
        if owner_id.is_empty() {
            return Ok(0);
        }

        let mut changed = 0u64;
        {
            let mut index = self.index.write();
            for short_id in short_ids {
                if let Some(link) = index.links.get_mut(short_id)
                    && link.is_owned_by(owner_id)
                    && !link.is_deleted
                {
                    link.is_deleted = true;
                    changed += 1;
                }
            }
        }

        if changed > 0 {
            self.request_snapshot();
        }
        Ok(changed)
    }

    async fn find_by_short_ids(&self, short_ids: &[String]) -> Result<Vec<Link>, AppError> {
        let index = self.index.read();
        Ok(short_ids
            .iter()
            .filter_map(|short_id| index.links.get(short_id))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn shutdown(&self) {
        if let Some(snapshots) = &self.snapshots {
            snapshots.shutdown().await;
            info!(path = %snapshots.path().display(), "Memory store flushed");
        }
    }
}
