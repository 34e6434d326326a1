//! Lightbox Remote - The contract for a remote image store.
//!
//! Provides the RemoteSource trait the gallery treats as its
//! highest-priority tier, a NullRemote for profiles running without one,
//! and a MockRemoteSource for testing timeout and failure handling.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use lightbox_core::{ImageId, ImageRecord, LightboxError, Pagination, Result};

/// Query parameters for a remote page fetch. Filtering beyond search and
/// sorting are applied locally after the merge, so they are not part of
/// the remote contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteQuery {
    /// 1-indexed page.
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
}

impl RemoteQuery {
    pub fn page(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            search: None,
        }
    }
}

/// One page of remote records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePage {
    pub records: Vec<ImageRecord>,
    pub pagination: Pagination,
}

impl RemotePage {
    pub fn empty(query: &RemoteQuery) -> Self {
        Self {
            records: Vec::new(),
            pagination: Pagination::new(query.page, query.limit, 0),
        }
    }
}

/// A remote store holding the authoritative copies of records.
///
/// Callers treat every method as best-effort: a slow or failing remote
/// degrades the gallery to its local tiers instead of failing the read.
/// Implementations must not block; the caller applies its own timeout.
pub trait RemoteSource: Send + Sync {
    /// Fetches one page of records.
    fn fetch_page(
        &self,
        query: &RemoteQuery,
    ) -> impl std::future::Future<Output = Result<RemotePage>> + Send;

    /// Deletes one record. `Ok(false)` when the remote never had it.
    fn delete(
        &self,
        id: &ImageId,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Deletes a batch, returning the ids the remote actually removed.
    fn delete_many(
        &self,
        ids: &[ImageId],
    ) -> impl std::future::Future<Output = Result<Vec<ImageId>>> + Send;

    /// Sets the favorite flag. `Ok(false)` when the remote never had it.
    fn set_favorite(
        &self,
        id: &ImageId,
        favorite: bool,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Sets the flag on a batch, returning the ids the remote actually
    /// updated.
    fn set_favorite_many(
        &self,
        ids: &[ImageId],
        favorite: bool,
    ) -> impl std::future::Future<Output = Result<Vec<ImageId>>> + Send;
}

/// Remote stand-in for profiles running without one. Every read is empty
/// and every write reports the id as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRemote;

impl RemoteSource for NullRemote {
    async fn fetch_page(&self, query: &RemoteQuery) -> Result<RemotePage> {
        Ok(RemotePage::empty(query))
    }

    async fn delete(&self, _id: &ImageId) -> Result<bool> {
        Ok(false)
    }

    async fn delete_many(&self, _ids: &[ImageId]) -> Result<Vec<ImageId>> {
        Ok(Vec::new())
    }

    async fn set_favorite(&self, _id: &ImageId, _favorite: bool) -> Result<bool> {
        Ok(false)
    }

    async fn set_favorite_many(&self, _ids: &[ImageId], _favorite: bool) -> Result<Vec<ImageId>> {
        Ok(Vec::new())
    }
}

/// Mock remote for testing.
///
/// Serves a configurable record set, optionally failing every call or
/// delaying long enough to trip the caller's timeout.
#[derive(Debug)]
pub struct MockRemoteSource {
    records: Mutex<Vec<ImageRecord>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MockRemoteSource {
    /// An empty, healthy remote.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            failure: None,
            delay: None,
        }
    }

    /// A healthy remote holding `records`, newest creation first.
    pub fn with_records(records: Vec<ImageRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::new()
        }
    }

    /// A remote that fails every call with the given message.
    pub fn with_failure(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// A remote that stalls for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// A stalling remote that still holds records.
    pub fn with_records_delayed(records: Vec<ImageRecord>, delay: Duration) -> Self {
        Self {
            records: Mutex::new(records),
            delay: Some(delay),
            ..Self::new()
        }
    }

    async fn gate(&self) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(LightboxError::RemoteUnavailable(message.clone()));
        }
        Ok(())
    }

    fn records(&self) -> Vec<ImageRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for MockRemoteSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSource for MockRemoteSource {
    async fn fetch_page(&self, query: &RemoteQuery) -> Result<RemotePage> {
        self.gate().await?;

        let mut records = self.records();
        if let Some(search) = &query.search {
            let needle = search.to_lowercase();
            records.retain(|r| r.prompt.to_lowercase().contains(&needle));
        }

        let total = records.len();
        let limit = query.limit.max(1);
        let start = (query.page.max(1) - 1) * limit;
        let page: Vec<ImageRecord> = records.into_iter().skip(start).take(limit).collect();

        Ok(RemotePage {
            records: page,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    async fn delete(&self, id: &ImageId) -> Result<bool> {
        self.gate().await?;

        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = records.len();
        records.retain(|r| &r.id != id);
        Ok(records.len() < before)
    }

    async fn delete_many(&self, ids: &[ImageId]) -> Result<Vec<ImageId>> {
        let mut removed = Vec::new();
        for id in ids {
            if self.delete(id).await? {
                removed.push(id.clone());
            }
        }
        Ok(removed)
    }

    async fn set_favorite(&self, id: &ImageId, favorite: bool) -> Result<bool> {
        self.gate().await?;

        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.is_favorite = favorite;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_favorite_many(&self, ids: &[ImageId], favorite: bool) -> Result<Vec<ImageId>> {
        let mut updated = Vec::new();
        for id in ids {
            if self.set_favorite(id, favorite).await? {
                updated.push(id.clone());
            }
        }
        Ok(updated)
    }
}
