// Favorites store - the full favorites set kept under one key
use async_trait::async_trait;
use stargazer_cache::KvStore;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    models::{Page, RepositoryRecord, TimeWindow},
    source::DataSource,
    Error, Result,
};

/// Key the serialized favorites array lives under
pub const FAVORITES_KEY: &str = "favorite_list";

/// Locally persisted favorites
///
/// Every write reads the whole list, edits it and writes it back. A list that
/// fails to deserialize is treated as empty and overwritten on the next write.
pub struct FavoritesSource {
    store: Arc<KvStore>,
}

impl FavoritesSource {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    /// Current favorites in the order they were added
    pub fn load(&self) -> Result<Vec<RepositoryRecord>> {
        let raw = self.store.get(FAVORITES_KEY)?;
        Ok(decode_list(raw.as_deref()))
    }

    fn rewrite<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<RepositoryRecord>),
    {
        let mut encode_error: Option<serde_json::Error> = None;

        self.store.update(FAVORITES_KEY, |raw| {
            let mut list = decode_list(raw.as_deref());
            edit(&mut list);

            match serde_json::to_string(&list) {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    // Keep whatever was there rather than dropping the key
                    encode_error = Some(e);
                    raw
                }
            }
        })?;

        match encode_error {
            Some(e) => Err(Error::from(e)),
            None => Ok(()),
        }
    }
}

fn decode_list(raw: Option<&str>) -> Vec<RepositoryRecord> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<RepositoryRecord>>(raw) {
        Ok(list) => list,
        Err(e) => {
            let err = Error::StorageCorrupt(e.to_string());
            warn!("{}; treating favorites as empty", err);
            Vec::new()
        }
    }
}

#[async_trait]
impl DataSource for FavoritesSource {
    /// Never fails: a store that can't be read counts as an empty set
    async fn fetch(&self, _window: Option<TimeWindow>, _page_no: Option<u32>) -> Result<Page> {
        let items = self.load().unwrap_or_else(|e| {
            warn!("Could not read favorites, treating them as empty: {}", e);
            Vec::new()
        });
        Ok(Page::complete(items))
    }

    async fn add(&self, record: &RepositoryRecord) -> Result<()> {
        debug!("Adding {} to favorites", record.full_name());
        self.rewrite(|list| {
            if !list.contains(record) {
                list.push(record.clone());
            }
        })
    }

    async fn remove(&self, record: &RepositoryRecord) -> Result<()> {
        debug!("Removing {} from favorites", record.full_name());
        self.rewrite(|list| list.retain(|r| r.id != record.id))
    }
}
