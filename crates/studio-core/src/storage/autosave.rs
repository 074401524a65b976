//! Auto-save functionality for document persistence.
//!
//! Saves are upserts keyed by project name. A save captures a thumbnail
//! with editor decorations hidden, then writes with a bounded number of
//! retries. A separate cleanup sweep keeps only the newest documents.

use crate::config::AutoSaveConfig;
use crate::document::{Decorations, Document};
use crate::storage::{DesignSummary, DocumentRecord, Storage, StorageError, StorageResult};
use crate::thumbnail::{ThumbnailRequest, Thumbnailer};
use std::sync::Arc;
use std::time::Instant;

/// Manages automatic document persistence.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    config: AutoSaveConfig,
    thumbnailer: Option<Box<dyn Thumbnailer + Send + Sync>>,
    last_save: Option<Instant>,
    last_cleanup: Option<Instant>,
    /// Whether the document has unsaved changes.
    dirty: bool,
    /// Set while a document is being loaded; suppresses saves.
    loading: bool,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>, config: AutoSaveConfig) -> Self {
        Self {
            storage,
            config,
            thumbnailer: None,
            last_save: None,
            last_cleanup: None,
            dirty: false,
            loading: false,
        }
    }

    pub fn with_thumbnailer(mut self, thumbnailer: impl Thumbnailer + Send + Sync + 'static) -> Self {
        self.thumbnailer = Some(Box::new(thumbnailer));
        self
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Dirty, not mid-load, and the interval has passed since the last save.
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.dirty || self.loading {
            return false;
        }
        self.last_save
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.interval())
    }

    /// Save if [`AutoSaveManager::should_save`] says so. Returns whether a
    /// save happened.
    pub async fn maybe_save(&mut self, document: &mut Document, now: Instant) -> StorageResult<bool> {
        if !self.should_save(now) {
            return Ok(false);
        }
        self.save(document).await?;
        Ok(true)
    }

    /// Save immediately.
    ///
    /// An existing record under the same name keeps its id and creation
    /// time. The write is attempted up to `max_attempts` times; only the
    /// final failure is returned.
    pub async fn save(&mut self, document: &mut Document) -> StorageResult<()> {
        let thumbnail = self.capture_thumbnail(document);
        let mut record = document.to_record(thumbnail);

        match self.storage.load(&record.name).await {
            Ok(existing) => {
                record.id = existing.id;
                record.created_at = existing.created_at;
            }
            Err(StorageError::NotFound(_)) => {}
            Err(e) => log::warn!("Could not read existing '{}': {}", record.name, e),
        }

        self.write_with_retry(&record).await?;

        document.id = record.id;
        document.created_at = record.created_at;
        document.last_saved_at = Some(record.last_modified);
        self.last_save = Some(Instant::now());
        self.dirty = false;
        log::info!("Saved '{}' ({} pages)", record.name, record.pages.len());
        Ok(())
    }

    async fn write_with_retry(&self, record: &DocumentRecord) -> StorageResult<()> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.storage.save(record).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Save attempt {}/{} for '{}' failed: {}",
                        attempt,
                        attempts,
                        record.name,
                        e
                    );
                    let delay = self.config.retry_delay();
                    if !delay.is_zero() {
                        futures_timer::Delay::new(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("Giving up saving '{}' after {} attempts: {}", record.name, attempts, e);
                    return Err(e);
                }
            }
        }
    }

    /// Render the active page with decorations hidden, then put them back.
    fn capture_thumbnail(&self, document: &mut Document) -> Option<String> {
        let thumbnailer = self.thumbnailer.as_ref()?;
        let shown = document.decorations;
        document.decorations = Decorations::HIDDEN;
        let result = thumbnailer.capture(&ThumbnailRequest {
            scene: document.scene(),
            page_size: document.active_page().size(),
            decorations: document.decorations,
        });
        document.decorations = shown;
        match result {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Thumbnail capture failed, saving without one: {}", e);
                None
            }
        }
    }

    /// Load a saved document by project name.
    pub async fn load_by_name(&mut self, name: &str) -> StorageResult<Document> {
        self.loading = true;
        let result = self.storage.load(name).await;
        self.loading = false;
        let document = Document::from_record(result?);
        self.dirty = false;
        self.last_save = Some(Instant::now());
        log::debug!("Loaded '{}'", name);
        Ok(document)
    }

    /// Load the most recently modified document, if any exist.
    pub async fn load_last(&mut self) -> StorageResult<Option<Document>> {
        let index = self.index().await?;
        match index.first() {
            Some(newest) => {
                let name = newest.name.clone();
                self.load_by_name(&name).await.map(Some)
            }
            None => Ok(None),
        }
    }

    /// Saved designs, newest first.
    pub async fn index(&self) -> StorageResult<Vec<DesignSummary>> {
        let mut designs = self.storage.list().await?;
        designs.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        Ok(designs)
    }

    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        self.storage.delete(name).await
    }

    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        self.storage.exists(name).await
    }

    pub fn should_cleanup(&self, now: Instant) -> bool {
        self.last_cleanup
            .is_none_or(|last| now.saturating_duration_since(last) >= self.config.cleanup_interval())
    }

    /// Delete everything beyond the newest `max_documents`. Returns how
    /// many records were removed.
    pub async fn cleanup(&mut self) -> StorageResult<usize> {
        let designs = self.index().await?;
        let mut removed = 0;
        for stale in designs.iter().skip(self.config.max_documents) {
            match self.storage.delete(&stale.name).await {
                Ok(()) => {
                    log::info!("Cleaned up old design '{}'", stale.name);
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to clean up '{}': {}", stale.name, e),
            }
        }
        self.last_cleanup = Some(Instant::now());
        Ok(removed)
    }
}
