//! Storage abstraction for persistence.
//!
//! Documents are stored as [`DocumentRecord`]s keyed by their project name,
//! so saving under an existing name overwrites it.

mod autosave;
mod file;
mod memory;

pub use autosave::AutoSaveManager;
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::document::{Page, PageSize};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Persisted form of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub name: String,
    pub pages: Vec<Page>,
    pub page_size: PageSize,
    /// PNG data URL of the first page, without guides or grid.
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn summary(&self) -> DesignSummary {
        DesignSummary {
            name: self.name.clone(),
            id: self.id,
            last_modified: self.last_modified,
            thumbnail: self.thumbnail.clone(),
            page_count: self.pages.len(),
        }
    }
}

/// One row of the saved-designs index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSummary {
    pub name: String,
    pub id: Uuid,
    pub last_modified: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub page_count: usize,
}

/// Trait for document storage backends.
///
/// Every operation is keyed by project name.
pub trait Storage: Send + Sync {
    /// Insert or overwrite the record stored under `record.name`.
    fn save(&self, record: &DocumentRecord) -> BoxFuture<'_, StorageResult<()>>;

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<DocumentRecord>>;

    /// Delete a record. Deleting a missing record is not an error.
    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Every stored record's summary, in no particular order.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>>;

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Poll a future to completion on the current thread.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(name: &str) -> DocumentRecord {
    let mut doc = crate::document::Document::new(name, PageSize::default());
    doc.to_record(None)
}
