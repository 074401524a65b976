//! In-memory storage implementation.

use super::{BoxFuture, DesignSummary, DocumentRecord, Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, DocumentRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::Other(format!("Lock error: {}", e))
    }
}

impl Storage for MemoryStorage {
    fn save(&self, record: &DocumentRecord) -> BoxFuture<'_, StorageResult<()>> {
        let record = record.clone();
        Box::pin(async move {
            let mut docs = self.documents.write().map_err(Self::lock_error)?;
            docs.insert(record.name.clone(), record);
            Ok(())
        })
    }

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<DocumentRecord>> {
        let name = name.to_string();
        Box::pin(async move {
            let docs = self.documents.read().map_err(Self::lock_error)?;
            docs.get(&name)
                .cloned()
                .ok_or(StorageError::NotFound(name))
        })
    }

    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut docs = self.documents.write().map_err(Self::lock_error)?;
            docs.remove(&name);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(Self::lock_error)?;
            Ok(docs.values().map(DocumentRecord::summary).collect())
        })
    }

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let name = name.to_string();
        Box::pin(async move {
            let docs = self.documents.read().map_err(Self::lock_error)?;
            Ok(docs.contains_key(&name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{block_on, sample_record};

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let record = sample_record("Poster");

        block_on(storage.save(&record)).unwrap();
        let loaded = block_on(storage.load("Poster")).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_save_under_same_name_overwrites() {
        let storage = MemoryStorage::new();
        let first = sample_record("Poster");
        let second = sample_record("Poster");

        block_on(storage.save(&first)).unwrap();
        block_on(storage.save(&second)).unwrap();

        let list = block_on(storage.list()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, second.id);
    }

    #[test]
    fn test_load_missing() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nope"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_delete_and_exists() {
        let storage = MemoryStorage::new();
        block_on(storage.save(&sample_record("Card"))).unwrap();
        assert!(block_on(storage.exists("Card")).unwrap());

        block_on(storage.delete("Card")).unwrap();
        assert!(!block_on(storage.exists("Card")).unwrap());
        block_on(storage.delete("Card")).unwrap();
    }
}
