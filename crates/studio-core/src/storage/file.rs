//! File-based storage implementation for native platforms.

use super::{BoxFuture, DesignSummary, DocumentRecord, Storage, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each document as a JSON file named after its project.
///
/// Project names are escaped reversibly: ASCII alphanumerics and `-` are
/// kept, every other byte becomes `_` followed by two hex digits.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the platform's local data directory.
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("studio").join("documents"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", encode_name(name)))
    }

    fn read_record(path: &Path) -> StorageResult<DocumentRecord> {
        let json = fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        DocumentRecord::from_json(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{:02x}", byte));
        }
    }
    out
}

fn decode_name(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let hex = encoded.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl Storage for FileStorage {
    fn save(&self, record: &DocumentRecord) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(&record.name);
        let json = match record.to_json() {
            Ok(j) => j,
            Err(e) => {
                return Box::pin(async move { Err(StorageError::Serialization(e.to_string())) });
            }
        };

        Box::pin(async move {
            fs::write(&path, json)
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
        })
    }

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<DocumentRecord>> {
        let path = self.document_path(name);
        let name = name.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(name));
            }
            Self::read_record(&path)
        })
    }

    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(name);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut summaries = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|e| e != "json") {
                    continue;
                }
                let stem = path.file_stem().and_then(|s| s.to_str());
                if stem.and_then(decode_name).is_none() {
                    log::warn!("Skipping unrecognized file {}", path.display());
                    continue;
                }
                match Self::read_record(&path) {
                    Ok(record) => summaries.push(record.summary()),
                    Err(e) => log::warn!("Skipping unreadable document: {}", e),
                }
            }
            Ok(summaries)
        })
    }

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.document_path(name);
        Box::pin(async move { Ok(path.exists()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{block_on, sample_record};
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_save_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let record = sample_record("Summer Sale");

        block_on(storage.save(&record)).unwrap();
        let loaded = block_on(storage.load("Summer Sale")).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_list_and_upsert() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.save(&sample_record("doc1"))).unwrap();
        block_on(storage.save(&sample_record("doc2"))).unwrap();
        block_on(storage.save(&sample_record("doc2"))).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut names: Vec<_> = block_on(storage.list())
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["doc1", "doc2"]);
    }

    #[test]
    fn test_file_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.save(&sample_record("test"))).unwrap();
        assert!(block_on(storage.exists("test")).unwrap());

        block_on(storage.delete("test")).unwrap();
        assert!(!block_on(storage.exists("test")).unwrap());
    }

    #[test]
    fn test_names_with_special_characters_stay_distinct() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        block_on(storage.save(&sample_record("a/b"))).unwrap();
        block_on(storage.save(&sample_record("a_b"))).unwrap();
        block_on(storage.save(&sample_record("Café menu"))).unwrap();

        assert_eq!(block_on(storage.list()).unwrap().len(), 3);
        assert_eq!(block_on(storage.load("a/b")).unwrap().name, "a/b");
        assert_eq!(block_on(storage.load("Café menu")).unwrap().name, "Café menu");
    }

    #[test]
    fn test_name_encoding_is_reversible() {
        for name in ["plain", "with space", "slash/colon:", "_x", "ünï"] {
            assert_eq!(decode_name(&encode_name(name)).as_deref(), Some(name));
        }
        assert!(decode_name("bad_z").is_none());
    }
}
