//! Keyed tables
//!
//! A [`Table`] is a durable map `UserId -> V`. Two backends:
//! - [`MemoryTable`]: DashMap only, for tests and ephemeral runs
//! - [`FileTable`]: one JSON document per key, written to a temporary file and
//!   atomically renamed into place; the whole table is loaded at open
//!
//! Tables do no locking of their own beyond what DashMap gives per entry;
//! read-modify-write sequences go through [`crate::KeyedLocks`].

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use mission_types::UserId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Value types storable in a table
pub trait TableValue: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> TableValue for T where T: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {}

/// Durable keyed map
#[async_trait]
pub trait Table<V: TableValue>: Send + Sync + Debug {
    /// Table name (used in logs and paths)
    fn name(&self) -> &'static str;

    /// Fetch value for key
    async fn get(&self, key: &UserId) -> Result<Option<V>, StoreError>;

    /// Replace value for key
    async fn put(&self, key: &UserId, value: V) -> Result<(), StoreError>;

    /// Remove key, returning whether it existed
    async fn delete(&self, key: &UserId) -> Result<bool, StoreError>;

    /// All stored keys
    async fn keys(&self) -> Result<Vec<UserId>, StoreError>;
}

/// In-memory table
#[derive(Debug)]
pub struct MemoryTable<V> {
    name: &'static str,
    rows: DashMap<UserId, V>,
}

impl<V: TableValue> MemoryTable<V> {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: DashMap::new(),
        }
    }
}

#[async_trait]
impl<V: TableValue> Table<V> for MemoryTable<V> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, key: &UserId) -> Result<Option<V>, StoreError> {
        Ok(self.rows.get(key).map(|row| row.value().clone()))
    }

    async fn put(&self, key: &UserId, value: V) -> Result<(), StoreError> {
        self.rows.insert(key.clone(), value);
        Ok(())
    }

    async fn delete(&self, key: &UserId) -> Result<bool, StoreError> {
        Ok(self.rows.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.rows.iter().map(|row| row.key().clone()).collect())
    }
}

/// On-disk document: the key travels with the value so filenames stay opaque
#[derive(Debug, Serialize, Deserialize)]
struct Document<V> {
    key: UserId,
    value: V,
}

/// File-backed table, one document per key
#[derive(Debug)]
pub struct FileTable<V> {
    name: &'static str,
    dir: PathBuf,
    rows: DashMap<UserId, V>,
}

impl<V: TableValue> FileTable<V> {
    /// Open (creating if needed) the table directory `root/name` and load it.
    ///
    /// Documents that fail to decode are skipped with a warning rather than
    /// failing the whole open.
    pub async fn open(root: impl AsRef<Path>, name: &'static str) -> Result<Self, StoreError> {
        let dir = root.as_ref().join(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let rows = DashMap::new();
        let mut listing = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        while let Some(item) = listing
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(doc) => {
                    rows.insert(doc.key, doc.value);
                }
                Err(e) => {
                    tracing::warn!(table = name, error = %e, "skipping unreadable document");
                }
            }
        }

        tracing::debug!(table = name, rows = rows.len(), "table loaded");
        Ok(Self { name, dir, rows })
    }

    /// Directory backing this table
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_document(path: &Path) -> Result<Document<V>, StoreError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    fn path_for(&self, key: &UserId) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(key.as_str())))
    }
}

#[async_trait]
impl<V: TableValue> Table<V> for FileTable<V> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, key: &UserId) -> Result<Option<V>, StoreError> {
        Ok(self.rows.get(key).map(|row| row.value().clone()))
    }

    async fn put(&self, key: &UserId, value: V) -> Result<(), StoreError> {
        let doc = Document {
            key: key.clone(),
            value,
        };
        let payload = serde_json::to_vec_pretty(&doc).map_err(|source| StoreError::Encode {
            table: self.name,
            source,
        })?;

        let path = self.path_for(key);
        let temp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&temp, payload)
            .await
            .map_err(|e| StoreError::io(&temp, e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        self.rows.insert(doc.key, doc.value);
        Ok(())
    }

    async fn delete(&self, key: &UserId) -> Result<bool, StoreError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(&path, e)),
        }
        Ok(self.rows.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.rows.iter().map(|row| row.key().clone()).collect())
    }
}
