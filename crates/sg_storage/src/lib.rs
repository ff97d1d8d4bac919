use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use sg_core::{ArticleStorage, Result};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DB_PATH: &str = "articles.db";


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Memory,
    Sqlite,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(format!(
                "Unknown storage backend: {}. Available backends: memory, sqlite",
                other
            )),
        }
    }
}

/// Opens the requested backend. `db_path` only matters for SQLite.
pub async fn open_storage(kind: StorageKind, db_path: Option<&Path>) -> Result<Arc<dyn ArticleStorage>> {
    match kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => {
            let path = db_path.unwrap_or_else(|| Path::new(DEFAULT_DB_PATH));
            Ok(Arc::new(SqliteStorage::new_with_path(path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = db_path;
            Err(sg_core::Error::Storage(
                "SQLite support is not compiled in (enable the `sqlite` feature)".to_string(),
            ))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{open_storage, StorageKind};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_parse() {
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("SQLite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert!("qdrant".parse::<StorageKind>().is_err());
    }

    #[tokio::test]
    async fn test_open_memory_storage() {
        let storage = open_storage(StorageKind::Memory, None).await.unwrap();
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_open_sqlite_storage_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.db");
        let storage = open_storage(StorageKind::Sqlite, Some(&path)).await.unwrap();
        assert!(storage.list().await.unwrap().is_empty());
        assert!(path.exists());
    }

    #[cfg(not(feature = "sqlite"))]
    #[tokio::test]
    async fn test_sqlite_without_feature_is_an_error() {
        assert!(open_storage(StorageKind::Sqlite, None).await.is_err());
    }
}
