use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sg_core::{Article, ArticleStorage, Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tracing::debug;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        kind TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // Add future migrations here
];

/// One row per article; the full aggregate (history and chat included) is
/// kept as JSON in `data`.
pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl SqliteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::Storage(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        debug!("Opened SQLite storage at {}", db_path.display());
        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }
}

fn decode(data: &str) -> Result<Article> {
    Ok(serde_json::from_str(data)?)
}

#[async_trait]
impl ArticleStorage for SqliteStorage {
    async fn get(&self, id: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT data FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to load article {}: {}", id, e)))?;
        row.map(|row| decode(&row.get::<String, _>("data"))).transpose()
    }

    async fn put(&self, article: &Article) -> Result<()> {
        let data = serde_json::to_string(article)?;
        // upsert keeps the rowid, so listing order stays stable across edits
        sqlx::query(
            r#"
            INSERT INTO articles (id, title, kind, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                kind = excluded.kind,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&article.id)
        .bind(article.title())
        .bind(article.kind.as_str())
        .bind(data)
        .bind(article.created_at.to_rfc3339())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Storage(format!("Failed to store article: {}", e)))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query("SELECT data FROM articles ORDER BY rowid ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to list articles: {}", e)))?;
        rows.iter()
            .map(|row| decode(&row.get::<String, _>("data")))
            .collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete article {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }
}
