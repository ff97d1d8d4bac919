use async_trait::async_trait;

use crate::types::Article;
use crate::Result;

/// Caller-managed persistence for articles and their revision history.
#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Fetch an article by id
    async fn get(&self, id: &str) -> Result<Option<Article>>;

    /// Insert or replace an article as a whole
    async fn put(&self, article: &Article) -> Result<()>;

    /// All stored articles, oldest first
    async fn list(&self) -> Result<Vec<Article>>;

    /// Remove an article, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;
}
