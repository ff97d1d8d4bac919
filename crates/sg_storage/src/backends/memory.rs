use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sg_core::{Article, ArticleStorage, Result};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryStore {
    articles: HashMap<String, Article>,
    /// Ids in first-insertion order.
    order: Vec<String>,
}

impl MemoryStore {
    fn put(&mut self, article: &Article) {
        if self.articles.insert(article.id.clone(), article.clone()).is_none() {
            self.order.push(article.id.clone());
        }
    }

    fn delete(&mut self, id: &str) -> bool {
        if self.articles.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
            true
        } else {
            false
        }
    }

    fn list(&self) -> Vec<Article> {
        self.order
            .iter()
            .filter_map(|id| self.articles.get(id).cloned())
            .collect()
    }
}

/// Process-local storage; the default backend and the one tests use.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn get(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.store.read().await.articles.get(id).cloned())
    }

    async fn put(&self, article: &Article) -> Result<()> {
        self.store.write().await.put(article);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Article>> {
        Ok(self.store.read().await.list())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.store.write().await.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_core::{ArticleMetadata, ContentRequest, Provider};

    fn article(topic: &str) -> Article {
        let request = ContentRequest::new(topic, "zeta");
        Article::new(
            &request,
            ArticleMetadata::fallback(topic),
            format!("# {}\n\nzeta body", topic),
            Provider::Gemini,
        )
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = InMemoryStorage::new();
        let first = article("first");
        let second = article("second");
        storage.put(&first).await.unwrap();
        storage.put(&second).await.unwrap();

        let listed = storage.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);

        let fetched = storage.get(&second.id).await.unwrap().unwrap();
        assert_eq!(fetched, second);
    }

    #[tokio::test]
    async fn test_put_replaces_in_place() {
        let storage = InMemoryStorage::new();
        let first = article("first");
        let second = article("second");
        storage.put(&first).await.unwrap();
        storage.put(&second).await.unwrap();

        let edited = sg_core::revision::apply_manual_edit(first.clone(), "# edited".to_string());
        storage.put(&edited).await.unwrap();

        let listed = storage.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].body_markdown, "# edited");
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = InMemoryStorage::new();
        let a = article("a");
        storage.put(&a).await.unwrap();
        assert!(storage.delete(&a.id).await.unwrap());
        assert!(!storage.delete(&a.id).await.unwrap());
        assert!(storage.get(&a.id).await.unwrap().is_none());
        assert!(storage.list().await.unwrap().is_empty());
    }
}
