//! Content service: typed access to the JSON documents in blob storage.
//!
//! Reads are cached with `moka` and degrade to the default document when a
//! blob is missing or unreadable, so a storage hiccup never takes the public
//! site down. Writes are validated with [`prepare_write`] and invalidate the
//! cache entry of this process.
//!
//! A read that overlaps a write must not cache what it read before the write
//! landed, so each key carries a write generation. Reads only keep their
//! result cached when the generation is unchanged after inserting.

use std::cmp::Reverse;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use staffline_core::{
    About, Categories, ContentBundle, ContentDocument, ContentType, HtmlPage, MalformedDocument,
    NewsItem, PortfolioItem, Service, Settings, ValidationError, prepare_write, slugify,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::storage::{BlobStore, StorageError};

/// Errors surfaced by the content service.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The submitted document violates the content rules.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A stored document could not be parsed.
    #[error(transparent)]
    Malformed(#[from] MalformedDocument),

    /// An HTML page exceeds the size limit.
    #[error("page body exceeds {max} bytes")]
    TooLarge { max: usize },

    /// Stored HTML is not valid UTF-8.
    #[error("page {0} is not valid UTF-8")]
    Encoding(HtmlPage),

    /// The document could not be serialized.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Blob storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Read cache over a fixed key set, with a write generation per key.
#[derive(Clone)]
struct ReadCache<K: 'static, V> {
    entries: Cache<K, V>,
    keys: &'static [K],
    generations: Arc<[AtomicU64]>,
}

impl<K, V> ReadCache<K, V>
where
    K: Copy + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new(keys: &'static [K], ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(keys.len() as u64)
                .time_to_live(ttl)
                .build(),
            keys,
            generations: keys.iter().map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn counter(&self, key: K) -> Option<&AtomicU64> {
        let index = self.keys.iter().position(|k| *k == key)?;
        self.generations.get(index)
    }

    async fn get(&self, key: K) -> Option<V> {
        self.entries.get(&key).await
    }

    /// Generation to pass to [`Self::insert_read`] for a read starting now.
    fn generation(&self, key: K) -> u64 {
        self.counter(key).map_or(0, |c| c.load(Ordering::SeqCst))
    }

    /// Cache a value read at `generation`, unless a write has since landed.
    async fn insert_read(&self, key: K, value: V, generation: u64) {
        if self.generation(key) != generation {
            return;
        }
        self.entries.insert(key, value).await;
        // A write may have finished between the check and the insert
        if self.generation(key) != generation {
            self.entries.invalidate(&key).await;
        }
    }

    /// Record a completed write.
    async fn invalidate_written(&self, key: K) {
        if let Some(counter) = self.counter(key) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        self.entries.invalidate(&key).await;
    }
}

/// Content service shared by page handlers, the content API and the CLI.
#[derive(Clone)]
pub struct ContentService {
    store: BlobStore,
    documents: ReadCache<ContentType, ContentDocument>,
    pages: ReadCache<HtmlPage, String>,
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ContentService {
    /// Create a service over a store, caching reads for `cache_ttl`.
    #[must_use]
    pub fn new(store: BlobStore, cache_ttl: Duration) -> Self {
        Self {
            store,
            documents: ReadCache::new(&ContentType::ALL, cache_ttl),
            pages: ReadCache::new(&HtmlPage::ALL, cache_ttl),
        }
    }

    /// The underlying blob store.
    #[must_use]
    pub const fn store(&self) -> &BlobStore {
        &self.store
    }

    // =========================================================================
    // JSON documents
    // =========================================================================

    /// Load a document, degrading to the default document on any failure.
    #[instrument(skip(self), fields(content_type = %content_type))]
    pub async fn load(&self, content_type: ContentType) -> ContentDocument {
        if let Some(document) = self.documents.get(content_type).await {
            return document;
        }

        let generation = self.documents.generation(content_type);
        match self.load_strict(content_type).await {
            Ok(stored) => {
                let document = stored.unwrap_or_else(|| {
                    debug!("No stored document, serving default");
                    ContentDocument::default_for(content_type)
                });
                self.documents
                    .insert_read(content_type, document.clone(), generation)
                    .await;
                document
            }
            Err(e) => {
                // Not cached: the next request retries storage.
                warn!(error = %e, "Failed to load content, serving default");
                ContentDocument::default_for(content_type)
            }
        }
    }

    /// Load a document without caching or degrading.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the stored JSON is malformed.
    pub async fn load_strict(
        &self,
        content_type: ContentType,
    ) -> Result<Option<ContentDocument>, ContentError> {
        let Some(bytes) = self.store.get(&content_type.blob_path()).await? else {
            return Ok(None);
        };
        Ok(Some(ContentDocument::from_slice(content_type, &bytes)?))
    }

    /// Load every document at once.
    pub async fn load_all(&self) -> ContentBundle {
        let mut bundle = ContentBundle::default();
        for content_type in ContentType::ALL {
            bundle.insert(self.load(content_type).await);
        }
        bundle
    }

    /// Validate, normalize and store a document.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Validation`] if the value is rejected, or a
    /// storage error if the write fails.
    #[instrument(skip(self, value), fields(content_type = %content_type))]
    pub async fn save(
        &self,
        content_type: ContentType,
        value: serde_json::Value,
    ) -> Result<ContentDocument, ContentError> {
        let document = prepare_write(content_type, value, Utc::now())?;
        let bytes = serde_json::to_vec_pretty(&document)?;

        self.store
            .put(&content_type.blob_path(), bytes, "application/json")
            .await?;
        self.documents.invalidate_written(content_type).await;

        info!(items = document.len(), "Content saved");
        Ok(document)
    }

    // =========================================================================
    // HTML pages
    // =========================================================================

    /// Load an HTML page body, degrading to an empty string on any failure.
    #[instrument(skip(self), fields(page = %page))]
    pub async fn load_html(&self, page: HtmlPage) -> String {
        if let Some(html) = self.pages.get(page).await {
            return html;
        }

        let generation = self.pages.generation(page);
        match self.load_html_strict(page).await {
            Ok(html) => {
                let html = html.unwrap_or_default();
                self.pages.insert_read(page, html.clone(), generation).await;
                html
            }
            Err(e) => {
                warn!(error = %e, "Failed to load page, serving empty body");
                String::new()
            }
        }
    }

    /// Load an HTML page body without caching or degrading.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the body is not UTF-8.
    pub async fn load_html_strict(&self, page: HtmlPage) -> Result<Option<String>, ContentError> {
        let Some(bytes) = self.store.get(&page.blob_path()).await? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| ContentError::Encoding(page))
    }

    /// Store an HTML page body.
    ///
    /// The body is stored as authored: only the admin can write it.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::TooLarge`] above [`HtmlPage::MAX_BYTES`], or a
    /// storage error if the write fails.
    #[instrument(skip(self, html), fields(page = %page, size = html.len()))]
    pub async fn save_html(&self, page: HtmlPage, html: String) -> Result<(), ContentError> {
        if html.len() > HtmlPage::MAX_BYTES {
            return Err(ContentError::TooLarge {
                max: HtmlPage::MAX_BYTES,
            });
        }

        self.store
            .put(&page.blob_path(), html.into_bytes(), "text/html; charset=utf-8")
            .await?;
        self.pages.invalidate_written(page).await;

        info!("Page saved");
        Ok(())
    }

    // =========================================================================
    // Typed helpers for rendering
    // =========================================================================

    /// Published news, newest first.
    pub async fn news_published(&self) -> Vec<NewsItem> {
        let ContentDocument::News(items) = self.load(ContentType::News).await else {
            return Vec::new();
        };

        let mut items: Vec<NewsItem> = items.into_iter().filter(|n| n.published).collect();
        items.sort_by_key(|n| Reverse((n.published_on(), n.created_at)));
        items
    }

    /// A single news item by id, published or not.
    pub async fn news_item(&self, id: &str) -> Option<NewsItem> {
        let ContentDocument::News(items) = self.load(ContentType::News).await else {
            return None;
        };
        items.into_iter().find(|n| n.id.as_str() == id)
    }

    /// Services ordered by `order`, then title.
    pub async fn services_sorted(&self) -> Vec<Service> {
        let ContentDocument::Services(mut items) = self.load(ContentType::Services).await else {
            return Vec::new();
        };
        items.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
        items
    }

    /// Portfolio entries, optionally restricted to a category slug.
    ///
    /// Featured entries come first; otherwise the stored order is kept.
    pub async fn portfolio(&self, category: Option<&str>) -> Vec<PortfolioItem> {
        let ContentDocument::Portfolio(items) = self.load(ContentType::Portfolio).await else {
            return Vec::new();
        };

        let mut items: Vec<PortfolioItem> = match category.map(str::trim).filter(|c| !c.is_empty())
        {
            Some(slug) => items
                .into_iter()
                .filter(|item| item.category == slug || slugify(&item.category) == slug)
                .collect(),
            None => items,
        };
        items.sort_by_key(|item| !item.featured);
        items
    }

    /// The about page document.
    pub async fn about(&self) -> About {
        match self.load(ContentType::About).await {
            ContentDocument::About(about) => about,
            _ => About::default(),
        }
    }

    /// Site-wide settings.
    pub async fn settings(&self) -> Settings {
        match self.load(ContentType::Settings).await {
            ContentDocument::Settings(settings) => settings,
            _ => Settings::default(),
        }
    }

    /// Category lists.
    pub async fn categories(&self) -> Categories {
        match self.load(ContentType::Categories).await {
            ContentDocument::Categories(categories) => categories,
            _ => Categories::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::LocalBlobStore;

    fn service(dir: &tempfile::TempDir) -> ContentService {
        let store = BlobStore::Local(LocalBlobStore::new(dir.path().to_path_buf()));
        ContentService::new(store, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_load_missing_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);
        let doc = content.load(ContentType::Settings).await;
        assert_eq!(doc, ContentDocument::default_for(ContentType::Settings));
    }

    #[tokio::test]
    async fn test_load_malformed_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);
        content
            .store()
            .put("clean-data/news.json", b"{not json".to_vec(), "application/json")
            .await
            .unwrap();

        assert!(content.load(ContentType::News).await.is_empty());
        assert!(content.load_strict(ContentType::News).await.is_err());
    }

    #[tokio::test]
    async fn test_save_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);

        assert!(content.load(ContentType::News).await.is_empty());
        content
            .save(ContentType::News, json!([{ "title": "Season opening" }]))
            .await
            .unwrap();

        let news = content.news_published().await;
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].title, "Season opening");
        assert!(news[0].id.as_str().starts_with("news-"));
    }

    #[tokio::test]
    async fn test_read_overlapping_a_save_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);

        // A load reads the empty store, then a save completes before it caches
        let generation = content.documents.generation(ContentType::News);
        let stale = content.load_strict(ContentType::News).await.unwrap();
        assert!(stale.is_none());
        content
            .save(ContentType::News, json!([{ "title": "Concert edition" }]))
            .await
            .unwrap();
        content
            .documents
            .insert_read(
                ContentType::News,
                ContentDocument::default_for(ContentType::News),
                generation,
            )
            .await;

        let news = content.news_published().await;
        assert_eq!(news.len(), 1);
        assert_eq!(news[0].title, "Concert edition");
    }

    #[tokio::test]
    async fn test_page_read_overlapping_a_save_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);

        let generation = content.pages.generation(HtmlPage::Privacy);
        content
            .save_html(HtmlPage::Privacy, "<p>Updated</p>".to_string())
            .await
            .unwrap();
        content
            .pages
            .insert_read(HtmlPage::Privacy, String::new(), generation)
            .await;

        assert_eq!(content.load_html(HtmlPage::Privacy).await, "<p>Updated</p>");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);
        let result = content
            .save(ContentType::News, json!([{ "id": "x", "title": "" }]))
            .await;
        assert!(matches!(result, Err(ContentError::Validation(_))));
        assert!(content.load_strict(ContentType::News).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_news_published_order_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);
        content
            .save(
                ContentType::News,
                json!([
                    { "id": "old", "title": "Old", "date": "2023-01-01" },
                    { "id": "draft", "title": "Draft", "date": "2025-01-01", "published": false },
                    { "id": "new", "title": "New", "date": "2024-05-01" }
                ]),
            )
            .await
            .unwrap();

        let ids: Vec<_> = content
            .news_published()
            .await
            .into_iter()
            .map(|n| n.id.to_string())
            .collect();
        assert_eq!(ids, ["new", "old"]);
        assert!(content.news_item("draft").await.is_some());
    }

    #[tokio::test]
    async fn test_services_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);
        content
            .save(
                ContentType::Services,
                json!([
                    { "title": "Proofreading", "order": 2 },
                    { "title": "Engraving", "order": 1 },
                    { "title": "Arranging", "order": 2 }
                ]),
            )
            .await
            .unwrap();

        let titles: Vec<_> = content
            .services_sorted()
            .await
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, ["Engraving", "Arranging", "Proofreading"]);
    }

    #[tokio::test]
    async fn test_portfolio_category_filter() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);
        content
            .save(
                ContentType::Portfolio,
                json!([
                    { "title": "Quartet", "category": "Kammermusik" },
                    { "title": "Symphony", "category": "orchester", "featured": true },
                    { "title": "Trio", "category": "kammermusik" }
                ]),
            )
            .await
            .unwrap();

        let chamber = content.portfolio(Some("kammermusik")).await;
        assert_eq!(chamber.len(), 2);

        let all = content.portfolio(None).await;
        assert_eq!(all[0].title, "Symphony");
    }

    #[tokio::test]
    async fn test_html_round_trip_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let content = service(&dir);

        assert_eq!(content.load_html(HtmlPage::Imprint).await, "");
        content
            .save_html(HtmlPage::Imprint, "<p>Staffline GmbH</p>".to_string())
            .await
            .unwrap();
        assert_eq!(
            content.load_html(HtmlPage::Imprint).await,
            "<p>Staffline GmbH</p>"
        );

        let too_big = "x".repeat(HtmlPage::MAX_BYTES + 1);
        assert!(matches!(
            content.save_html(HtmlPage::Privacy, too_big).await,
            Err(ContentError::TooLarge { .. })
        ));
    }
}
