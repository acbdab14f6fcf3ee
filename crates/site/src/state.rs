//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::github::GitHubClient;
use crate::services::auth::{LoginThrottle, SessionSigner};
use crate::services::content::ContentService;
use crate::services::upload::{ImageSink, UploadService};
use crate::storage::BlobStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// content service, the upload pipeline and the session machinery.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    content: ContentService,
    uploads: UploadService,
    signer: SessionSigner,
    throttle: LoginThrottle,
    image_origins: Vec<String>,
}

impl AppState {
    /// Create the application state from configuration.
    ///
    /// Uploaded images go to the GitHub content repository when one is
    /// configured, otherwise to the blob store.
    #[must_use]
    pub fn new(config: SiteConfig) -> Self {
        let store = BlobStore::from_config(&config.storage);
        let github = config.github.clone().map(GitHubClient::new);

        let mut image_origins = Vec::new();
        if let Some(client) = &github {
            image_origins.push(client.public_origin());
        }
        if matches!(store, BlobStore::Vercel(_)) {
            image_origins.push("https://*.public.blob.vercel-storage.com".to_string());
        }

        let sink = github.map_or_else(|| ImageSink::Store(store.clone()), ImageSink::GitHub);

        let content = ContentService::new(store, config.content_cache_ttl);
        let uploads = UploadService::new(sink, config.max_upload_bytes);
        let signer = SessionSigner::new(config.session_secret.clone(), config.session_ttl);
        let throttle = LoginThrottle::new(config.login);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                content,
                uploads,
                signer,
                throttle,
                image_origins,
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the content service.
    #[must_use]
    pub fn content(&self) -> &ContentService {
        &self.inner.content
    }

    /// Get a reference to the upload service.
    #[must_use]
    pub fn uploads(&self) -> &UploadService {
        &self.inner.uploads
    }

    /// Get a reference to the session token signer.
    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.inner.signer
    }

    /// Get a reference to the failed-login throttle.
    #[must_use]
    pub fn throttle(&self) -> &LoginThrottle {
        &self.inner.throttle
    }

    /// Remote origins images may be loaded from, besides `'self'`.
    #[must_use]
    pub fn image_origins(&self) -> &[String] {
        &self.inner.image_origins
    }
}
