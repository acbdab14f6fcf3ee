//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /about                  - About page
//! GET  /portfolio              - Portfolio (?category=<slug>)
//! GET  /news                   - News index
//! GET  /news/{id}              - News article
//! GET  /materials              - Materials (admin-authored HTML)
//! GET  /imprint                - Legal notice (admin-authored HTML)
//! GET  /privacy                - Privacy policy (admin-authored HTML)
//! GET  /sitemap.xml            - Sitemap
//! GET  /robots.txt             - Robots rules
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (blob store reachable)
//!
//! # Admin panel
//! GET  /admin/login            - Login form
//! GET  /admin                  - Dashboard
//! GET  /admin/content/{type}   - JSON document editor
//! GET  /admin/pages/{page}     - HTML page editor
//! GET  /admin/upload           - Image upload form
//!
//! # JSON API
//! GET  /api/content-clean      - Read one (?type=) or all content documents
//! POST /api/content-clean      - Validate and store a document (auth)
//! GET  /api/content-html       - Read an HTML page (?page=)
//! POST /api/content-html       - Store an HTML page (auth)
//! POST /api/upload             - Upload an image (auth, multipart)
//! POST /api/auth/login         - Log in, sets the session cookie
//! POST /api/auth/logout        - Log out, clears the session cookie
//! GET  /api/auth/session       - Current session state
//! ```

pub mod admin;
pub mod api;
pub mod health;
pub mod home;
pub mod news;
pub mod pages;
pub mod portfolio;
pub mod seo;

use axum::{Router, routing::get};
use staffline_core::{HtmlPage, Settings};

use crate::config::SiteConfig;
use crate::state::AppState;

/// Data shared by every public page layout.
#[derive(Debug, Clone)]
pub struct Layout {
    pub settings: Settings,
    pub base_url: String,
    pub path: String,
}

impl Layout {
    /// Load the layout data for a page at `path`.
    pub async fn load(state: &AppState, path: &str) -> Self {
        Self {
            settings: state.content().settings().await,
            base_url: state.config().base_url.clone(),
            path: path.to_string(),
        }
    }

    /// Canonical URL of the current page.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}{}", self.base_url, self.path)
    }

    /// Whether a navigation entry is the current section.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.path == "/"
        } else {
            self.path == prefix || self.path.starts_with(&format!("{prefix}/"))
        }
    }

    /// Legal and materials pages linked from the footer.
    #[must_use]
    pub fn html_pages(&self) -> [HtmlPage; 3] {
        HtmlPage::ALL
    }
}

/// Create the public page routes.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/about", get(pages::about))
        .route("/portfolio", get(portfolio::index))
        .route("/news", get(news::index))
        .route("/news/{id}", get(news::show))
        .route("/materials", get(pages::materials))
        .route("/imprint", get(pages::imprint))
        .route("/privacy", get(pages::privacy))
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
}

/// Create all routes for the site.
pub fn routes(config: &SiteConfig) -> Router<AppState> {
    Router::new()
        .merge(page_routes())
        .merge(health::router())
        .nest("/admin", admin::router())
        .nest("/api", api::router(config))
        .fallback(pages::not_found)
}
