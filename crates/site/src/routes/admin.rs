//! Admin panel pages.
//!
//! The pages are thin shells: reads and writes go through the JSON API from
//! `static/js/admin.js`, so every mutation is authenticated, rate limited and
//! validated in one place.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use staffline_core::{ContentType, HtmlPage};
use tracing::instrument;

use crate::filters;
use crate::middleware::{OptionalAdmin, RequireAdmin};
use crate::routes::pages::not_found_page;
use crate::services::upload::{ALLOWED_FOLDERS, DEFAULT_FOLDER};
use crate::state::AppState;

/// Data shared by every admin page layout.
#[derive(Debug, Clone)]
pub struct AdminLayout {
    pub site_name: String,
    pub path: String,
    /// Session expiry shown in the header.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AdminLayout {
    async fn load(state: &AppState, path: &str, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            site_name: state.content().settings().await.site_name,
            path: path.to_string(),
            expires_at,
        }
    }

    /// Whether a navigation entry is the current page.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        self.path == path
    }

    /// Whether the editor of `content_type` is the current page.
    #[must_use]
    pub fn is_content(&self, content_type: &ContentType) -> bool {
        self.path == format!("/admin/content/{content_type}")
    }

    /// Whether the editor of `page` is the current page.
    #[must_use]
    pub fn is_page(&self, page: &HtmlPage) -> bool {
        self.path == format!("/admin/pages/{page}")
    }

    /// Content types linked from the navigation.
    #[must_use]
    pub fn content_types(&self) -> [ContentType; 6] {
        ContentType::ALL
    }

    /// HTML pages linked from the navigation.
    #[must_use]
    pub fn html_pages(&self) -> [HtmlPage; 3] {
        HtmlPage::ALL
    }
}

/// Summary of one content document on the dashboard.
#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub content_type: ContentType,
    pub items: usize,
    pub is_collection: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An option of the upload folder select.
#[derive(Debug, Clone)]
pub struct FolderOption {
    pub name: &'static str,
    pub selected: bool,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub site_name: String,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: AdminLayout,
    pub documents: Vec<DocumentSummary>,
    pub storage_backend: &'static str,
    pub image_sink: &'static str,
}

/// JSON document editor template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/content.html")]
pub struct ContentEditorTemplate {
    pub layout: AdminLayout,
    pub content_type: ContentType,
    /// Current document, pretty-printed.
    pub json: String,
}

/// HTML page editor template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/page.html")]
pub struct PageEditorTemplate {
    pub layout: AdminLayout,
    pub page: HtmlPage,
    pub html: String,
}

/// Image upload form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/upload.html")]
pub struct UploadTemplate {
    pub layout: AdminLayout,
    pub folders: Vec<FolderOption>,
    pub max_mb: usize,
}

/// Create the admin panel router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/login", get(login_page))
        .route("/content/{content_type}", get(content_editor))
        .route("/pages/{page}", get(page_editor))
        .route("/upload", get(upload_form))
}

/// Render the login page, or go to the dashboard when already signed in.
#[instrument(skip(state, admin))]
pub async fn login_page(State(state): State<AppState>, admin: OptionalAdmin) -> Response {
    if admin.0.is_some() {
        return Redirect::to("/admin").into_response();
    }

    LoginTemplate {
        site_name: state.content().settings().await.site_name,
    }
    .into_response()
}

/// Dashboard with one card per content document.
#[instrument(skip(state, claims))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
) -> impl IntoResponse {
    let mut documents = Vec::with_capacity(ContentType::ALL.len());
    for content_type in ContentType::ALL {
        let document = state.content().load(content_type).await;
        documents.push(DocumentSummary {
            content_type,
            items: document.len(),
            is_collection: content_type.is_collection(),
            updated_at: document.updated_at(),
        });
    }

    DashboardTemplate {
        layout: AdminLayout::load(&state, "/admin", claims.expires_at()).await,
        documents,
        storage_backend: state.content().store().backend(),
        image_sink: state.uploads().sink().name(),
    }
}

/// Editor for one JSON content document.
#[instrument(skip(state, claims))]
pub async fn content_editor(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    Path(content_type): Path<String>,
) -> Response {
    let path = format!("/admin/content/{content_type}");
    let Ok(content_type) = content_type.parse::<ContentType>() else {
        return not_found_page(&state, &path).await;
    };

    let document = state.content().load(content_type).await;
    let json = serde_json::to_string_pretty(&document).unwrap_or_else(|_| "null".to_string());

    ContentEditorTemplate {
        layout: AdminLayout::load(&state, &path, claims.expires_at()).await,
        content_type,
        json,
    }
    .into_response()
}

/// Editor for one HTML page.
#[instrument(skip(state, claims))]
pub async fn page_editor(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    Path(page): Path<String>,
) -> Response {
    let path = format!("/admin/pages/{page}");
    let Ok(page) = page.parse::<HtmlPage>() else {
        return not_found_page(&state, &path).await;
    };

    PageEditorTemplate {
        layout: AdminLayout::load(&state, &path, claims.expires_at()).await,
        page,
        html: state.content().load_html(page).await,
    }
    .into_response()
}

/// Image upload form.
#[instrument(skip(state, claims))]
pub async fn upload_form(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
) -> impl IntoResponse {
    UploadTemplate {
        layout: AdminLayout::load(&state, "/admin/upload", claims.expires_at()).await,
        folders: ALLOWED_FOLDERS
            .into_iter()
            .map(|name| FolderOption {
                name,
                selected: name == DEFAULT_FOLDER,
            })
            .collect(),
        max_mb: state.uploads().max_bytes() / (1024 * 1024),
    }
}
