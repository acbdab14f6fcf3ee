//! Static and admin-authored page handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use staffline_core::{About, HtmlPage};
use tracing::instrument;

use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
    pub about: About,
}

/// Template for pages whose body is HTML authored in the admin panel.
#[derive(Template, WebTemplate)]
#[template(path = "page.html")]
pub struct HtmlPageTemplate {
    pub layout: Layout,
    pub title: &'static str,
    pub html: String,
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
}

/// Display the about page.
#[instrument(skip(state))]
pub async fn about(State(state): State<AppState>) -> impl IntoResponse {
    AboutTemplate {
        layout: Layout::load(&state, "/about").await,
        about: state.content().about().await,
    }
}

async fn html_page(state: &AppState, page: HtmlPage) -> HtmlPageTemplate {
    HtmlPageTemplate {
        layout: Layout::load(state, &format!("/{}", page.as_str())).await,
        title: page.title(),
        html: state.content().load_html(page).await,
    }
}

/// Display the materials page.
#[instrument(skip(state))]
pub async fn materials(State(state): State<AppState>) -> impl IntoResponse {
    html_page(&state, HtmlPage::Materials).await
}

/// Display the legal notice.
#[instrument(skip(state))]
pub async fn imprint(State(state): State<AppState>) -> impl IntoResponse {
    html_page(&state, HtmlPage::Imprint).await
}

/// Display the privacy policy.
#[instrument(skip(state))]
pub async fn privacy(State(state): State<AppState>) -> impl IntoResponse {
    html_page(&state, HtmlPage::Privacy).await
}

/// Render the 404 page for `path`.
pub async fn not_found_page(state: &AppState, path: &str) -> Response {
    let template = NotFoundTemplate {
        layout: Layout::load(state, path).await,
    };
    (StatusCode::NOT_FOUND, template).into_response()
}

/// Fallback handler for unknown paths.
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    not_found_page(&state, uri.path()).await
}
