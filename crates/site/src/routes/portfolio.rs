//! Portfolio route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use staffline_core::{Category, PortfolioItem};
use tracing::instrument;

use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// Query parameters for the portfolio page.
#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    pub category: Option<String>,
}

/// Portfolio page template.
#[derive(Template, WebTemplate)]
#[template(path = "portfolio.html")]
pub struct PortfolioTemplate {
    pub layout: Layout,
    pub items: Vec<PortfolioItem>,
    pub categories: Vec<Category>,
    /// Slug of the selected category, empty for "all".
    pub active: String,
}

/// Display the portfolio, optionally filtered by `?category=<slug>`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PortfolioQuery>,
) -> impl IntoResponse {
    let active = query
        .category
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    let filter = (!active.is_empty()).then_some(active.as_str());

    let content = state.content();
    let items = content.portfolio(filter).await;
    let categories = content.categories().await.portfolio;

    PortfolioTemplate {
        layout: Layout::load(&state, "/portfolio").await,
        items,
        categories,
        active,
    }
}
