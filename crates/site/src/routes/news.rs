//! News route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use staffline_core::NewsItem;
use tracing::instrument;

use crate::filters;
use crate::routes::Layout;
use crate::routes::pages::not_found_page;
use crate::state::AppState;

/// Number of other posts listed under an article.
const RECENT_NEWS_COUNT: usize = 3;

/// News index template.
#[derive(Template, WebTemplate)]
#[template(path = "news/index.html")]
pub struct NewsIndexTemplate {
    pub layout: Layout,
    pub news: Vec<NewsItem>,
}

/// News article template.
#[derive(Template, WebTemplate)]
#[template(path = "news/show.html")]
pub struct NewsShowTemplate {
    pub layout: Layout,
    pub item: NewsItem,
    pub recent: Vec<NewsItem>,
}

/// Display all published news, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    NewsIndexTemplate {
        layout: Layout::load(&state, "/news").await,
        news: state.content().news_published().await,
    }
}

/// Display a single news article.
///
/// Unknown and unpublished articles render the 404 page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let path = format!("/news/{id}");

    let Some(item) = state
        .content()
        .news_item(&id)
        .await
        .filter(|item| item.published)
    else {
        return not_found_page(&state, &path).await;
    };

    let recent: Vec<NewsItem> = state
        .content()
        .news_published()
        .await
        .into_iter()
        .filter(|n| n.id != item.id)
        .take(RECENT_NEWS_COUNT)
        .collect();

    NewsShowTemplate {
        layout: Layout::load(&state, &path).await,
        item,
        recent,
    }
    .into_response()
}
