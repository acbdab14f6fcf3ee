//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use staffline_core::{NewsItem, PortfolioItem, Service};
use tracing::instrument;

use crate::filters;
use crate::routes::Layout;
use crate::state::AppState;

/// Number of portfolio entries shown on the home page.
const HOME_PORTFOLIO_COUNT: usize = 6;

/// Number of news posts shown on the home page.
const HOME_NEWS_COUNT: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub services: Vec<Service>,
    pub portfolio: Vec<PortfolioItem>,
    pub news: Vec<NewsItem>,
}

/// Display the home page.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let content = state.content();

    let mut portfolio = content.portfolio(None).await;
    portfolio.truncate(HOME_PORTFOLIO_COUNT);

    let mut news = content.news_published().await;
    news.truncate(HOME_NEWS_COUNT);

    HomeTemplate {
        layout: Layout::load(&state, "/").await,
        services: content.services_sorted().await,
        portfolio,
        news,
    }
}
