//! Content API: JSON documents and HTML pages.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use staffline_core::{ContentType, HtmlPage};
use tracing::instrument;

use super::json_body;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Query for `GET /api/content-clean`.
#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// Body of `POST /api/content-clean`.
#[derive(Debug, Deserialize)]
pub struct SaveContentRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    pub data: Value,
}

/// Response of `POST /api/content-clean`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContentResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

/// Query for `GET /api/content-html`.
#[derive(Debug, Default, Deserialize)]
pub struct HtmlQuery {
    pub page: Option<String>,
}

/// Body and response of the HTML page endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct HtmlPageBody {
    pub page: String,
    #[serde(default)]
    pub html: String,
}

/// Response of `POST /api/content-html`.
#[derive(Debug, Serialize)]
pub struct SaveHtmlResponse {
    pub success: bool,
    pub page: HtmlPage,
}

fn parse_type(raw: &str) -> Result<ContentType> {
    raw.parse()
        .map_err(|e: staffline_core::UnknownContentType| AppError::BadRequest(e.to_string()))
}

fn parse_page(raw: &str) -> Result<HtmlPage> {
    raw.parse()
        .map_err(|e: staffline_core::UnknownHtmlPage| AppError::BadRequest(e.to_string()))
}

/// Read one content document, or all of them when no type is given.
///
/// GET /api/content-clean?type=<type>
#[instrument(skip(state))]
pub async fn get_content(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<Json<Value>> {
    let content_type = query
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match content_type {
        Some(raw) => {
            let content_type = parse_type(raw)?;
            Ok(Json(state.content().load(content_type).await.to_json()))
        }
        None => {
            let bundle = state.content().load_all().await;
            serde_json::to_value(bundle)
                .map(Json)
                .map_err(|e| AppError::Internal(e.to_string()))
        }
    }
}

/// Validate and store a content document.
///
/// POST /api/content-clean
#[instrument(skip(state, _admin, body))]
pub async fn save_content(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    body: std::result::Result<Json<SaveContentRequest>, JsonRejection>,
) -> Result<Json<SaveContentResponse>> {
    let request = json_body(body)?;
    let content_type = parse_type(&request.content_type)?;

    add_breadcrumb("content", "save", Some(&[("type", content_type.as_str())]));

    let document = state.content().save(content_type, request.data).await?;

    Ok(Json(SaveContentResponse {
        success: true,
        content_type,
        updated_at: document.updated_at().unwrap_or_else(Utc::now),
        data: document.to_json(),
    }))
}

/// Read an HTML page body.
///
/// GET /api/content-html?page=<page>
#[instrument(skip(state))]
pub async fn get_html(
    State(state): State<AppState>,
    Query(query): Query<HtmlQuery>,
) -> Result<Json<HtmlPageBody>> {
    let raw = query
        .page
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("missing page parameter".to_string()))?;
    let page = parse_page(raw)?;

    Ok(Json(HtmlPageBody {
        page: page.as_str().to_string(),
        html: state.content().load_html(page).await,
    }))
}

/// Store an HTML page body.
///
/// POST /api/content-html
#[instrument(skip(state, _admin, body))]
pub async fn save_html(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    body: std::result::Result<Json<HtmlPageBody>, JsonRejection>,
) -> Result<Json<SaveHtmlResponse>> {
    let request = json_body(body)?;
    let page = parse_page(&request.page)?;

    add_breadcrumb("content", "save page", Some(&[("page", page.as_str())]));

    state.content().save_html(page, request.html).await?;

    Ok(Json(SaveHtmlResponse {
        success: true,
        page,
    }))
}
