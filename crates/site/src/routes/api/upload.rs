//! Image upload endpoint.

use axum::{
    Json,
    extract::{
        State,
        multipart::{Multipart, MultipartError},
    },
    http::StatusCode,
};
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::services::upload::{ImageUpload, UploadError, UploadResult};
use crate::state::AppState;

fn multipart_error(e: &MultipartError, max: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { max }.into()
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Upload an image and its thumbnail.
///
/// POST /api/upload (multipart: `file`, optional `folder`)
#[instrument(skip(state, _admin, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    mut multipart: Multipart,
) -> Result<Json<UploadResult>> {
    let max = state.uploads().max_bytes();
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, max))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e, max))?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("folder") => {
                folder = Some(field.text().await.map_err(|e| multipart_error(&e, max))?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) = file.ok_or(UploadError::MissingFile)?;

    add_breadcrumb("upload", "image", Some(&[("file", file_name.as_str())]));

    let result = state
        .uploads()
        .upload(ImageUpload {
            file_name,
            content_type,
            bytes,
            folder,
        })
        .await?;

    Ok(Json(result))
}
