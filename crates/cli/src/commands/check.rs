//! Check stored content.
//!
//! Every stored document is loaded without the lenient fallbacks the site
//! uses and run through the write-path validation, so problems that the site
//! silently degrades around become visible.

use chrono::Utc;
use staffline_core::{ContentType, HtmlPage, validate::normalize};
use staffline_site::services::content::ContentService;
use tracing::{error, info};

use super::CliError;

/// Run the check.
///
/// # Errors
///
/// Returns [`CliError::CheckFailed`] with the number of failing documents.
pub async fn run(service: &ContentService) -> Result<(), CliError> {
    let mut failures = 0;

    for content_type in ContentType::ALL {
        match service.load_strict(content_type).await {
            Ok(None) => info!(%content_type, "Not stored (default served)"),
            Ok(Some(mut document)) => match normalize(&mut document, Utc::now()) {
                Ok(()) => info!(%content_type, items = document.len(), "OK"),
                Err(e) => {
                    error!(%content_type, error = %e, "Invalid document");
                    failures += 1;
                }
            },
            Err(e) => {
                error!(%content_type, error = %e, "Unreadable document");
                failures += 1;
            }
        }
    }

    for page in HtmlPage::ALL {
        match service.load_html_strict(page).await {
            Ok(Some(html)) => info!(%page, bytes = html.len(), "OK"),
            Ok(None) => info!(%page, "Not stored (empty page served)"),
            Err(e) => {
                error!(%page, error = %e, "Unreadable page");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(CliError::CheckFailed(failures));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use staffline_site::storage::{BlobStore, LocalBlobStore};

    use super::*;
    use crate::commands::test_support::local_service;

    #[tokio::test]
    async fn test_check_empty_store_passes() {
        let store = tempfile::tempdir().unwrap();
        run(&local_service(store.path())).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_reports_bad_documents() {
        let store = tempfile::tempdir().unwrap();
        let service = local_service(store.path());
        service
            .save(ContentType::News, json!([{ "id": "n1", "title": "Hello" }]))
            .await
            .unwrap();

        // Written behind the service's back: wrong shape and a duplicate id.
        let raw = BlobStore::Local(LocalBlobStore::new(store.path().to_path_buf()));
        raw.put(&ContentType::About.blob_path(), b"[1, 2]".to_vec(), "application/json")
            .await
            .unwrap();
        raw.put(
            &ContentType::Services.blob_path(),
            br#"[{"id":"s","title":"A"},{"id":"s","title":"B"}]"#.to_vec(),
            "application/json",
        )
        .await
        .unwrap();

        let err = run(&service).await.unwrap_err();
        assert!(matches!(err, CliError::CheckFailed(2)));
    }
}
