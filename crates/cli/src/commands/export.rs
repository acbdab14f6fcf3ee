//! Export stored content to a directory.
//!
//! Writes `<dir>/<type>.json` for every stored document and
//! `<dir>/html/<page>.html` for every stored page, in the layout
//! `staffline migrate --from` reads back.

use std::path::Path;

use staffline_core::{ContentType, HtmlPage};
use staffline_site::services::content::ContentService;
use tracing::info;

use super::CliError;

/// Run the export. Returns the number of files written.
///
/// # Errors
///
/// Fails on the first storage or filesystem error, or on a stored document
/// that does not parse.
pub async fn run(service: &ContentService, to: &Path) -> Result<usize, CliError> {
    let html_dir = to.join("html");
    tokio::fs::create_dir_all(&html_dir)
        .await
        .map_err(|e| CliError::io(&html_dir, e))?;

    let mut written = 0;

    for content_type in ContentType::ALL {
        let Some(document) = service.load_strict(content_type).await? else {
            info!(%content_type, "Not stored, skipping");
            continue;
        };

        let path = to.join(format!("{content_type}.json"));
        let json = serde_json::to_vec_pretty(&document).map_err(|source| CliError::Json {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| CliError::io(&path, e))?;
        written += 1;
    }

    for page in HtmlPage::ALL {
        let Some(html) = service.load_html_strict(page).await? else {
            continue;
        };

        let path = html_dir.join(format!("{page}.html"));
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| CliError::io(&path, e))?;
        written += 1;
    }

    info!(files = written, dir = %to.display(), "Export complete");
    Ok(written)
}
