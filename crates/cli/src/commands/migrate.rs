//! Import content from a directory of legacy JSON exports.
//!
//! # Usage
//!
//! ```bash
//! staffline migrate --from ./legacy-data [--dry-run]
//! ```
//!
//! For every content type `<dir>/<type>.json` is read; missing files are
//! skipped. Older exports wrapped documents as `{"items": [...]}`,
//! `{"data": ...}` or `{"<type>": ...}`; those wrappers are removed and
//! numeric ids are turned into strings. Duplicate ids get a `-2`, `-3`, ...
//! suffix. HTML pages are read from `<dir>/html/<page>.html`.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use chrono::Utc;
use serde_json::{Map, Value};
use staffline_core::{ContentType, HtmlPage, prepare_write};
use staffline_site::services::content::ContentService;
use tracing::{info, warn};

use super::CliError;

/// Keys older exports used to wrap a document.
const WRAPPER_KEYS: [&str; 2] = ["items", "data"];

/// Outcome of a migration run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub documents: usize,
    pub pages: usize,
    pub renamed_ids: usize,
}

/// Run the migration.
///
/// # Errors
///
/// Stops at the first unreadable file, invalid document or storage failure.
pub async fn run(
    service: &ContentService,
    from: &Path,
    dry_run: bool,
) -> Result<MigrationReport, CliError> {
    let mut report = MigrationReport::default();

    for content_type in ContentType::ALL {
        let path = from.join(format!("{content_type}.json"));
        let Some(raw) = read_optional(&path).await? else {
            info!(%content_type, "No source file, skipping");
            continue;
        };

        let value: Value =
            serde_json::from_slice(&raw).map_err(|source| CliError::Json {
                path: path.clone(),
                source,
            })?;
        let mut value = unwrap_legacy(content_type, value);
        let renamed = dedupe_ids(&mut value);
        if renamed > 0 {
            warn!(%content_type, renamed, "Renamed duplicate ids");
        }

        // Validate up front so a dry run reports the same errors a write would.
        let document = prepare_write(content_type, value.clone(), Utc::now())
            .map_err(|source| CliError::Invalid {
                content_type,
                source,
            })?;

        if dry_run {
            info!(%content_type, items = document.len(), "Valid (dry run)");
        } else {
            service.save(content_type, value).await?;
            info!(%content_type, items = document.len(), "Imported");
        }

        report.documents += 1;
        report.renamed_ids += renamed;
    }

    for page in HtmlPage::ALL {
        let path = from.join("html").join(format!("{page}.html"));
        let Some(raw) = read_optional(&path).await? else {
            continue;
        };
        let html = String::from_utf8_lossy(&raw).into_owned();

        if dry_run {
            info!(%page, bytes = html.len(), "Page found (dry run)");
        } else {
            service.save_html(page, html).await?;
            info!(%page, "Page imported");
        }
        report.pages += 1;
    }

    info!(
        documents = report.documents,
        pages = report.pages,
        renamed_ids = report.renamed_ids,
        dry_run,
        "Migration complete"
    );
    Ok(report)
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, CliError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CliError::io(path, e)),
    }
}

/// Strip the wrapper object older exports put around a document.
#[must_use]
pub fn unwrap_legacy(content_type: ContentType, value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };

    let key = WRAPPER_KEYS
        .into_iter()
        .chain([content_type.as_str()])
        .find(|key| map.get(*key).is_some_and(|inner| wraps(content_type, inner)));

    match key {
        // Singletons are only unwrapped when the wrapper is all there is.
        Some(key) if content_type.is_collection() || map.len() == 1 => {
            map.remove(key).unwrap_or(Value::Null)
        }
        _ => Value::Object(map),
    }
}

fn wraps(content_type: ContentType, inner: &Value) -> bool {
    if content_type.is_collection() {
        inner.is_array()
    } else {
        inner.is_object()
    }
}

/// Make item ids unique by suffixing `-2`, `-3`, ...; numeric ids become strings.
///
/// Returns the number of renamed items. Non-array values are left alone.
pub fn dedupe_ids(value: &mut Value) -> usize {
    let Value::Array(items) = value else {
        return 0;
    };

    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut renamed = 0;

    for item in items.iter_mut().filter_map(Value::as_object_mut) {
        let Some(id) = id_string(item) else {
            continue;
        };

        let mut candidate = id.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{id}-{n}");
            n += 1;
        }
        if candidate != id {
            renamed += 1;
        }

        item.insert("id".to_string(), Value::String(candidate.clone()));
        seen.insert(candidate);
    }

    renamed
}

fn id_string(item: &Map<String, Value>) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;
    use staffline_core::ContentDocument;

    use super::*;
    use crate::commands::test_support::local_service;

    #[test]
    fn test_unwrap_legacy_collection_wrappers() {
        let bare = json!([{ "title": "A" }]);
        assert_eq!(unwrap_legacy(ContentType::News, bare.clone()), bare);
        assert_eq!(
            unwrap_legacy(ContentType::News, json!({ "items": [{ "title": "A" }] })),
            bare
        );
        assert_eq!(
            unwrap_legacy(ContentType::News, json!({ "news": [{ "title": "A" }], "v": 2 })),
            bare
        );
    }

    #[test]
    fn test_unwrap_legacy_singletons() {
        let wrapped = json!({ "data": { "siteName": "Staffline" } });
        assert_eq!(
            unwrap_legacy(ContentType::Settings, wrapped),
            json!({ "siteName": "Staffline" })
        );

        // A real document with an object-valued field is not a wrapper.
        let about = json!({ "title": "About", "about": { "x": 1 } });
        assert_eq!(unwrap_legacy(ContentType::About, about.clone()), about);
    }

    #[test]
    fn test_dedupe_ids() {
        let mut value = json!([
            { "id": "a", "title": "1" },
            { "id": "a", "title": "2" },
            { "id": "a", "title": "3" },
            { "id": 7, "title": "4" },
            { "title": "5" }
        ]);
        assert_eq!(dedupe_ids(&mut value), 2);
        assert_eq!(value[0]["id"], "a");
        assert_eq!(value[1]["id"], "a-2");
        assert_eq!(value[2]["id"], "a-3");
        assert_eq!(value[3]["id"], "7");
        assert!(value[4].get("id").is_none());
    }

    #[test]
    fn test_dedupe_ids_skips_taken_suffix() {
        let mut value = json!([
            { "id": "a-2", "title": "1" },
            { "id": "a", "title": "2" },
            { "id": "a", "title": "3" }
        ]);
        assert_eq!(dedupe_ids(&mut value), 1);
        assert_eq!(value[2]["id"], "a-3");
    }

    #[tokio::test]
    async fn test_migrate_imports_documents_and_pages() {
        let source = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        std::fs::write(
            source.path().join("news.json"),
            r#"{"items":[{"id":"n1","title":"One"},{"id":"n1","title":"Two"}]}"#,
        )
        .unwrap();
        std::fs::create_dir(source.path().join("html")).unwrap();
        std::fs::write(source.path().join("html/imprint.html"), "<p>Imprint</p>").unwrap();

        let service = local_service(store.path());
        let report = run(&service, source.path(), false).await.unwrap();
        assert_eq!(
            report,
            MigrationReport {
                documents: 1,
                pages: 1,
                renamed_ids: 1
            }
        );

        let Some(ContentDocument::News(items)) =
            service.load_strict(ContentType::News).await.unwrap()
        else {
            panic!("news not stored");
        };
        assert_eq!(items[1].id.as_str(), "n1-2");
        assert_eq!(
            service.load_html_strict(HtmlPage::Imprint).await.unwrap().as_deref(),
            Some("<p>Imprint</p>")
        );
    }

    #[tokio::test]
    async fn test_migrate_dry_run_writes_nothing() {
        let source = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("services.json"), r#"[{"title":"Engraving"}]"#).unwrap();

        let service = local_service(store.path());
        let report = run(&service, source.path(), true).await.unwrap();
        assert_eq!(report.documents, 1);
        assert!(service.load_strict(ContentType::Services).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_migrate_rejects_invalid_document() {
        let source = tempfile::tempdir().unwrap();
        let store = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("portfolio.json"), r#"[{"title":""}]"#).unwrap();

        let service = local_service(store.path());
        let err = run(&service, source.path(), false).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Invalid {
                content_type: ContentType::Portfolio,
                ..
            }
        ));
    }
}
