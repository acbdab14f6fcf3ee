//! Write-path normalization of content documents.
//!
//! Reads are lenient (see [`crate::types::document`]); writes go through
//! [`prepare_write`], which enforces the content invariants:
//!
//! - identifiers are unique within a content type;
//! - identifiers follow the [`ContentId`] format, missing ones are generated;
//! - every collection item has a title;
//! - timestamps are stamped last-write-wins.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{
    Categories, Category, CollectionItem, ContentDocument, ContentId, ContentType, IdError,
    MalformedDocument, slugify,
};

/// Errors that reject a content write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The JSON does not have the shape of the content type.
    #[error(transparent)]
    Malformed(#[from] MalformedDocument),

    /// An item identifier does not follow the id format.
    #[error("item {index}: invalid id {id:?}: {source}")]
    InvalidId {
        index: usize,
        id: String,
        #[source]
        source: IdError,
    },

    /// Two items share an identifier.
    #[error("duplicate id {0:?}")]
    DuplicateId(String),

    /// A required display field is blank.
    #[error("item {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// Validate and normalize a document before it is stored.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the value does not parse as the content
/// type or violates one of the invariants listed in the module docs.
pub fn prepare_write(
    content_type: ContentType,
    value: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<ContentDocument, ValidationError> {
    let mut document = ContentDocument::from_json(content_type, value)?;
    normalize(&mut document, now)?;
    Ok(document)
}

/// Normalize an already-parsed document in place.
///
/// # Errors
///
/// See [`prepare_write`].
pub fn normalize(document: &mut ContentDocument, now: DateTime<Utc>) -> Result<(), ValidationError> {
    let prefix = document.content_type().id_prefix();

    match document {
        ContentDocument::News(items) => normalize_items(items, prefix, now),
        ContentDocument::Services(items) => normalize_items(items, prefix, now),
        ContentDocument::Portfolio(items) => normalize_items(items, prefix, now),
        ContentDocument::About(about) => {
            about.updated_at = Some(now);
            Ok(())
        }
        ContentDocument::Settings(settings) => {
            settings.updated_at = Some(now);
            Ok(())
        }
        ContentDocument::Categories(categories) => normalize_categories(categories, now),
    }
}

fn normalize_items<T: CollectionItem>(
    items: &mut [T],
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(items.len());

    for (index, item) in items.iter_mut().enumerate() {
        if item.title().trim().is_empty() {
            return Err(ValidationError::MissingField {
                index,
                field: "title",
            });
        }

        assign_id(item.id_mut(), index, prefix)?;

        if !seen.insert(item.id().clone()) {
            return Err(ValidationError::DuplicateId(item.id().to_string()));
        }

        item.touch(now);
    }

    Ok(())
}

fn normalize_categories(
    categories: &mut Categories,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    normalize_category_scope(&mut categories.news)?;
    normalize_category_scope(&mut categories.portfolio)?;
    categories.updated_at = Some(now);
    Ok(())
}

fn normalize_category_scope(scope: &mut [Category]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(scope.len());

    for (index, category) in scope.iter_mut().enumerate() {
        if category.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                index,
                field: "name",
            });
        }

        if category.slug.trim().is_empty() {
            category.slug = slugify(&category.name);
        }

        if category.id.is_empty() && !category.slug.is_empty() {
            category.id = ContentId::from(category.slug.as_str());
        }
        assign_id(&mut category.id, index, ContentType::Categories.id_prefix())?;

        if !seen.insert(category.id.clone()) {
            return Err(ValidationError::DuplicateId(category.id.to_string()));
        }
    }

    Ok(())
}

fn assign_id(id: &mut ContentId, index: usize, prefix: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        *id = ContentId::generate(prefix);
        return Ok(());
    }

    id.validate().map_err(|source| ValidationError::InvalidId {
        index,
        id: id.to_string(),
        source,
    })
}
