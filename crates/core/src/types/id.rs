//! Content item identifiers and slugs.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when validating a [`ContentId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The identifier is too long.
    #[error("id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The identifier contains a character outside `[A-Za-z0-9_-]`.
    #[error("id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identifier of an item inside a content document.
///
/// Identifiers are only required to be unique within their content type.
/// Deserialization is deliberately lenient so that legacy documents load;
/// [`ContentId::validate`] is enforced on the write path.
///
/// ## Examples
///
/// ```
/// use staffline_core::ContentId;
///
/// assert!(ContentId::parse("news-2024-autumn").is_ok());
/// assert!(ContentId::parse("").is_err());
/// assert!(ContentId::parse("no spaces").is_err());
///
/// let generated = ContentId::generate("work");
/// assert!(generated.as_str().starts_with("work-"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Maximum length of an identifier.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and validate an identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 64 characters, or
    /// contains characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let id = Self(s.to_owned());
        id.validate()?;
        Ok(id)
    }

    /// Generate a fresh identifier with the given prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        let suffix = simple.get(..12).unwrap_or(&simple);
        Self(format!("{prefix}-{suffix}"))
    }

    /// Check the identifier against the format rules.
    ///
    /// # Errors
    ///
    /// See [`ContentId::parse`].
    pub fn validate(&self) -> Result<(), IdError> {
        if self.0.is_empty() {
            return Err(IdError::Empty);
        }
        if self.0.len() > Self::MAX_LENGTH {
            return Err(IdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = self
            .0
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(IdError::InvalidChar(c));
        }
        Ok(())
    }

    /// Whether the identifier has not been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Convert free text into a lowercase ASCII slug.
///
/// German umlauts and `ß` are transliterated; every other run of
/// non-alphanumeric characters becomes a single `-`.
///
/// ```
/// use staffline_core::slugify;
///
/// assert_eq!(slugify("Klavierauszüge & Partituren"), "klavierauszuege-partituren");
/// assert_eq!(slugify("  Große Fuge  "), "grosse-fuge");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let replacement = match c {
            'ä' => Some("ae"),
            'ö' => Some("oe"),
            'ü' => Some("ue"),
            'ß' => Some("ss"),
            _ => None,
        };

        if let Some(text) = replacement {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push_str(text);
        } else if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}
