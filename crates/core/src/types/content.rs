//! Allow-listed content types.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Prefix under which all JSON content documents are stored.
pub const CONTENT_PREFIX: &str = "clean-data";

/// Error returned when a content type name is not on the allow-list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown content type: {0:?}")]
pub struct UnknownContentType(pub String);

/// A content type managed by the CMS.
///
/// Each type maps to exactly one JSON document in blob storage. The set is
/// closed: requests naming any other type are rejected before touching
/// storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    News,
    Services,
    Portfolio,
    About,
    Settings,
    Categories,
}

impl ContentType {
    /// Every content type, in canonical order.
    pub const ALL: [Self; 6] = [
        Self::News,
        Self::Services,
        Self::Portfolio,
        Self::About,
        Self::Settings,
        Self::Categories,
    ];

    /// Wire name of the content type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Services => "services",
            Self::Portfolio => "portfolio",
            Self::About => "about",
            Self::Settings => "settings",
            Self::Categories => "categories",
        }
    }

    /// Human-readable label for the admin panel.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::News => "News",
            Self::Services => "Services",
            Self::Portfolio => "Portfolio",
            Self::About => "About",
            Self::Settings => "Settings",
            Self::Categories => "Categories",
        }
    }

    /// Blob path of the document holding this type.
    ///
    /// ```
    /// use staffline_core::ContentType;
    ///
    /// assert_eq!(ContentType::News.blob_path(), "clean-data/news.json");
    /// ```
    #[must_use]
    pub fn blob_path(self) -> String {
        format!("{CONTENT_PREFIX}/{}.json", self.as_str())
    }

    /// Whether the document is an array of items (as opposed to a single record).
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::News | Self::Services | Self::Portfolio)
    }

    /// Prefix used when generating identifiers for items of this type.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Services => "service",
            Self::Portfolio => "work",
            Self::About => "about",
            Self::Settings => "settings",
            Self::Categories => "category",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| UnknownContentType(name.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allow_list() {
        for content_type in ContentType::ALL {
            assert_eq!(
                content_type.as_str().parse::<ContentType>().unwrap(),
                content_type
            );
        }
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(" news ".parse::<ContentType>().unwrap(), ContentType::News);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("users".parse::<ContentType>().is_err());
        assert!("../settings".parse::<ContentType>().is_err());
        assert!("".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("News".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_blob_paths() {
        assert_eq!(
            ContentType::Categories.blob_path(),
            "clean-data/categories.json"
        );
        assert_eq!(ContentType::About.blob_path(), "clean-data/about.json");
    }

    #[test]
    fn test_collections() {
        assert!(ContentType::News.is_collection());
        assert!(ContentType::Services.is_collection());
        assert!(ContentType::Portfolio.is_collection());
        assert!(!ContentType::About.is_collection());
        assert!(!ContentType::Settings.is_collection());
        assert!(!ContentType::Categories.is_collection());
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&ContentType::Portfolio).unwrap();
        assert_eq!(json, "\"portfolio\"");
        let parsed: ContentType = serde_json::from_str("\"settings\"").unwrap();
        assert_eq!(parsed, ContentType::Settings);
    }
}
