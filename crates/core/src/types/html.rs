//! Rich-text HTML pages.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::content::CONTENT_PREFIX;

/// Error returned when an HTML page name is not on the allow-list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown page: {0:?}")]
pub struct UnknownHtmlPage(pub String);

/// A free-form HTML page edited in the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlPage {
    /// Study materials and downloads.
    Materials,
    /// Legal notice (Impressum).
    Imprint,
    /// Privacy policy.
    Privacy,
}

impl HtmlPage {
    /// Every HTML page, in navigation order.
    pub const ALL: [Self; 3] = [Self::Materials, Self::Imprint, Self::Privacy];

    /// Maximum stored size of a page body in bytes.
    pub const MAX_BYTES: usize = 512 * 1024;

    /// Slug used in URLs and blob paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Imprint => "imprint",
            Self::Privacy => "privacy",
        }
    }

    /// Page title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Materials => "Materials",
            Self::Imprint => "Imprint",
            Self::Privacy => "Privacy Policy",
        }
    }

    /// Blob path of the page body.
    #[must_use]
    pub fn blob_path(self) -> String {
        format!("{CONTENT_PREFIX}/html/{}.html", self.as_str())
    }
}

impl fmt::Display for HtmlPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HtmlPage {
    type Err = UnknownHtmlPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| UnknownHtmlPage(name.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("imprint".parse::<HtmlPage>().unwrap(), HtmlPage::Imprint);
        assert!("about".parse::<HtmlPage>().is_err());
    }

    #[test]
    fn test_blob_path() {
        assert_eq!(
            HtmlPage::Privacy.blob_path(),
            "clean-data/html/privacy.html"
        );
    }
}
