//! Content documents.
//!
//! Every struct here is a plain record mirroring the JSON stored in blob
//! storage. All fields are defaulted so that partially-filled or legacy
//! documents still deserialize; strictness lives in [`crate::validate`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::content::ContentType;
use super::id::ContentId;

// =============================================================================
// Collection Items
// =============================================================================

/// A news post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsItem {
    pub id: ContentId,
    pub title: String,
    pub excerpt: String,
    /// Body as HTML.
    pub content: String,
    /// Publication date, usually `YYYY-MM-DD`.
    pub date: String,
    pub image: String,
    pub thumbnail: String,
    pub tags: Vec<String>,
    pub category: String,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for NewsItem {
    fn default() -> Self {
        Self {
            id: ContentId::default(),
            title: String::new(),
            excerpt: String::new(),
            content: String::new(),
            date: String::new(),
            image: String::new(),
            thumbnail: String::new(),
            tags: Vec::new(),
            category: String::new(),
            published: true,
            created_at: None,
            updated_at: None,
        }
    }
}

impl NewsItem {
    /// Publication date parsed from `date`.
    ///
    /// Accepts plain dates and RFC 3339 timestamps; falls back to the
    /// creation time.
    #[must_use]
    pub fn published_on(&self) -> Option<NaiveDate> {
        let raw = self.date.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.date_naive())
            })
            .or_else(|| self.created_at.map(|dt| dt.date_naive()))
    }
}

/// A service offered by the studio (engraving, arranging, proofreading...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    /// Free-form price label, e.g. "from 6 € per page".
    pub price: String,
    pub icon: String,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A portfolio entry (an engraved edition or score).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioItem {
    pub id: ContentId,
    pub title: String,
    pub composer: String,
    pub description: String,
    pub year: String,
    pub image: String,
    pub thumbnail: String,
    pub category: String,
    pub tags: Vec<String>,
    pub featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Common behaviour of items stored in array documents.
pub trait CollectionItem {
    /// Item identifier.
    fn id(&self) -> &ContentId;

    /// Mutable access to the identifier (used to assign generated ids).
    fn id_mut(&mut self) -> &mut ContentId;

    /// Display title, required to be non-blank.
    fn title(&self) -> &str;

    /// Apply last-write-wins timestamps.
    fn touch(&mut self, now: DateTime<Utc>);
}

macro_rules! impl_collection_item {
    ($ty:ty) => {
        impl CollectionItem for $ty {
            fn id(&self) -> &ContentId {
                &self.id
            }

            fn id_mut(&mut self) -> &mut ContentId {
                &mut self.id
            }

            fn title(&self) -> &str {
                &self.title
            }

            fn touch(&mut self, now: DateTime<Utc>) {
                self.created_at.get_or_insert(now);
                self.updated_at = Some(now);
            }
        }
    };
}

impl_collection_item!(NewsItem);
impl_collection_item!(Service);
impl_collection_item!(PortfolioItem);

// =============================================================================
// Singleton Documents
// =============================================================================

/// A member of the studio team shown on the about page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
    pub bio: String,
    pub image: String,
}

/// The about page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct About {
    pub title: String,
    pub intro: String,
    /// Body as HTML.
    pub body: String,
    pub image: String,
    pub team: Vec<TeamMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A link to a social profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLink {
    pub label: String,
    pub url: String,
}

/// Site-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub site_name: String,
    pub tagline: String,
    pub contact_email: String,
    pub phone: String,
    pub address: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_image: String,
    pub social_links: Vec<SocialLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_name: "Staffline".to_owned(),
            tagline: "Music engraving studio".to_owned(),
            contact_email: String::new(),
            phone: String::new(),
            address: String::new(),
            hero_title: "Music engraving".to_owned(),
            hero_subtitle: String::new(),
            hero_image: String::new(),
            social_links: Vec::new(),
            updated_at: None,
        }
    }
}

/// A category used to group news posts or portfolio entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: ContentId,
    pub name: String,
    pub slug: String,
}

/// Category lists per scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Categories {
    pub news: Vec<Category>,
    pub portfolio: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Categories {
    /// Look up a portfolio category by slug.
    #[must_use]
    pub fn portfolio_by_slug(&self, slug: &str) -> Option<&Category> {
        self.portfolio.iter().find(|c| c.slug == slug)
    }
}

// =============================================================================
// ContentDocument
// =============================================================================

/// A complete stored document of one content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentDocument {
    News(Vec<NewsItem>),
    Services(Vec<Service>),
    Portfolio(Vec<PortfolioItem>),
    About(About),
    Settings(Settings),
    Categories(Categories),
}

/// Error produced when a JSON value does not have the shape of its type.
#[derive(thiserror::Error, Debug)]
#[error("malformed {content_type} document: {source}")]
pub struct MalformedDocument {
    pub content_type: ContentType,
    #[source]
    pub source: serde_json::Error,
}

impl ContentDocument {
    /// The document served when nothing is stored yet.
    #[must_use]
    pub fn default_for(content_type: ContentType) -> Self {
        match content_type {
            ContentType::News => Self::News(Vec::new()),
            ContentType::Services => Self::Services(Vec::new()),
            ContentType::Portfolio => Self::Portfolio(Vec::new()),
            ContentType::About => Self::About(About::default()),
            ContentType::Settings => Self::Settings(Settings::default()),
            ContentType::Categories => Self::Categories(Categories::default()),
        }
    }

    /// Parse a JSON value as the document of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedDocument`] if the value does not match the
    /// document shape (e.g. an object where an array is expected).
    pub fn from_json(
        content_type: ContentType,
        value: serde_json::Value,
    ) -> Result<Self, MalformedDocument> {
        let wrap = |source| MalformedDocument {
            content_type,
            source,
        };

        Ok(match content_type {
            ContentType::News => Self::News(serde_json::from_value(value).map_err(wrap)?),
            ContentType::Services => Self::Services(serde_json::from_value(value).map_err(wrap)?),
            ContentType::Portfolio => {
                Self::Portfolio(serde_json::from_value(value).map_err(wrap)?)
            }
            ContentType::About => Self::About(serde_json::from_value(value).map_err(wrap)?),
            ContentType::Settings => Self::Settings(serde_json::from_value(value).map_err(wrap)?),
            ContentType::Categories => {
                Self::Categories(serde_json::from_value(value).map_err(wrap)?)
            }
        })
    }

    /// Parse raw stored bytes as the document of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedDocument`] if the bytes are not valid JSON of the
    /// expected shape.
    pub fn from_slice(content_type: ContentType, bytes: &[u8]) -> Result<Self, MalformedDocument> {
        let value = serde_json::from_slice(bytes).map_err(|source| MalformedDocument {
            content_type,
            source,
        })?;
        Self::from_json(content_type, value)
    }

    /// The content type of this document.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::News(_) => ContentType::News,
            Self::Services(_) => ContentType::Services,
            Self::Portfolio(_) => ContentType::Portfolio,
            Self::About(_) => ContentType::About,
            Self::Settings(_) => ContentType::Settings,
            Self::Categories(_) => ContentType::Categories,
        }
    }

    /// Convert to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Number of items for collections, `1` for singleton documents.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::News(items) => items.len(),
            Self::Services(items) => items.len(),
            Self::Portfolio(items) => items.len(),
            Self::About(_) | Self::Settings(_) | Self::Categories(_) => 1,
        }
    }

    /// Whether a collection document has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent `updated_at` stamp in the document.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::News(items) => items.iter().filter_map(|i| i.updated_at).max(),
            Self::Services(items) => items.iter().filter_map(|i| i.updated_at).max(),
            Self::Portfolio(items) => items.iter().filter_map(|i| i.updated_at).max(),
            Self::About(about) => about.updated_at,
            Self::Settings(settings) => settings.updated_at,
            Self::Categories(categories) => categories.updated_at,
        }
    }
}

/// Every content document at once, as served by the content API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBundle {
    pub news: Vec<NewsItem>,
    pub services: Vec<Service>,
    pub portfolio: Vec<PortfolioItem>,
    pub about: About,
    pub settings: Settings,
    pub categories: Categories,
}

impl ContentBundle {
    /// Place a document into its slot of the bundle.
    pub fn insert(&mut self, document: ContentDocument) {
        match document {
            ContentDocument::News(items) => self.news = items,
            ContentDocument::Services(items) => self.services = items,
            ContentDocument::Portfolio(items) => self.portfolio = items,
            ContentDocument::About(about) => self.about = about,
            ContentDocument::Settings(settings) => self.settings = settings,
            ContentDocument::Categories(categories) => self.categories = categories,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_news_defaults_to_published() {
        let item: NewsItem = serde_json::from_value(json!({ "id": "n1", "title": "Hi" })).unwrap();
        assert!(item.published);
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_news_published_on() {
        let mut item = NewsItem {
            date: "2024-03-09".to_owned(),
            ..NewsItem::default()
        };
        assert_eq!(
            item.published_on(),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );

        item.date = "2024-03-09T10:00:00Z".to_owned();
        assert_eq!(
            item.published_on(),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );

        item.date = "soon".to_owned();
        assert_eq!(item.published_on(), None);
    }

    #[test]
    fn test_from_json_collection_requires_array() {
        let result = ContentDocument::from_json(ContentType::News, json!({ "id": "n1" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json_singleton() {
        let doc = ContentDocument::from_json(
            ContentType::Settings,
            json!({ "siteName": "Notensatz Nord", "contactEmail": "hi@example.com" }),
        )
        .unwrap();
        match doc {
            ContentDocument::Settings(settings) => {
                assert_eq!(settings.site_name, "Notensatz Nord");
                assert_eq!(settings.contact_email, "hi@example.com");
                assert!(settings.hero_subtitle.is_empty());
            }
            other => panic!("unexpected document: {other:?}"),
        }
    }

    #[test]
    fn test_camel_case_wire_format() {
        let doc = ContentDocument::Portfolio(vec![PortfolioItem {
            id: ContentId::from("w1"),
            title: "Sonata".to_owned(),
            ..PortfolioItem::default()
        }]);
        let value = doc.to_json();
        assert_eq!(value[0]["id"], "w1");
        assert!(value[0].get("createdAt").is_none());
        assert_eq!(value[0]["featured"], false);
    }

    #[test]
    fn test_default_for_matches_type() {
        for content_type in ContentType::ALL {
            let doc = ContentDocument::default_for(content_type);
            assert_eq!(doc.content_type(), content_type);
            assert_eq!(doc.is_empty(), content_type.is_collection());
        }
    }

    #[test]
    fn test_bundle_serializes_all_types() {
        let mut bundle = ContentBundle::default();
        bundle.insert(ContentDocument::Services(vec![Service {
            id: ContentId::from("s1"),
            title: "Engraving".to_owned(),
            ..Service::default()
        }]));
        let value = serde_json::to_value(&bundle).unwrap();
        for content_type in ContentType::ALL {
            assert!(value.get(content_type.as_str()).is_some());
        }
        assert_eq!(value["services"][0]["title"], "Engraving");
    }
}
