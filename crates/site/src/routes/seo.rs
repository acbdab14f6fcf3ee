//! Sitemap and robots.txt.

use std::fmt::Write as _;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use chrono::NaiveDate;
use staffline_core::HtmlPage;
use tracing::instrument;

use crate::state::AppState;

/// Change frequency of a sitemap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ChangeFreq {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

/// A sitemap `<url>` entry.
#[derive(Debug, Clone)]
struct SitemapUrl {
    loc: String,
    lastmod: Option<NaiveDate>,
    changefreq: ChangeFreq,
    priority: f32,
}

impl SitemapUrl {
    fn new(base_url: &str, path: &str, changefreq: ChangeFreq, priority: f32) -> Self {
        Self {
            loc: format!("{base_url}{path}"),
            lastmod: None,
            changefreq,
            priority,
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn render_sitemap(urls: &[SitemapUrl]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');

    for url in urls {
        xml.push_str("  <url>\n");
        let _ = writeln!(xml, "    <loc>{}</loc>", escape_xml(&url.loc));
        if let Some(lastmod) = url.lastmod {
            let _ = writeln!(xml, "    <lastmod>{}</lastmod>", lastmod.format("%Y-%m-%d"));
        }
        let _ = writeln!(xml, "    <changefreq>{}</changefreq>", url.changefreq.as_str());
        let _ = writeln!(xml, "    <priority>{:.1}</priority>", url.priority);
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Serve `sitemap.xml` listing the public pages and published news.
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let base_url = state.config().base_url.as_str();

    let mut urls = vec![
        SitemapUrl::new(base_url, "/", ChangeFreq::Weekly, 1.0),
        SitemapUrl::new(base_url, "/about", ChangeFreq::Monthly, 0.7),
        SitemapUrl::new(base_url, "/portfolio", ChangeFreq::Weekly, 0.8),
        SitemapUrl::new(base_url, "/news", ChangeFreq::Daily, 0.8),
    ];

    for page in HtmlPage::ALL {
        urls.push(SitemapUrl::new(
            base_url,
            &format!("/{}", page.as_str()),
            ChangeFreq::Yearly,
            0.3,
        ));
    }

    for item in state.content().news_published().await {
        let mut url = SitemapUrl::new(
            base_url,
            &format!("/news/{}", item.id),
            ChangeFreq::Monthly,
            0.6,
        );
        url.lastmod = item
            .updated_at
            .map(|dt| dt.date_naive())
            .or_else(|| item.published_on());
        urls.push(url);
    }

    (
        [
            (header::CONTENT_TYPE, "application/xml; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        render_sitemap(&urls),
    )
}

/// Serve `robots.txt`, keeping crawlers out of the admin panel and API.
pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
        state.config().base_url
    );

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        body,
    )
}
