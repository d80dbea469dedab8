// sitemap.xml generation
use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::seo::parse_timestamp;
use crate::error::{AppError, AppResult};
use crate::models::Article;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Section and policy pages always listed
pub const STATIC_PATHS: [&str; 23] = [
    "",
    "/rampur",
    "/up",
    "/national",
    "/politics",
    "/crime",
    "/education-jobs",
    "/business",
    "/entertainment",
    "/sports",
    "/health",
    "/religion-culture",
    "/food-lifestyle",
    "/nearby",
    "/about",
    "/contact",
    "/privacy",
    "/terms",
    "/disclaimer",
    "/ownership",
    "/editorial-policy",
    "/corrections-policy",
    "/grievance",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub loc: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: &'static str,
    pub priority: f32,
}

pub fn static_entries(base_url: &str, now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let base = base_url.trim_end_matches('/');
    STATIC_PATHS
        .iter()
        .map(|path| SitemapEntry {
            loc: format!("{}{}", base, path),
            last_modified: now,
            change_frequency: "daily",
            priority: if path.is_empty() { 1.0 } else { 0.7 },
        })
        .collect()
}

/// One entry per article at `/<category>/<slug>`
pub fn article_entries(base_url: &str, articles: &[Article], now: DateTime<Utc>) -> Vec<SitemapEntry> {
    let base = base_url.trim_end_matches('/');
    articles
        .iter()
        .filter(|a| a.is_published() && !a.slug.is_empty())
        .map(|article| SitemapEntry {
            loc: format!("{}/{}/{}", base, article.category, article.slug),
            last_modified: article
                .last_modified()
                .and_then(parse_timestamp)
                .unwrap_or(now),
            change_frequency: "hourly",
            priority: 0.9,
        })
        .collect()
}

fn xml_err(e: impl std::fmt::Display) -> AppError {
    AppError::Unknown(format!("Failed to write sitemap: {}", e))
}

fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> AppResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

pub fn render_sitemap(entries: &[SitemapEntry]) -> AppResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    writer.write_event(Event::Start(urlset)).map_err(xml_err)?;

    for entry in entries {
        writer
            .write_event(Event::Start(BytesStart::new("url")))
            .map_err(xml_err)?;
        write_text_element(&mut writer, "loc", &entry.loc)?;
        write_text_element(
            &mut writer,
            "lastmod",
            &entry.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        write_text_element(&mut writer, "changefreq", entry.change_frequency)?;
        write_text_element(&mut writer, "priority", &format!("{:.1}", entry.priority))?;
        writer
            .write_event(Event::End(BytesEnd::new("url")))
            .map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("urlset")))
        .map_err(xml_err)?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(xml_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_static_entries() {
        let entries = static_entries("https://rampurnews.com/", now());
        assert_eq!(entries.len(), STATIC_PATHS.len());
        assert_eq!(entries[0].loc, "https://rampurnews.com");
        assert_eq!(entries[0].priority, 1.0);
        assert_eq!(entries[1].loc, "https://rampurnews.com/rampur");
        assert_eq!(entries[1].priority, 0.7);
    }

    #[test]
    fn test_article_entries() {
        let articles = vec![
            Article {
                id: "1".into(),
                title: "A".into(),
                slug: "rain & flood".into(),
                category: "rampur".into(),
                modified_date: Some("2026-03-01T08:00:00Z".into()),
                ..Default::default()
            },
            Article {
                id: "2".into(),
                title: "B".into(),
                slug: "draft".into(),
                category: "crime".into(),
                status: Some("draft".into()),
                ..Default::default()
            },
            Article {
                id: "3".into(),
                title: "C".into(),
                slug: "no-date".into(),
                category: "up".into(),
                published_date: Some("garbage".into()),
                ..Default::default()
            },
        ];
        let entries = article_entries("https://rampurnews.com", &articles, now());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].last_modified, Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());
        assert_eq!(entries[1].last_modified, now());
        assert_eq!(entries[1].change_frequency, "hourly");

        let xml = render_sitemap(&entries).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<loc>https://rampurnews.com/rampur/rain &amp; flood</loc>"));
        assert!(xml.contains("<lastmod>2026-03-01T08:00:00Z</lastmod>"));
        assert!(xml.contains("<priority>0.9</priority>"));
    }
}
