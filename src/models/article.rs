use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// News article as consumed by the site
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default, deserialize_with = "lenient_label")]
    pub category: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub author: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_url")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_labels")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_breaking: bool,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seo_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

impl Article {
    pub fn is_published(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "published")
    }

    /// Last-change timestamp: modified, then published
    pub fn last_modified(&self) -> Option<&str> {
        self.modified_date
            .as_deref()
            .or(self.published_date.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Article list filters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArticleQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub breaking: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
    pub author: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

impl ArticleQuery {
    pub fn published() -> Self {
        Self {
            status: Some("published".to_string()),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs understood by the article endpoints
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                pairs.push((key.to_string(), v));
            }
        };
        push("category", self.category.clone());
        push("status", self.status.clone());
        push("featured", self.featured.map(|v| v.to_string()));
        push("breaking", self.breaking.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("offset", self.offset.map(|v| v.to_string()));
        push("search", self.search.clone().filter(|s| !s.is_empty()));
        push("author", self.author.clone());
        push("orderBy", self.order_by.clone());
        push("order", self.order.clone());
        pairs
    }
}

/// Paged list envelope returned by every provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn empty(page_size: u64) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page: 1,
            page_size,
            total_pages: 0,
        }
    }

    /// Slice `items` by offset/limit
    pub fn from_slice(items: Vec<T>, offset: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        let total = items.len() as u64;
        let data = items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Self {
            data,
            total,
            page: offset / limit + 1,
            page_size: limit,
            total_pages: total.div_ceil(limit),
        }
    }

    /// Convert every record, keeping the paging counters
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Paginated<U>, E> {
        Ok(Paginated {
            data: self.data.into_iter().map(f).collect::<Result<_, _>>()?,
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_hindi: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Site-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub site_name: String,
    pub site_name_hindi: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub favicon: String,
    #[serde(default)]
    pub social_links: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_name: "Rampur News".to_string(),
            site_name_hindi: "रामपुर न्यूज़".to_string(),
            tagline: String::new(),
            logo: "/logo.png".to_string(),
            favicon: "/favicon.ico".to_string(),
            social_links: Map::new(),
        }
    }
}

/// Accepts numeric or string identifiers
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Strings, or relation objects reduced to their slug / name
fn lenient_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(label_of(&value).unwrap_or_default())
}

/// Non-string media (an empty `{ "data": null }` relation) reads as no image
fn lenient_url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(label_of).collect(),
        Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => ["slug", "name", "username"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .map(|s| s.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_article_accepts_relation_shapes() {
        let article: Article = serde_json::from_value(json!({
            "id": 12,
            "title": "रामपुर में बारिश",
            "slug": "rampur-rain",
            "category": { "id": 3, "slug": "rampur", "name": "Rampur" },
            "author": { "username": "desk" },
            "tags": [{ "name": "मौसम" }, "बारिश"],
            "views": null,
            "publishedDate": "2026-01-02T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(article.id, "12");
        assert_eq!(article.category, "rampur");
        assert_eq!(article.author, "desk");
        assert_eq!(article.tags, vec!["मौसम", "बारिश"]);
        assert_eq!(article.views, None);
        assert_eq!(article.last_modified(), Some("2026-01-02T10:00:00Z"));
    }

    #[test]
    fn test_empty_media_reads_as_no_image() {
        for image in [json!({ "data": null }), json!([]), json!(""), Value::Null] {
            let article: Article = serde_json::from_value(json!({
                "id": "1", "title": "t", "slug": "t", "image": image
            }))
            .unwrap();
            assert_eq!(article.image, None);
        }
    }

    #[test]
    fn test_paginated_from_slice() {
        let page = Paginated::from_slice((1..=25).collect::<Vec<_>>(), 10, 10);
        assert_eq!(page.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_query_pairs_skip_unset() {
        let query = ArticleQuery {
            category: Some("crime".into()),
            featured: Some(true),
            ..Default::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("category".to_string(), "crime".to_string()),
                ("featured".to_string(), "true".to_string()),
            ]
        );
    }
}
