// Strapi entity normalization
//
// Flattens `{ id, attributes: {...} }` into a single record, resolves media
// references to absolute URLs and promotes SEO fields.
use serde_json::{Map, Value};

use crate::proxy::common::url::to_absolute_url;

/// Fields that carry media and are reduced to URLs instead of entities
const MEDIA_FIELDS: [&str; 2] = ["image", "gallery"];

pub fn normalize_entity(entity: &Value, origin: &str) -> Value {
    let source = match entity.get("attributes") {
        Some(Value::Object(attrs)) => attrs,
        _ => match entity.as_object() {
            Some(obj) => obj,
            None => return entity.clone(),
        },
    };

    let mut out = Map::new();
    out.insert("id".to_string(), Value::String(id_string(entity.get("id"))));
    for (key, value) in source {
        if key == "id" {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }

    if let Some(image) = out.get("image") {
        if let Some(url) = extract_media_url(image, origin) {
            out.insert("image".to_string(), Value::String(url));
        }
    }

    if let Some(gallery) = out.get("gallery") {
        if let Some(urls) = extract_media_urls(gallery, origin) {
            out.insert(
                "gallery".to_string(),
                Value::Array(urls.into_iter().map(Value::String).collect()),
            );
        }
    }

    if let Some(Value::Object(seo)) = out.get("seo").cloned() {
        let flat = flatten_seo(&seo, origin);
        promote_seo(&mut out, &flat);
        out.insert("seo".to_string(), Value::Object(flat));
    }

    for (key, value) in out.iter_mut() {
        if MEDIA_FIELDS.contains(&key.as_str()) || key == "seo" {
            continue;
        }
        if let Some(flattened) = flatten_relation(value, origin) {
            *value = flattened;
        }
    }

    Value::Object(out)
}

fn id_string(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// `{ data: ... }` relation envelopes become plain entities
fn flatten_relation(value: &Value, origin: &str) -> Option<Value> {
    let obj = value.as_object()?;
    let data = obj.get("data")?;
    if obj.keys().any(|k| k != "data" && k != "meta") {
        return None;
    }
    Some(match data {
        Value::Null => Value::Null,
        Value::Array(items) => {
            Value::Array(items.iter().map(|e| normalize_entity(e, origin)).collect())
        }
        Value::Object(_) => normalize_entity(data, origin),
        other => other.clone(),
    })
}

/// Resolve a single media reference
///
/// Accepts `{url}`, `{attributes:{url}}`, `{data:{...}}` and `{data:[...]}` (first
/// element), as well as a bare URL string.
pub fn extract_media_url(value: &Value, origin: &str) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(to_absolute_url(origin, s)),
        Value::Object(obj) => {
            if let Some(url) = obj.get("url").and_then(|v| v.as_str()) {
                return Some(to_absolute_url(origin, url));
            }
            if let Some(url) = obj
                .get("attributes")
                .and_then(|a| a.get("url"))
                .and_then(|v| v.as_str())
            {
                return Some(to_absolute_url(origin, url));
            }
            match obj.get("data") {
                Some(Value::Array(items)) => items.first().and_then(|f| extract_media_url(f, origin)),
                Some(nested @ Value::Object(_)) => extract_media_url(nested, origin),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Resolve a multi-media reference; `None` when nothing usable was found
pub fn extract_media_urls(value: &Value, origin: &str) -> Option<Vec<String>> {
    let urls: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|i| extract_media_url(i, origin))
            .collect(),
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|i| extract_media_url(i, origin))
                .collect(),
            Some(nested @ Value::Object(_)) => extract_media_url(nested, origin).into_iter().collect(),
            Some(_) => Vec::new(),
            None => extract_media_url(value, origin).into_iter().collect(),
        },
        _ => Vec::new(),
    };
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
}

/// `{ title, description, keywords, canonical, imageUrl }`, absent keys omitted
fn flatten_seo(seo: &Map<String, Value>, origin: &str) -> Map<String, Value> {
    let mut flat = Map::new();
    if let Some(title) = first_str(seo, &["title", "metaTitle"]) {
        flat.insert("title".to_string(), Value::String(title.to_string()));
    }
    if let Some(description) = first_str(seo, &["description", "metaDescription"]) {
        flat.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }
    let keywords: Option<Vec<String>> = match seo.get("keywords") {
        Some(Value::String(s)) => Some(
            s.split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        ),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        ),
        _ => None,
    };
    if let Some(keywords) = keywords {
        flat.insert(
            "keywords".to_string(),
            Value::Array(keywords.into_iter().map(Value::String).collect()),
        );
    }
    if let Some(canonical) = first_str(seo, &["canonical", "canonicalURL"]) {
        flat.insert("canonical".to_string(), Value::String(canonical.to_string()));
    }
    let image = seo
        .get("image")
        .filter(|v| !v.is_null())
        .or_else(|| seo.get("metaImage"));
    if let Some(url) = image.and_then(|i| extract_media_url(i, origin)) {
        flat.insert("imageUrl".to_string(), Value::String(url));
    }
    flat
}

fn promote_seo(out: &mut Map<String, Value>, flat: &Map<String, Value>) {
    for (from, to) in [("title", "seoTitle"), ("description", "seoDescription")] {
        let already_set = out
            .get(to)
            .map(|v| !v.is_null() && v.as_str() != Some(""))
            .unwrap_or(false);
        if already_set {
            continue;
        }
        if let Some(value) = flat.get(from) {
            out.insert(to.to_string(), value.clone());
        }
    }
}
