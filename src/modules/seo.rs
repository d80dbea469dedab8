// Deterministic SEO signals for articles
//
// Every score takes the reference time explicitly, so the same article and the
// same `now` always produce the same signals.
use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::Article;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid script pattern"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid style pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space pattern"));
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{M}\p{N}\s-]+").expect("valid token pattern"));
static HINDI_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\p{Devanagari}{2,}(?:\s+\p{Devanagari}{2,}){0,2}").expect("valid hindi pattern")
});
static PROPER_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2}\b").expect("valid proper noun pattern")
});

const GEO_TOKENS: [&str; 8] = [
    "रामपुर",
    "Rampur",
    "उत्तर प्रदेश",
    "यूपी",
    "Uttar Pradesh",
    "UP",
    "भारत",
    "India",
];

const ORG_HINTS: [&str; 8] = [
    "सरकार", "पुलिस", "कोर्ट", "न्यायालय", "मंत्रालय", "विभाग", "कमेटी", "संगठन",
];

const ORG_PHRASE_HINTS: [&str; 4] = ["सरकार", "पुलिस", "कोर्ट", "मंत्रालय"];

const STOPWORDS: [&str; 33] = [
    "और", "का", "की", "के", "में", "से", "पर", "को", "लिए", "यह", "वह", "था", "थे", "है", "हैं",
    "ने", "भी", "तो", "कि", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "the", "to",
];

const BRAND_KEYWORDS: [&str; 2] = ["Rampur News", "रामपुर न्यूज़"];

pub const VALID_NEWS_CATEGORIES: [&str; 13] = [
    "rampur",
    "up",
    "national",
    "politics",
    "crime",
    "education-jobs",
    "business",
    "entertainment",
    "sports",
    "health",
    "religion-culture",
    "food-lifestyle",
    "nearby",
];

/// Hindi label of a news category slug; unknown slugs are returned as is
pub fn category_hindi(category: &str) -> &str {
    match category {
        "rampur" => "रामपुर",
        "up" => "उत्तर प्रदेश",
        "national" => "देश",
        "politics" => "राजनीति",
        "crime" => "अपराध",
        "education-jobs" => "शिक्षा और नौकरियां",
        "business" => "व्यापार",
        "entertainment" => "मनोरंजन",
        "sports" => "खेल",
        "health" => "स्वास्थ्य",
        "religion-culture" => "धर्म-संस्कृति",
        "food-lifestyle" => "खान-पान और जीवनशैली",
        "nearby" => "आस-पास",
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityType {
    Person,
    Place,
    Organization,
    Thing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub score: f64,
}

impl SeoEntity {
    fn new(name: &str, entity_type: EntityType, score: f64) -> Self {
        Self {
            name: name.to_string(),
            entity_type,
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Rampur,
    Up,
    India,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRelevance {
    pub region: Region,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoSignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_entity: Option<SeoEntity>,
    pub mentions: Vec<SeoEntity>,
    pub keywords: Vec<String>,
    pub read_time_minutes: u32,
    pub freshness_score: f64,
    pub trending_score: f64,
    pub geo_relevance: GeoRelevance,
}

/// Article fields the signals are derived from
#[derive(Debug, Clone, Default)]
pub struct SeoInput<'a> {
    pub title: &'a str,
    pub excerpt: Option<&'a str>,
    pub content: Option<&'a str>,
    pub category: Option<&'a str>,
    pub category_hindi: Option<&'a str>,
    pub tags: &'a [String],
    pub views: Option<u64>,
    pub published_date: Option<&'a str>,
    pub modified_date: Option<&'a str>,
}

impl<'a> From<&'a Article> for SeoInput<'a> {
    fn from(article: &'a Article) -> Self {
        let category = Some(article.category.as_str()).filter(|c| !c.is_empty());
        Self {
            title: &article.title,
            excerpt: article.excerpt.as_deref(),
            content: article.content.as_deref(),
            category,
            category_hindi: category.map(category_hindi),
            tags: &article.tags,
            views: article.views,
            published_date: article.published_date.as_deref(),
            modified_date: article.modified_date.as_deref(),
        }
    }
}

pub fn strip_html_to_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let text = SCRIPT_BLOCK.replace_all(input, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Clip to `max_chars`, preferring a word boundary within the last 30 characters
pub fn truncate_text(input: &str, max_chars: usize) -> String {
    let text = input.trim();
    if text.is_empty() {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_chars).collect();
    let last_space = clipped
        .char_indices()
        .filter(|(_, c)| *c == ' ')
        .map(|(i, _)| (i, clipped[..i].chars().count()))
        .last();
    match last_space {
        Some((byte_idx, char_idx)) if char_idx >= max_chars.saturating_sub(30) => {
            format!("{}…", clipped[..byte_idx].trim())
        }
        _ => format!("{}…", clipped.trim()),
    }
}

/// 200 words per minute, at least one minute
pub fn compute_read_time_minutes(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u32;
    words.div_ceil(200).max(1)
}

/// ISO-8601 timestamp or plain date
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn age_hours(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds() as f64 / 3_600_000.0
}

pub fn compute_freshness_score(
    published: Option<&str>,
    modified: Option<&str>,
    now: DateTime<Utc>,
) -> f64 {
    let basis = modified.filter(|m| !m.is_empty()).or(published).unwrap_or_default();
    let Some(at) = parse_timestamp(basis) else {
        return 0.0;
    };
    let age = age_hours(at, now).max(0.0);
    match age {
        a if a <= 6.0 => 1.0,
        a if a <= 24.0 => 0.85,
        a if a <= 72.0 => 0.65,
        a if a <= 168.0 => 0.45,
        a if a <= 720.0 => 0.2,
        _ => 0.1,
    }
}

pub fn compute_trending_score(views: Option<u64>, published: Option<&str>, now: DateTime<Utc>) -> f64 {
    let views = views.unwrap_or(0) as f64;
    let Some(at) = published.and_then(parse_timestamp) else {
        return if views > 0.0 { 0.2 } else { 0.0 };
    };
    let age = age_hours(at, now).max(1.0);
    let velocity = views / age;
    if age <= 6.0 && views >= 200.0 {
        1.0
    } else if age <= 24.0 && views >= 500.0 {
        0.9
    } else if velocity >= 100.0 {
        0.85
    } else if velocity >= 40.0 {
        0.65
    } else if velocity >= 15.0 {
        0.45
    } else if views >= 100.0 {
        0.3
    } else {
        0.1
    }
}

fn geo_relevance(corpus: &str, category: Option<&str>) -> GeoRelevance {
    let has = |token: &str| corpus.contains(token);
    if has("रामपुर") || has("Rampur") || category == Some("rampur") {
        return GeoRelevance {
            region: Region::Rampur,
            score: 1.0,
        };
    }
    if has("उत्तर प्रदेश") || has("यूपी") || has("Uttar Pradesh") || category == Some("up") {
        return GeoRelevance {
            region: Region::Up,
            score: 0.7,
        };
    }
    if has("भारत") || has("India") {
        return GeoRelevance {
            region: Region::India,
            score: 0.45,
        };
    }
    let hits = GEO_TOKENS.iter().filter(|t| has(t)).count() as f64;
    GeoRelevance {
        region: Region::Unknown,
        score: (hits * 0.1).min(0.35),
    }
}

/// Order-preserving, case-insensitive de-duplication
fn unique_ci(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

fn token_keywords(text: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, " ");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");
    cleaned
        .trim()
        .split(' ')
        .filter(|t| t.chars().count() >= 3)
        .filter(|t| !STOPWORDS.contains(&t.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

fn matches_of(pattern: &Regex, text: &str) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

fn extract_entities(title: &str, corpus: &str, input: &SeoInput<'_>) -> Vec<SeoEntity> {
    let mut raw = Vec::new();

    for phrase in unique_ci(matches_of(&HINDI_PHRASE, title)).into_iter().take(8) {
        let entity_type = if ORG_PHRASE_HINTS.iter().any(|h| phrase.contains(h)) {
            EntityType::Organization
        } else if GEO_TOKENS.contains(&phrase.as_str()) {
            EntityType::Place
        } else {
            EntityType::Thing
        };
        raw.push(SeoEntity::new(&phrase, entity_type, 0.6));
    }

    for noun in unique_ci(matches_of(&PROPER_NOUN, title)).into_iter().take(6) {
        raw.push(SeoEntity::new(&noun, EntityType::Person, 0.55));
    }

    for token in GEO_TOKENS.iter().filter(|t| corpus.contains(*t)) {
        raw.push(SeoEntity::new(token, EntityType::Place, 0.7));
    }

    if let Some(hindi) = input.category_hindi.filter(|c| !c.is_empty()) {
        raw.push(SeoEntity::new(hindi, EntityType::Thing, 0.45));
    }
    if let Some(category) = input.category.filter(|c| !c.is_empty()) {
        raw.push(SeoEntity::new(category, EntityType::Thing, 0.35));
    }
    for tag in input.tags.iter().take(8) {
        raw.push(SeoEntity::new(tag, EntityType::Thing, 0.4));
    }

    // highest score first; a name seen again later is a weaker duplicate
    raw.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|e| e.name.chars().count() >= 2)
        .filter(|e| seen.insert(e.name.to_lowercase()))
        .collect()
}

pub fn derive_seo_signals(input: &SeoInput<'_>, now: DateTime<Utc>) -> SeoSignals {
    let title = input.title;
    let source = input
        .content
        .filter(|c| !c.is_empty())
        .or(input.excerpt)
        .unwrap_or_default();
    let body = strip_html_to_text(source);
    let corpus = format!("{} {}", title, body).trim().to_string();

    let read_time_minutes = compute_read_time_minutes(&corpus);
    let freshness_score = compute_freshness_score(input.published_date, input.modified_date, now);
    let trending_score = compute_trending_score(input.views, input.published_date, now);
    let geo_relevance = geo_relevance(&corpus, input.category);

    let entities = extract_entities(title, &corpus, input);
    let has_org_hint = ORG_HINTS.iter().any(|h| corpus.contains(h));

    let primary_entity = entities.first().cloned().map(|primary| {
        if has_org_hint && primary.entity_type == EntityType::Place {
            SeoEntity {
                entity_type: EntityType::Organization,
                score: (primary.score + 0.15).min(1.0),
                ..primary
            }
        } else {
            primary
        }
    });

    let mentions: Vec<SeoEntity> = entities
        .iter()
        .filter(|e| primary_entity.as_ref().map_or(true, |p| p.name != e.name))
        .take(8)
        .cloned()
        .collect();

    let mut candidates: Vec<String> = Vec::new();
    candidates.extend(input.category_hindi.filter(|c| !c.is_empty()).map(str::to_string));
    candidates.extend(input.category.filter(|c| !c.is_empty()).map(str::to_string));
    candidates.extend(token_keywords(title).into_iter().take(12));
    candidates.extend(token_keywords(&body).into_iter().take(20));
    candidates.extend(primary_entity.iter().map(|p| p.name.clone()));
    candidates.extend(mentions.iter().map(|m| m.name.clone()));
    candidates.extend(BRAND_KEYWORDS.iter().map(|k| k.to_string()));

    let keywords = unique_ci(candidates)
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .take(30)
        .collect();

    SeoSignals {
        primary_entity,
        mentions,
        keywords,
        read_time_minutes,
        freshness_score,
        trending_score,
        geo_relevance,
    }
}
