use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::article::lenient_id;

/// Auxiliary content collections kept next to the articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Exams,
    Results,
    Institutions,
    Holidays,
    Restaurants,
    FashionStores,
    ShoppingCentres,
    Places,
    Events,
}

impl ContentType {
    pub const ALL: [ContentType; 9] = [
        ContentType::Exams,
        ContentType::Results,
        ContentType::Institutions,
        ContentType::Holidays,
        ContentType::Restaurants,
        ContentType::FashionStores,
        ContentType::ShoppingCentres,
        ContentType::Places,
        ContentType::Events,
    ];

    /// Collection segment in the upstream REST API
    pub fn segment(&self) -> &'static str {
        match self {
            ContentType::Exams => "exams",
            ContentType::Results => "results",
            ContentType::Institutions => "institutions",
            ContentType::Holidays => "holidays",
            ContentType::Restaurants => "restaurants",
            ContentType::FashionStores => "fashion-stores",
            ContentType::ShoppingCentres => "shopping-centres",
            ContentType::Places => "places",
            ContentType::Events => "events",
        }
    }

    /// `moduleType` discriminator used by generic REST backends
    pub fn module_type(&self) -> &'static str {
        match self {
            ContentType::Exams => "exam",
            ContentType::Results => "result",
            ContentType::Institutions => "institution",
            ContentType::Holidays => "holiday",
            ContentType::Restaurants => "restaurant",
            ContentType::FashionStores => "fashion-store",
            ContentType::ShoppingCentres => "shopping-centre",
            ContentType::Places => "famous-place",
            ContentType::Events => "event",
        }
    }

    /// Accepts the REST segment, the camelCase key or the module type
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().trim_matches('/');
        Self::ALL.into_iter().find(|ct| {
            ct.segment() == v
                || ct.module_type() == v
                || ct.segment().replace('-', "").eq_ignore_ascii_case(v)
        })
    }

    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            ContentType::Exams | ContentType::Results => {
                &["titleHindi", "title", "organizationHindi", "organization"]
            }
            ContentType::Institutions => &["nameHindi", "name", "city", "district", "state"],
            ContentType::Holidays => &["nameHindi", "name", "descriptionHindi", "description"],
            ContentType::Restaurants
            | ContentType::FashionStores
            | ContentType::ShoppingCentres
            | ContentType::Places => &[
                "nameHindi",
                "name",
                "city",
                "district",
                "descriptionHindi",
                "description",
            ],
            ContentType::Events => &[
                "titleHindi",
                "title",
                "city",
                "district",
                "venueHindi",
                "venue",
                "descriptionHindi",
                "description",
            ],
        }
    }

    /// Field placing an item on the calendar
    pub fn date_field(&self) -> Option<&'static str> {
        match self {
            ContentType::Exams => Some("examDate"),
            ContentType::Results => Some("resultDate"),
            ContentType::Holidays | ContentType::Events => Some("date"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.segment())
    }
}

/// Flat record of any auxiliary collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentItem {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// English display name (`title` for exams/events, `name` elsewhere)
    pub fn display_title(&self) -> &str {
        self.str_field("title")
            .or_else(|| self.str_field("name"))
            .unwrap_or_default()
    }

    pub fn display_title_hindi(&self) -> &str {
        self.str_field("titleHindi")
            .or_else(|| self.str_field("nameHindi"))
            .unwrap_or_else(|| self.display_title())
    }

    /// Shallow merge of `patch` into the record; `id` is immutable
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            match key.as_str() {
                "id" => {}
                "slug" => {
                    if let Some(slug) = value.as_str() {
                        self.slug = slug.to_string();
                    }
                }
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// Filters shared by all auxiliary collections
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub status: Option<String>,
    pub application_status: Option<String>,
    pub result_status: Option<String>,
    pub featured: Option<bool>,
    pub popular: Option<bool>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub order_by: Option<String>,
    pub order: Option<String>,
}

impl ContentQuery {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Equality filters as `(field, expected)` pairs
    pub fn equality_filters(&self) -> Vec<(&'static str, &str)> {
        [
            ("category", self.category.as_deref()),
            ("subcategory", self.subcategory.as_deref()),
            ("type", self.kind.as_deref()),
            ("city", self.city.as_deref()),
            ("district", self.district.as_deref()),
            ("status", self.status.as_deref()),
            ("applicationStatus", self.application_status.as_deref()),
            ("resultStatus", self.result_status.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.filter(|v| !v.is_empty()).map(|v| (field, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarEntryType {
    Exam,
    Result,
    Holiday,
    Event,
}

/// One entry of the combined month calendar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub title_hindi: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: CalendarEntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub color: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
