// Strapi REST query strings for the auxiliary collections
use url::form_urlencoded;

use crate::models::{ContentQuery, ContentType};

pub type QueryPairs = Vec<(String, String)>;

fn push(query: &mut QueryPairs, key: impl Into<String>, value: impl ToString) {
    query.push((key.into(), value.to_string()));
}

/// List query: live entries, counted pagination, filters and image population
pub fn build_list_query(content_type: ContentType, params: &ContentQuery) -> QueryPairs {
    let mut query = QueryPairs::new();

    push(&mut query, "publicationState", "live");
    push(&mut query, "pagination[withCount]", true);
    push(&mut query, "pagination[start]", params.offset());
    push(&mut query, "pagination[limit]", params.limit());

    if let Some(order_by) = params.order_by.as_deref().filter(|s| !s.is_empty()) {
        let order = params.order.as_deref().unwrap_or("desc");
        push(&mut query, "sort[0]", format!("{}:{}", order_by, order));
    }

    for (field, value) in params.equality_filters() {
        push(&mut query, format!("filters[{}][$eq]", field), value);
    }
    if let Some(featured) = params.featured {
        push(&mut query, "filters[isFeatured][$eq]", featured);
    }
    if let Some(popular) = params.popular {
        push(&mut query, "filters[isPopular][$eq]", popular);
    }
    if let Some(from) = params.date_from.as_deref() {
        push(&mut query, "filters[date][$gte]", from);
    }
    if let Some(to) = params.date_to.as_deref() {
        push(&mut query, "filters[date][$lte]", to);
    }

    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        for (index, field) in content_type.search_fields().iter().enumerate() {
            push(
                &mut query,
                format!("filters[$or][{}][{}][$containsi]", index, field),
                search,
            );
        }
    }

    push(&mut query, "populate[image]", "*");
    query
}

/// Single-entry lookup by slug with media and SEO populated
pub fn build_slug_query(slug: &str) -> QueryPairs {
    let mut query = QueryPairs::new();
    push(&mut query, "publicationState", "live");
    push(&mut query, "filters[slug][$eq]", slug);
    push(&mut query, "pagination[withCount]", false);
    push(&mut query, "pagination[start]", 0);
    push(&mut query, "pagination[limit]", 1);
    push(&mut query, "populate[image]", "*");
    push(&mut query, "populate[gallery]", "*");
    push(&mut query, "populate[seo]", "*");
    query
}

/// `?k=v&...`, or an empty string when there is nothing to encode
pub fn encode_query(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    format!("?{}", serializer.finish())
}
