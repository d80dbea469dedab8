// Strapi collection / single responses -> flat records
use serde_json::Value;

use super::normalize::normalize_entity;
use crate::models::Paginated;

/// Normalize `raw.data[]` and derive paging from `meta.pagination`
pub fn to_paginated(raw: &Value, origin: &str) -> Paginated<Value> {
    let data: Vec<Value> = raw
        .get("data")
        .and_then(|d| d.as_array())
        .map(|list| list.iter().map(|e| normalize_entity(e, origin)).collect())
        .unwrap_or_default();

    let pagination = raw.get("meta").and_then(|m| m.get("pagination"));
    let number = |key: &str| pagination.and_then(|p| p.get(key)).and_then(|v| v.as_u64());

    let count = data.len() as u64;
    let total = number("total").unwrap_or(count);
    let page_size = number("pageSize").unwrap_or(count);
    let page = number("page").unwrap_or(1);
    let total_pages = number("pageCount").unwrap_or_else(|| {
        if page_size > 0 {
            total.div_ceil(page_size).max(1)
        } else {
            1
        }
    });

    Paginated {
        data,
        total,
        page,
        page_size,
        total_pages,
    }
}

/// `raw.data` object or first element of `raw.data[]`, normalized
pub fn to_single(raw: &Value, origin: &str) -> Option<Value> {
    match raw.get("data") {
        Some(obj @ Value::Object(_)) => Some(normalize_entity(obj, origin)),
        Some(Value::Array(list)) => list
            .first()
            .filter(|f| f.is_object())
            .map(|f| normalize_entity(f, origin)),
        _ => None,
    }
}
