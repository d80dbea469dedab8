// In-process provider over the SQLite sample store
use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::{
    Article, ArticleQuery, Category, ContentItem, ContentQuery, ContentType, Paginated, Settings,
};
use crate::modules::db::ContentStore;

const DEFAULT_LIMIT: u64 = 10;

#[derive(Clone)]
pub struct MockProvider {
    store: Arc<ContentStore>,
}

impl MockProvider {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    // ===== Articles =====

    pub fn get_articles(&self, query: &ArticleQuery) -> AppResult<Paginated<Article>> {
        let mut articles: Vec<Article> = self
            .store
            .list_articles()?
            .into_iter()
            .filter(|a| article_matches(a, query))
            .collect();

        let descending = query.order.as_deref() != Some("asc");
        match query.order_by.as_deref() {
            Some("views") => articles.sort_by_key(|a| a.views.unwrap_or(0)),
            Some("title") => articles.sort_by(|a, b| a.title.cmp(&b.title)),
            _ => articles.sort_by(|a, b| {
                a.published_date
                    .as_deref()
                    .unwrap_or_default()
                    .cmp(b.published_date.as_deref().unwrap_or_default())
            }),
        }
        if descending {
            articles.reverse();
        }

        let limit = query.limit.map(u64::from).unwrap_or(DEFAULT_LIMIT);
        let offset = query.offset.map(u64::from).unwrap_or(0);
        Ok(Paginated::from_slice(articles, offset, limit))
    }

    pub fn get_article_by_id(&self, id: &str) -> AppResult<Option<Article>> {
        self.store.get_article(id)
    }

    pub fn get_article_by_slug(&self, slug: &str) -> AppResult<Option<Article>> {
        self.store.get_article_by_slug(slug)
    }

    pub fn create_article(&self, value: Value) -> AppResult<Article> {
        let Value::Object(mut fields) = value else {
            return Err(AppError::BadRequest("Article body must be an object".to_string()));
        };
        for required in ["title", "slug"] {
            let present = fields
                .get(required)
                .and_then(|v| v.as_str())
                .is_some_and(|s| !s.trim().is_empty());
            if !present {
                return Err(AppError::BadRequest(format!("Article {} is required", required)));
            }
        }

        let now = Utc::now().to_rfc3339();
        if !fields.contains_key("id") {
            fields.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        if !fields.contains_key("publishedDate") {
            fields.insert("publishedDate".into(), Value::String(now.clone()));
        }
        fields.insert("modifiedDate".into(), Value::String(now));

        let article: Article = serde_json::from_value(Value::Object(fields))?;
        self.store.insert_article(&article)?;
        Ok(article)
    }

    pub fn update_article(&self, id: &str, patch: Value) -> AppResult<Article> {
        let Value::Object(patch) = patch else {
            return Err(AppError::BadRequest("Article body must be an object".to_string()));
        };
        let current = self
            .store
            .get_article(id)?
            .ok_or_else(|| AppError::NotFound(format!("article {}", id)))?;

        let Value::Object(mut fields) = serde_json::to_value(&current)? else {
            return Err(AppError::Unknown("Article did not serialize to an object".to_string()));
        };
        for (key, value) in patch {
            if key != "id" {
                fields.insert(key, value);
            }
        }
        fields.insert("modifiedDate".into(), Value::String(Utc::now().to_rfc3339()));

        let article: Article = serde_json::from_value(Value::Object(fields))?;
        if !self.store.update_article(&article)? {
            return Err(AppError::NotFound(format!("article {}", id)));
        }
        Ok(article)
    }

    pub fn delete_article(&self, id: &str) -> AppResult<()> {
        if !self.store.delete_article(id)? {
            return Err(AppError::NotFound(format!("article {}", id)));
        }
        Ok(())
    }

    pub fn get_categories(&self) -> AppResult<Vec<Category>> {
        self.store.list_categories()
    }

    pub fn get_settings(&self) -> AppResult<Settings> {
        Ok(self.store.get_settings()?.unwrap_or_default())
    }

    // ===== Content items =====

    pub fn list_items(
        &self,
        content_type: ContentType,
        query: &ContentQuery,
    ) -> AppResult<Paginated<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .store
            .list_items(content_type)?
            .into_iter()
            .filter(|item| item_matches(content_type, item, query))
            .collect();

        if let Some(field) = query.order_by.as_deref() {
            items.sort_by(|a, b| compare_field(a, b, field));
            if query.order.as_deref() != Some("asc") {
                items.reverse();
            }
        }

        Ok(Paginated::from_slice(
            items,
            u64::from(query.offset()),
            u64::from(query.limit()),
        ))
    }

    pub fn get_item_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
    ) -> AppResult<Option<ContentItem>> {
        self.store.get_item_by_slug(content_type, slug)
    }

    pub fn create_item(&self, content_type: ContentType, value: Value) -> AppResult<ContentItem> {
        let Value::Object(mut fields) = value else {
            return Err(AppError::BadRequest("Item body must be an object".to_string()));
        };
        let has_slug = fields
            .get("slug")
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.trim().is_empty());
        if !has_slug {
            return Err(AppError::BadRequest("slug is required".to_string()));
        }
        if !fields.contains_key("id") {
            fields.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        }

        let item: ContentItem = serde_json::from_value(Value::Object(fields))?;
        self.store.insert_item(content_type, &item)?;
        Ok(item)
    }

    pub fn update_item(
        &self,
        content_type: ContentType,
        id: &str,
        patch: Value,
    ) -> AppResult<ContentItem> {
        let Value::Object(patch) = patch else {
            return Err(AppError::BadRequest("Item body must be an object".to_string()));
        };
        let mut item = self
            .store
            .get_item(content_type, id)?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", content_type, id)))?;
        item.merge(&patch);
        if !self.store.update_item(content_type, &item)? {
            return Err(AppError::NotFound(format!("{} {}", content_type, id)));
        }
        Ok(item)
    }

    pub fn delete_item(&self, content_type: ContentType, id: &str) -> AppResult<()> {
        if !self.store.delete_item(content_type, id)? {
            return Err(AppError::NotFound(format!("{} {}", content_type, id)));
        }
        Ok(())
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn article_matches(article: &Article, query: &ArticleQuery) -> bool {
    if let Some(category) = query.category.as_deref() {
        if article.category != category {
            return false;
        }
    }
    match query.status.as_deref() {
        Some("published") if !article.is_published() => return false,
        Some(status) if status != "published" && article.status.as_deref() != Some(status) => {
            return false
        }
        _ => {}
    }
    if query.featured.is_some_and(|f| article.is_featured != f) {
        return false;
    }
    if query.breaking.is_some_and(|b| article.is_breaking != b) {
        return false;
    }
    if let Some(author) = query.author.as_deref() {
        if article.author != author {
            return false;
        }
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        if !contains_ci(Some(&article.title), &needle)
            && !contains_ci(article.excerpt.as_deref(), &needle)
        {
            return false;
        }
    }
    true
}

fn item_matches(content_type: ContentType, item: &ContentItem, query: &ContentQuery) -> bool {
    for (field, expected) in query.equality_filters() {
        if item.str_field(field) != Some(expected) {
            return false;
        }
    }
    if query.featured.is_some_and(|f| item.flag("isFeatured") != f) {
        return false;
    }
    if query.popular.is_some_and(|p| item.flag("isPopular") != p) {
        return false;
    }

    let date_field = content_type.date_field().unwrap_or("date");
    let date = item.str_field(date_field).unwrap_or_default();
    // ISO dates compare correctly as strings
    if let Some(from) = query.date_from.as_deref() {
        if date.is_empty() || date < from {
            return false;
        }
    }
    if let Some(to) = query.date_to.as_deref() {
        // `2026-03-31T18:00` still falls on the `2026-03-31` bound
        let day = date.get(..to.len()).unwrap_or(date);
        if date.is_empty() || day > to {
            return false;
        }
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = content_type
            .search_fields()
            .iter()
            .any(|field| contains_ci(item.str_field(field), &needle));
        if !hit {
            return false;
        }
    }
    true
}

fn compare_field(a: &ContentItem, b: &ContentItem, field: &str) -> Ordering {
    let value = |item: &ContentItem| -> Option<Value> {
        if field == "slug" {
            return Some(Value::String(item.slug.clone()));
        }
        item.fields.get(field).cloned()
    };
    match (value(a), value(b)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn provider() -> MockProvider {
        let store = ContentStore::open_in_memory().unwrap();
        store.seed_if_empty().unwrap();
        MockProvider::new(Arc::new(store))
    }

    #[test]
    fn test_published_filter_hides_drafts() {
        let mock = provider();
        let all = mock.get_articles(&ArticleQuery::default().with_limit(100)).unwrap();
        let published = mock
            .get_articles(&ArticleQuery::published().with_limit(100))
            .unwrap();
        assert!(published.total < all.total);
        assert!(published.data.iter().all(|a| a.is_published()));
    }

    #[test]
    fn test_articles_sorted_and_paged() {
        let mock = provider();
        let query = ArticleQuery {
            order_by: Some("views".into()),
            limit: Some(2),
            ..Default::default()
        };
        let page = mock.get_articles(&query).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 2);
        assert!(page.data[0].views >= page.data[1].views);
        assert_eq!(page.total_pages, page.total.div_ceil(2));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let mock = provider();
        let first = mock.get_articles(&ArticleQuery::default()).unwrap().data[0].clone();
        let query = ArticleQuery {
            search: Some(first.title.to_uppercase()),
            ..Default::default()
        };
        let found = mock.get_articles(&query).unwrap();
        assert!(found.data.iter().any(|a| a.id == first.id));
    }

    #[test]
    fn test_create_article_validates_and_rejects_duplicate_slug() {
        let mock = provider();
        let err = mock.create_article(json!({ "title": "बिना स्लग" })).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let created = mock
            .create_article(json!({ "title": "नई खबर", "slug": "nayi-khabar", "category": "rampur" }))
            .unwrap();
        assert!(!created.id.is_empty());
        assert!(created.published_date.is_some());
        assert!(created.modified_date.is_some());

        let err = mock
            .create_article(json!({ "title": "दूसरी", "slug": "nayi-khabar" }))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_update_and_delete_article() {
        let mock = provider();
        let created = mock
            .create_article(json!({ "title": "A", "slug": "a-1" }))
            .unwrap();
        let updated = mock
            .update_article(&created.id, json!({ "id": "ignored", "title": "B" }))
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "B");
        assert_eq!(updated.slug, "a-1");

        mock.delete_article(&created.id).unwrap();
        assert!(matches!(
            mock.update_article(&created.id, json!({})).unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            mock.delete_article(&created.id).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_item_date_range_and_order() {
        let mock = provider();
        mock.create_item(
            ContentType::Holidays,
            json!({ "slug": "h-mar", "name": "March", "date": "2031-03-10" }),
        )
        .unwrap();
        mock.create_item(
            ContentType::Holidays,
            json!({ "slug": "h-mar-2", "name": "March 2", "date": "2031-03-02" }),
        )
        .unwrap();
        mock.create_item(
            ContentType::Holidays,
            json!({ "slug": "h-apr", "name": "April", "date": "2031-04-01" }),
        )
        .unwrap();

        let query = ContentQuery {
            date_from: Some("2031-03-01".into()),
            date_to: Some("2031-03-31".into()),
            order_by: Some("date".into()),
            order: Some("asc".into()),
            ..Default::default()
        };
        let page = mock.list_items(ContentType::Holidays, &query).unwrap();
        let slugs: Vec<&str> = page.data.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["h-mar-2", "h-mar"]);
    }

    #[test]
    fn test_item_flags_and_update() {
        let mock = provider();
        let created = mock
            .create_item(
                ContentType::Restaurants,
                json!({ "slug": "kebab-house", "name": "Kebab House", "isPopular": true, "city": "Rampur" }),
            )
            .unwrap();

        let query = ContentQuery {
            popular: Some(true),
            city: Some("Rampur".into()),
            search: Some("kebab".into()),
            ..Default::default()
        };
        let page = mock.list_items(ContentType::Restaurants, &query).unwrap();
        assert!(page.data.iter().any(|i| i.id == created.id));

        let updated = mock
            .update_item(ContentType::Restaurants, &created.id, json!({ "isPopular": false }))
            .unwrap();
        assert!(!updated.flag("isPopular"));
        assert!(mock.create_item(ContentType::Restaurants, json!({ "name": "x" })).is_err());
    }
}
