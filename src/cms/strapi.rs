// Strapi-backed provider
use std::sync::Arc;

use axum::http::Method;
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::debug;

use super::config::CmsConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Article, ArticleQuery, Category, ContentItem, ContentQuery, ContentType, Paginated, Settings,
};
use crate::proxy::common::url::{join_segments, normalize_strapi_api_url, origin_of};
use crate::proxy::mappers::strapi::{
    build_list_query, build_slug_query, encode_query, normalize_entity, rewrite_request,
    to_paginated, to_single, wrap_value, ArticleWriteMode,
};
use crate::proxy::upstream::{NotFound, UpstreamClient};

#[derive(Clone)]
pub struct StrapiProvider {
    client: Arc<UpstreamClient>,
    base_url: String,
    origin: String,
    api_token: Option<String>,
    write_token: Option<String>,
    /// JWT of the admin user on whose behalf writes are made
    user_jwt: Option<String>,
    write_mode: ArticleWriteMode,
}

/// Statuses after which the admin endpoint is abandoned for the public one
fn admin_unavailable(err: &AppError) -> bool {
    matches!(err.upstream_status(), Some(401 | 403 | 404)) || err.is_transport()
}

fn is_denied(err: &AppError) -> bool {
    matches!(err.upstream_status(), Some(401 | 403))
}

impl StrapiProvider {
    pub fn new(client: Arc<UpstreamClient>, config: &CmsConfig) -> Self {
        let base_url = normalize_strapi_api_url(&config.base_url);
        Self {
            origin: origin_of(&base_url),
            base_url,
            client,
            api_token: config.api_token().map(str::to_string),
            write_token: config.write_token().map(str::to_string),
            user_jwt: None,
            write_mode: config.article_write_mode,
        }
    }

    pub fn with_user_jwt(&self, user_jwt: Option<&str>) -> Self {
        Self {
            user_jwt: user_jwt.filter(|t| !t.is_empty()).map(str::to_string),
            ..self.clone()
        }
    }

    fn url(&self, segments: &[&str], query: &[(String, String)]) -> AppResult<String> {
        Ok(format!(
            "{}{}",
            join_segments(&self.base_url, segments)?,
            encode_query(query)
        ))
    }

    /// Server write token, else the acting user's JWT; the read token never writes
    fn write_credential(&self) -> Option<&str> {
        self.write_token.as_deref().or(self.user_jwt.as_deref())
    }

    /// Admin endpoint first, then the public endpoint anonymously, then the
    /// public endpoint with the server token
    async fn read_with_fallback(
        &self,
        admin_url: &str,
        public_url: &str,
    ) -> AppResult<Option<Value>> {
        let token = self.api_token.as_deref();
        match self
            .client
            .fetch_json(Method::GET, admin_url, token, None, NotFound::Error)
            .await
        {
            Ok(value) => return Ok(value),
            Err(e) if admin_unavailable(&e) => {
                debug!("Admin article endpoint unavailable ({}), using public", e);
            }
            Err(e) => return Err(e),
        }

        match self.client.get_json(public_url, None).await {
            Err(e) if token.is_some() && is_denied(&e) => {
                self.client.get_json(public_url, token).await
            }
            other => other,
        }
    }

    /// GET without credentials, retried with the server token on 401/403
    async fn public_read(&self, url: &str) -> AppResult<Option<Value>> {
        match self.client.get_json(url, None).await {
            Err(e) if self.api_token.is_some() && is_denied(&e) => {
                self.client.get_json(url, self.api_token.as_deref()).await
            }
            other => other,
        }
    }

    fn article(&self, value: &Value) -> AppResult<Article> {
        article_from_value(value, &self.origin)
    }

    fn single_article(&self, raw: Option<Value>) -> AppResult<Option<Article>> {
        let Some(raw) = raw else { return Ok(None) };
        let entity = match raw.get("data") {
            Some(_) => to_single(&raw, &self.origin),
            None if raw.is_object() => Some(raw),
            None => None,
        };
        entity.map(|e| self.article(&e)).transpose()
    }

    // ===== Articles =====

    pub async fn get_articles(&self, query: &ArticleQuery) -> AppResult<Paginated<Article>> {
        let pairs = query.to_pairs();
        let admin_url = self.url(&["articles", "admin"], &pairs)?;
        let public_url = self.url(&["articles"], &pairs)?;

        let Some(raw) = self.read_with_fallback(&admin_url, &public_url).await? else {
            return Ok(Paginated::empty(query.limit.map(u64::from).unwrap_or(10)));
        };

        // Custom admin routes answer with a ready page, core routes with a collection
        let page = if raw.get("total").is_some() {
            serde_json::from_value::<Paginated<Value>>(raw)?
        } else {
            to_paginated(&raw, &self.origin)
        };
        page.try_map(|v| self.article(&v))
    }

    pub async fn get_article_by_id(&self, id: &str) -> AppResult<Option<Article>> {
        let admin_url = self.url(&["articles", "admin", id], &[])?;
        let public_url = self.url(&["articles", id], &[])?;
        let raw = self.read_with_fallback(&admin_url, &public_url).await?;
        self.single_article(raw)
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> AppResult<Option<Article>> {
        let admin_url = self.url(&["articles", "admin", "slug", slug], &[])?;
        let public_url = self.url(&["articles", "slug", slug], &[])?;
        let raw = self.read_with_fallback(&admin_url, &public_url).await?;
        self.single_article(raw)
    }

    async fn write_article(&self, method: Method, id: Option<&str>, body: &Value) -> AppResult<Option<Value>> {
        let path = match id {
            Some(id) => format!("articles/{}", id),
            None => "articles".to_string(),
        };
        let bytes = if method == Method::DELETE {
            Bytes::new()
        } else {
            Bytes::from(serde_json::to_vec(body)?)
        };
        let rewritten = rewrite_request(&method, &path, bytes, true, self.write_mode);
        let url = rewritten.target.url(&self.base_url, &self.origin)?;
        let payload: Option<Value> = if rewritten.body.is_empty() {
            None
        } else {
            Some(serde_json::from_slice(&rewritten.body)?)
        };

        self.client
            .fetch_json(
                rewritten.method,
                &url,
                self.write_credential(),
                payload.as_ref(),
                NotFound::Error,
            )
            .await
    }

    pub async fn create_article(&self, value: Value) -> AppResult<Article> {
        let raw = self.write_article(Method::POST, None, &value).await?;
        self.single_article(raw)?
            .ok_or_else(|| AppError::Unknown("Failed to create article".to_string()))
    }

    pub async fn update_article(&self, id: &str, value: Value) -> AppResult<Article> {
        let raw = self.write_article(Method::PUT, Some(id), &value).await?;
        self.single_article(raw)?
            .ok_or_else(|| AppError::Unknown("Failed to update article".to_string()))
    }

    pub async fn delete_article(&self, id: &str) -> AppResult<()> {
        self.write_article(Method::DELETE, Some(id), &Value::Null)
            .await
            .map(|_| ())
    }

    pub async fn get_categories(&self) -> AppResult<Vec<Category>> {
        let url = self.url(&["categories"], &[])?;
        let Some(raw) = self.public_read(&url).await? else {
            return Ok(Vec::new());
        };
        let list = match raw.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => raw.as_array().cloned().unwrap_or_default(),
        };
        list.iter()
            .map(|entry| {
                serde_json::from_value(normalize_entity(entry, &self.origin)).map_err(AppError::from)
            })
            .collect()
    }

    pub async fn get_settings(&self) -> AppResult<Settings> {
        let url = self.url(&["settings"], &[])?;
        let Some(raw) = self.public_read(&url).await? else {
            return Ok(Settings::default());
        };
        let entity = match raw.get("data") {
            Some(_) => to_single(&raw, &self.origin),
            None => Some(raw),
        };
        match entity {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Settings::default()),
        }
    }

    // ===== Content items =====

    pub async fn list_items(
        &self,
        content_type: ContentType,
        query: &ContentQuery,
    ) -> AppResult<Paginated<ContentItem>> {
        let url = self.url(&[content_type.segment()], &build_list_query(content_type, query))?;
        let Some(raw) = self
            .client
            .get_json(&url, self.api_token.as_deref())
            .await?
        else {
            return Ok(Paginated::empty(u64::from(query.limit())));
        };

        Ok(to_paginated(&raw, &self.origin).try_map(serde_json::from_value::<ContentItem>)?)
    }

    pub async fn get_item_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
    ) -> AppResult<Option<ContentItem>> {
        let url = self.url(&[content_type.segment()], &build_slug_query(slug))?;
        let raw = self
            .client
            .get_json(&url, self.api_token.as_deref())
            .await?;
        raw.and_then(|r| to_single(&r, &self.origin))
            .map(|v| serde_json::from_value(v).map_err(AppError::from))
            .transpose()
    }

    async fn write_item(
        &self,
        method: Method,
        content_type: ContentType,
        id: Option<&str>,
        body: Option<Value>,
    ) -> AppResult<Option<Value>> {
        let mut segments = vec![content_type.segment()];
        segments.extend(id);
        let url = self.url(&segments, &[])?;
        let payload = body.map(|b| wrap_value(if b.is_null() { Value::Object(Map::new()) } else { b }));
        self.client
            .fetch_json(method, &url, self.write_credential(), payload.as_ref(), NotFound::Error)
            .await
    }

    fn written_item(&self, raw: Option<Value>, action: &str) -> AppResult<ContentItem> {
        let entity = raw
            .and_then(|r| to_single(&r, &self.origin))
            .ok_or_else(|| AppError::Unknown(format!("Failed to {} item", action)))?;
        Ok(serde_json::from_value(entity)?)
    }

    pub async fn create_item(&self, content_type: ContentType, value: Value) -> AppResult<ContentItem> {
        let raw = self
            .write_item(Method::POST, content_type, None, Some(value))
            .await?;
        self.written_item(raw, "create")
    }

    pub async fn update_item(
        &self,
        content_type: ContentType,
        id: &str,
        value: Value,
    ) -> AppResult<ContentItem> {
        let raw = self
            .write_item(Method::PUT, content_type, Some(id), Some(value))
            .await?;
        self.written_item(raw, "update")
    }

    pub async fn delete_item(&self, content_type: ContentType, id: &str) -> AppResult<()> {
        self.write_item(Method::DELETE, content_type, Some(id), None)
            .await
            .map(|_| ())
    }

    /// Cheap reachability check used at startup
    pub async fn probe(&self) -> AppResult<()> {
        let url = self.url(&["categories"], &[("pagination[limit]".to_string(), "1".to_string())])?;
        self.public_read(&url).await.map(|_| ())
    }
}

/// Flatten a Strapi article and map its system timestamps
pub fn article_from_value(value: &Value, origin: &str) -> AppResult<Article> {
    let mut normalized = normalize_entity(value, origin);
    if let Value::Object(obj) = &mut normalized {
        for (system, field) in [("publishedAt", "publishedDate"), ("updatedAt", "modifiedDate")] {
            let missing = obj.get(field).map_or(true, Value::is_null);
            if missing {
                if let Some(ts) = obj.get(system).cloned() {
                    obj.insert(field.to_string(), ts);
                }
            }
        }
    }
    Ok(serde_json::from_value(normalized)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, token: Option<&str>) -> StrapiProvider {
        let config = CmsConfig {
            base_url: format!("{}/api", server.uri()),
            api_token: token.map(str::to_string),
            ..Default::default()
        };
        StrapiProvider::new(Arc::new(UpstreamClient::new(5, None)), &config)
    }

    fn strapi_article(id: u64, slug: &str) -> Value {
        json!({
            "id": id,
            "attributes": {
                "title": "रामपुर समाचार",
                "slug": slug,
                "category": "rampur",
                "publishedAt": "2026-03-01T10:00:00.000Z",
                "image": { "data": { "attributes": { "url": "/uploads/a.jpg" } } }
            }
        })
    }

    #[tokio::test]
    async fn test_admin_endpoint_used_when_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/admin"))
            .and(header("authorization", "Bearer read-token"))
            .and(query_param("status", "published"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "9", "title": "T", "slug": "t" }],
                "total": 1, "page": 1, "pageSize": 10, "totalPages": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = provider(&server, Some("read-token"))
            .get_articles(&ArticleQuery::published())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, "9");
    }

    #[tokio::test]
    async fn test_falls_back_to_public_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/admin"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [strapi_article(4, "barish")],
                "meta": { "pagination": { "page": 1, "pageSize": 10, "pageCount": 1, "total": 1 } }
            })))
            .mount(&server)
            .await;

        let page = provider(&server, None)
            .get_articles(&ArticleQuery::default())
            .await
            .unwrap();
        let article = &page.data[0];
        assert_eq!(article.id, "4");
        assert_eq!(article.published_date.as_deref(), Some("2026-03-01T10:00:00.000Z"));
        assert_eq!(
            article.image.as_deref(),
            Some(format!("{}/uploads/a.jpg", server.uri()).as_str())
        );
    }

    #[tokio::test]
    async fn test_article_without_image_still_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "id": 5,
                        "attributes": {
                            "title": "बिना फोटो",
                            "slug": "no-photo",
                            "image": { "data": null },
                            "gallery": { "data": null }
                        }
                    },
                    strapi_article(6, "with-photo")
                ],
                "meta": { "pagination": { "page": 1, "pageSize": 10, "pageCount": 1, "total": 2 } }
            })))
            .mount(&server)
            .await;

        let page = provider(&server, None)
            .get_articles(&ArticleQuery::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].slug, "no-photo");
        assert_eq!(page.data[0].image, None);
        assert!(page.data[1].image.is_some());
    }

    #[tokio::test]
    async fn test_bare_origin_base_url_gets_api_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 8, "attributes": { "slug": "mela", "title": "Mela" } }],
                "meta": { "pagination": { "page": 1, "pageSize": 10, "pageCount": 1, "total": 1 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = CmsConfig {
            base_url: format!("{}/", server.uri()),
            ..Default::default()
        };
        let page = StrapiProvider::new(Arc::new(UpstreamClient::new(5, None)), &config)
            .list_items(ContentType::Events, &ContentQuery::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, "8");
    }

    #[tokio::test]
    async fn test_public_retried_with_token_when_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/admin/slug/barish"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/articles/slug/barish"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": strapi_article(4, "barish")
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/articles/slug/barish"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let article = provider(&server, Some("tok"))
            .get_article_by_slug("barish")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(article.slug, "barish");
    }

    #[tokio::test]
    async fn test_admin_server_error_is_not_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/admin/1"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": { "message": "boom" } })),
            )
            .mount(&server)
            .await;

        let err = provider(&server, None)
            .get_article_by_id("1")
            .await
            .unwrap_err();
        assert_eq!(err.upstream_status(), Some(500));
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_missing_article_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles/admin/77"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/articles/77"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(provider(&server, None)
            .get_article_by_id("77")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_items_uses_query_builder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fashion-stores"))
            .and(query_param("publicationState", "live"))
            .and(query_param("filters[city][$eq]", "Rampur"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 3, "attributes": { "slug": "silk-house", "name": "Silk House" } }],
                "meta": { "pagination": { "page": 1, "pageSize": 10, "pageCount": 1, "total": 1 } }
            })))
            .mount(&server)
            .await;

        let query = ContentQuery {
            city: Some("Rampur".into()),
            ..Default::default()
        };
        let page = provider(&server, None)
            .list_items(ContentType::FashionStores, &query)
            .await
            .unwrap();
        assert_eq!(page.data[0].id, "3");
        assert_eq!(page.data[0].display_title(), "Silk House");
    }

    #[tokio::test]
    async fn test_item_write_is_enveloped_with_write_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/events/5"))
            .and(header("authorization", "Bearer writer"))
            .and(body_json(json!({ "data": { "status": "completed" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "id": 5, "attributes": { "slug": "mela", "status": "completed" } }
            })))
            .mount(&server)
            .await;

        let config = CmsConfig {
            base_url: format!("{}/api", server.uri()),
            api_token: Some("reader".into()),
            write_token: Some("writer".into()),
            ..Default::default()
        };
        let strapi = StrapiProvider::new(Arc::new(UpstreamClient::new(5, None)), &config);
        let item = strapi
            .update_item(ContentType::Events, "5", json!({ "status": "completed" }))
            .await
            .unwrap();
        assert_eq!(item.str_field("status"), Some("completed"));
    }

    #[tokio::test]
    async fn test_delete_uses_user_jwt_not_read_token() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/places/2"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server, Some("read-only"))
            .with_user_jwt(Some("user-jwt"))
            .delete_item(ContentType::Places, "2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_article_update_in_content_manager_mode() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/content-manager/collection-types/api::article.article/8"))
            .and(body_json(json!({ "title": "New" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "id": 8, "title": "New", "slug": "n" })),
            )
            .mount(&server)
            .await;

        let config = CmsConfig {
            base_url: format!("{}/api", server.uri()),
            article_write_mode: ArticleWriteMode::ContentManager,
            ..Default::default()
        };
        let strapi = StrapiProvider::new(Arc::new(UpstreamClient::new(5, None)), &config);
        let article = strapi.update_article("8", json!({ "title": "New" })).await.unwrap();
        assert_eq!(article.title, "New");
    }

    #[tokio::test]
    async fn test_settings_default_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let settings = provider(&server, None).get_settings().await.unwrap();
        assert_eq!(settings, Settings::default());
    }
}
