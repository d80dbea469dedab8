use crate::cms::CmsFacade;
use crate::models::AppConfig;
use crate::modules::session::SessionKeys;
use crate::proxy::upstream::UpstreamClient;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json, Response},
    routing::{any, get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub upstream: Arc<UpstreamClient>,
    pub cms: Arc<CmsFacade>,
    /// `None` when no session secret is configured; admin login then answers 500
    pub sessions: Option<Arc<SessionKeys>>,
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

pub fn build_router(state: AppState) -> Router {
    use crate::proxy::handlers::{admin, content, sitemap, strapi};

    let admin_routes = Router::new()
        .route("/login", post(admin::login))
        .route("/me", get(admin::me))
        .route("/logout", post(admin::logout))
        .route("/env-check", get(admin::env_check))
        .route("/content/:collection", post(admin::create_content))
        .route(
            "/content/:collection/:id",
            put(admin::update_content)
                .patch(admin::update_content)
                .delete(admin::delete_content),
        );

    let content_routes = Router::new()
        .route("/articles", get(content::list_articles))
        .route("/articles/slug/:slug", get(content::article_by_slug))
        .route("/articles/id/:id", get(content::article_by_id))
        .route("/featured", get(content::featured))
        .route("/breaking", get(content::breaking))
        .route("/trending", get(content::trending))
        .route("/search", get(content::search))
        .route("/category/:slug", get(content::by_category))
        .route("/categories", get(content::categories))
        .route("/settings", get(content::settings))
        .route("/items/:collection", get(content::list_items))
        .route("/items/:collection/:slug", get(content::item_by_slug))
        .route("/calendar/:year/:month", get(content::calendar))
        .route("/holidays/:year/:month", get(content::holidays))
        .route("/upcoming-events", get(content::upcoming_events));

    Router::new()
        // Strapi pass-through
        .route("/api/cms/strapi/*path", any(strapi::handle_proxy))
        .route("/api/cms/strapi-extended/*path", get(strapi::handle_extended))
        .nest("/api/admin", admin_routes)
        .nest("/api/content", content_routes)
        .route("/sitemap.xml", get(sitemap::handle_sitemap))
        .route("/healthz", get(health_check_handler))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::proxy::middleware::auth_middleware,
        ))
        .layer(crate::proxy::middleware::cors_layer())
        .with_state(state)
}

impl AxumServer {
    /// Start Axum server
    pub async fn start(
        state: AppState,
        host: String,
        port: u16,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let app = build_router(state);

        // Bind address
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;

        tracing::info!("CMS gateway started at http://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
        };

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("CMS gateway stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    /// Stop server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler(State(state): State<AppState>) -> Response {
    let provider = state.cms.provider().await;
    Json(serde_json::json!({
        "status": "ok",
        "provider": provider.kind(),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{CmsConfig, ProviderKind};
    use crate::models::{Role, SessionClaims};
    use crate::modules::db::ContentStore;
    use crate::modules::session::SESSION_COOKIE;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &[u8] = b"test-session-secret";

    fn state_with(cms: CmsConfig, secret: Option<&[u8]>) -> AppState {
        let store = ContentStore::open_in_memory().unwrap();
        store.seed_if_empty().unwrap();
        let upstream = Arc::new(UpstreamClient::new(5, None));
        let config = AppConfig {
            cms: cms.clone(),
            ..Default::default()
        };
        AppState {
            config: Arc::new(config),
            upstream: upstream.clone(),
            cms: Arc::new(CmsFacade::new(cms, upstream, Arc::new(store))),
            sessions: secret.map(|s| Arc::new(SessionKeys::new(s, 3600))),
        }
    }

    fn mock_state() -> AppState {
        state_with(
            CmsConfig {
                provider: ProviderKind::Mock,
                ..Default::default()
            },
            Some(SECRET),
        )
    }

    fn session_cookie(state: &AppState, role: Role) -> String {
        let keys = state.sessions.as_ref().unwrap();
        let claims: SessionClaims = keys.claims_for("7", "desk@rampurnews.com", role, "Desk");
        format!("{}={}; strapi_jwt=user-jwt", SESSION_COOKIE, keys.sign(&claims).unwrap())
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let (status, body) = send(mock_state(), get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "provider": "mock" }));
    }

    #[tokio::test]
    async fn test_write_without_session_is_unauthorized() {
        let request = Request::post("/api/cms/strapi/articles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"data":{"title":"x"}}"#))
            .unwrap();
        let (status, body) = send(mock_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));

        let request = Request::post("/api/admin/content/articles")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"x","slug":"x"}"#))
            .unwrap();
        let (status, _) = send(mock_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_mock_content_reads() {
        let state = mock_state();

        let (status, body) = send(state.clone(), get("/api/content/articles?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["pageSize"], json!(2));

        let (status, body) = send(state.clone(), get("/api/content/breaking")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = send(state.clone(), get("/api/content/articles/slug/no-such-article")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(state.clone(), get("/api/content/items/widgets")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(state, get("/api/content/holidays/2026/11")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_article_by_slug_carries_seo() {
        let state = mock_state();
        let (_, list) = send(state.clone(), get("/api/content/articles?limit=1")).await;
        let slug = list["data"][0]["slug"].as_str().unwrap().to_string();

        let (status, body) = send(state, get(&format!("/api/content/articles/slug/{}", slug))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["article"]["slug"], json!(slug));
        assert!(body["seo"]["readTimeMinutes"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_login_without_secret_is_config_error() {
        let state = state_with(
            CmsConfig {
                provider: ProviderKind::Mock,
                ..Default::default()
            },
            None,
        );
        let request = Request::post("/api/admin/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.c","password":"x"}"#))
            .unwrap();
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_login_sets_cookies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/local"))
            .and(body_json(json!({ "identifier": "desk@rampurnews.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "user-jwt",
                "user": {
                    "id": 7, "username": "Desk", "email": "desk@rampurnews.com",
                    "blocked": false, "role": { "type": "editor" }
                }
            })))
            .mount(&server)
            .await;

        let state = state_with(
            CmsConfig {
                base_url: format!("{}/api", server.uri()),
                ..Default::default()
            },
            Some(SECRET),
        );
        let request = Request::post("/api/admin/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":" Desk@RampurNews.com ","password":"pw"}"#))
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("admin_session="));
        assert!(cookies[1].starts_with("strapi_jwt=user-jwt"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "user": { "id": "7", "name": "Desk", "email": "desk@rampurnews.com", "role": "editor" } })
        );
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/local"))
            .and(body_json(json!({ "identifier": "ghost@x.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid identifier or password" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/local"))
            .and(body_json(json!({ "identifier": "reader@x.com", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwt": "j", "user": { "id": 2, "role": { "type": "authenticated" } }
            })))
            .mount(&server)
            .await;

        let state = state_with(
            CmsConfig {
                base_url: server.uri(),
                ..Default::default()
            },
            Some(SECRET),
        );
        let login = |email: &str| {
            Request::post("/api/admin/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "email": email, "password": "pw" }).to_string()))
                .unwrap()
        };

        let (status, _) = send(state.clone(), login("ghost@x.com")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, body) = send(state.clone(), login("reader@x.com")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "Unauthorized" }));
        let (status, _) = send(state, login("  ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_me_without_session() {
        let (status, body) = send(mock_state(), get("/api/admin/me")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "user": null }));
    }

    #[tokio::test]
    async fn test_admin_writes_against_mock() {
        let state = mock_state();
        let editor = session_cookie(&state, Role::Editor);

        let request = Request::post("/api/admin/content/holidays")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, &editor)
            .body(Body::from(
                json!({ "data": { "slug": "eid", "name": "Eid", "date": "2027-03-20" } }).to_string(),
            ))
            .unwrap();
        let (status, created) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["slug"], json!("eid"));

        let (status, _) = send(state.clone(), get("/api/content/items/holidays/eid")).await;
        assert_eq!(status, StatusCode::OK);

        let id = created["id"].as_str().unwrap().to_string();
        let contributor = session_cookie(&state, Role::Contributor);
        let request = Request::delete(format!("/api/admin/content/holidays/{}", id))
            .header(header::COOKIE, &contributor)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(state.clone(), request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let request = Request::delete(format!("/api/admin/content/holidays/{}", id))
            .header(header::COOKIE, &editor)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_proxy_relays_with_server_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .and(wiremock::matchers::header("authorization", "Bearer read-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let state = state_with(
            CmsConfig {
                base_url: server.uri(),
                api_token: Some("read-token".into()),
                ..Default::default()
            },
            Some(SECRET),
        );
        let (status, body) = send(state, get("/api/cms/strapi/categories")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": [] }));
    }

    #[tokio::test]
    async fn test_sitemap_from_mock() {
        let response = build_router(mock_state())
            .oneshot(get("/sitemap.xml"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/xml"));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains("<urlset"));
        assert!(xml.contains("<loc>https://rampurnews.com</loc>"));
        assert!(xml.contains("<changefreq>hourly</changefreq>"));
    }

    fn strapi_state(server: &MockServer) -> AppState {
        state_with(
            CmsConfig {
                provider: ProviderKind::Strapi,
                base_url: server.uri(),
                api_token: Some("read-token".into()),
                write_token: Some("write-token".into()),
                ..Default::default()
            },
            Some(SECRET),
        )
    }

    #[tokio::test]
    async fn test_proxy_rejects_dot_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
            .expect(0)
            .mount(&server)
            .await;
        let state = strapi_state(&server);

        for uri in [
            "/api/cms/strapi/articles/../users",
            "/api/cms/strapi/articles/..%2Fusers",
            "/api/cms/strapi/articles/%2E%2E/users",
            "/api/cms/strapi-extended/articles/../users",
        ] {
            let (status, _) = send(state.clone(), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        }

        let request = Request::delete("/api/cms/strapi/articles/1/../../users/1")
            .header(header::COOKIE, session_cookie(&state, Role::Admin))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_proxy_unreachable_upstream_is_bad_gateway() {
        let state = state_with(
            CmsConfig {
                base_url: "http://127.0.0.1:9/api".into(),
                ..Default::default()
            },
            Some(SECRET),
        );
        let (status, body) = send(state, get("/api/cms/strapi/categories")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_proxy_drops_upstream_cookies_and_encoding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/articles"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "strapi=secret; Path=/")
                    .insert_header("content-encoding", "gzip")
                    .insert_header("x-total-count", "3")
                    .set_body_string(r#"{"data":[]}"#),
            )
            .mount(&server)
            .await;

        let response = build_router(strapi_state(&server))
            .oneshot(get("/api/cms/strapi/articles"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(response.headers()["x-total-count"], "3");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"{"data":[]}"#);
    }

    #[tokio::test]
    async fn test_session_patch_is_sent_as_enveloped_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/articles/12"))
            .and(wiremock::matchers::header("authorization", "Bearer write-token"))
            .and(body_json(json!({ "data": { "title": "नया शीर्षक" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 12 } })))
            .expect(1)
            .mount(&server)
            .await;

        let state = strapi_state(&server);
        let request = Request::patch("/api/cms/strapi/articles/12")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, session_cookie(&state, Role::Editor))
            .body(Body::from(json!({ "title": "नया शीर्षक" }).to_string()))
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "data": { "id": 12 } }));
    }

    #[tokio::test]
    async fn test_extended_collection_and_single() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("publicationState", "live"))
            .and(query_param_is_missing("single"))
            .and(wiremock::matchers::header("authorization", "Bearer read-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": 1, "attributes": { "slug": "mela", "title": "Mela" } },
                    { "id": 2, "attributes": { "slug": "urs", "title": "Urs" } }
                ],
                "meta": { "pagination": { "page": 1, "pageSize": 25, "pageCount": 1, "total": 2 } }
            })))
            .mount(&server)
            .await;
        let state = strapi_state(&server);

        let (status, body) = send(state.clone(), get("/api/cms/strapi-extended/events")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][1]["slug"], json!("urs"));
        assert_eq!(body["total"], json!(2));

        let (status, body) = send(state, get("/api/cms/strapi-extended/events?single=true")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!("1"));
        assert_eq!(body["slug"], json!("mela"));
    }

    #[tokio::test]
    async fn test_extended_passes_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/restaurants"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": { "status": 404 } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/exams"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;
        let state = strapi_state(&server);

        let (status, body) = send(state.clone(), get("/api/cms/strapi-extended/restaurants")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": { "status": 404 } }));

        let (status, body) = send(state.clone(), get("/api/cms/strapi-extended/exams")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!("maintenance"));

        let (status, _) = send(state, get("/api/cms/strapi-extended/users")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sitemap_keeps_static_pages_when_cms_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let response = build_router(strapi_state(&server))
            .oneshot(get("/sitemap.xml"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let xml = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(xml.contains("<loc>https://rampurnews.com</loc>"));
        assert!(!xml.contains("<changefreq>hourly</changefreq>"));
    }
}
