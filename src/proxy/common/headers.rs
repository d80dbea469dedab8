// Header scrubbing between the browser and the upstream CMS
use axum::http::{header, HeaderMap, HeaderValue};

/// Hop-by-hop and identity headers never forwarded upstream
const STRIPPED_REQUEST_HEADERS: [header::HeaderName; 7] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::COOKIE,
    header::AUTHORIZATION,
    header::ORIGIN,
    header::REFERER,
];

/// Headers dropped from the upstream response before relaying it
const STRIPPED_RESPONSE_HEADERS: [header::HeaderName; 4] = [
    header::SET_COOKIE,
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Copy incoming headers for the upstream call, injecting the bearer credential
pub fn upstream_request_headers(incoming: &HeaderMap, bearer: Option<&str>) -> HeaderMap {
    let mut headers = incoming.clone();
    for name in STRIPPED_REQUEST_HEADERS.iter() {
        headers.remove(name);
    }
    if let Some(token) = bearer {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            headers.insert(header::AUTHORIZATION, value);
        }
    }
    headers
}

pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in STRIPPED_RESPONSE_HEADERS.iter() {
        headers.remove(name);
    }
    headers
}
