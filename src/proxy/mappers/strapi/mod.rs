// Strapi mapper - entity normalization, query strings and write rewriting

pub mod normalize;
pub mod query;
pub mod response;
pub mod write;

pub use normalize::{extract_media_url, extract_media_urls, normalize_entity};
pub use query::{build_list_query, build_slug_query, encode_query};
pub use response::{to_paginated, to_single};
pub use write::{rewrite_request, unwrap_value, wrap_value, ArticleWriteMode, UpstreamTarget};
