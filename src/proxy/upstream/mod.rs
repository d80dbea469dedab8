// Upstream module - outbound CMS calls

pub mod client;

pub use client::{NotFound, UpstreamClient};
