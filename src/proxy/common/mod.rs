// Shared helpers for the proxy handlers

pub mod access;
pub mod headers;
pub mod url;
