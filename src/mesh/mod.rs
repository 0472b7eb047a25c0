//! Mesh test domain: data model, API client and cached access.

pub mod agents_cache;
pub mod api_types;
pub mod cached_source;
pub mod client;
pub mod geo;
pub mod types;
