//! Storefront API: HTTP client, wire types, list normalization and the
//! per-resource caches built on them.

pub mod api_types;
pub mod client;
pub mod forms;
pub mod normalize;
pub mod resources;
pub mod types;

pub use client::ApiClient;
pub use resources::{Categories, Orders, Products, ResourceCache};
