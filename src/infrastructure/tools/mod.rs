//! Built-in tools implementing [`crate::domain::ports::tool::Tool`].

pub mod fetch_url;
pub mod web_search;

pub use fetch_url::FetchUrlTool;
pub use web_search::{GenericHttpSearchVendor, SearchVendor, WebSearchTool};
