//! CLI command implementations.

pub mod build;
pub mod search;

pub use build::build_site;
pub use search::{search_site, SearchOptions};
