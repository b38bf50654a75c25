//! # jepsite-core
//!
//! Core library for the jepsite documentation generator.
//!
//! This crate turns versioned Markdown sources into static pages: front
//! matter extraction, Markdown rendering with heading anchors and query
//! playgrounds, content analysis, search records, navigation ordering, and
//! the per-version and site-wide builds.

pub mod analyze;
pub mod builder;
pub mod config;
pub mod discover;
pub mod frontmatter;
pub mod git;
pub mod markdown;
pub mod models;
pub mod navigation;
pub mod records;
pub mod search;
pub mod slug;
pub mod version;

pub use analyze::analyze_html;
pub use builder::{BuildError, SiteBuilder, SiteReport, VersionReport};
pub use config::Config;
pub use frontmatter::extract_document;
pub use markdown::MarkdownRenderer;
pub use models::{AnalyzedContent, DocumentRecords, FrontMatter, SearchIndexEntry};
pub use navigation::{compare_pages, select_default_file, sort_pages};
pub use records::build_records;
pub use search::{SearchExport, SearchIndex, SearchIndexBuilder};
pub use version::{VersionBuild, VersionBuilder, VersionError, VersionSource};
