//! # jepsite-render
//!
//! Askama templates for the HTML documents jepsite writes: the shell wrapped
//! around every rendered page and the landing page at the site root.

pub mod templates;

pub use templates::{
    root_prefix, PageTemplate, RenderError, SiteIndexTemplate, VersionLink, ASSET_SCRIPT,
    ASSET_STYLESHEET,
};
