//! Askama template definitions.

use askama::Template;
use jepsite_types::{Section, VersionIndex};
use thiserror::Error;

/// Client script file name at the output root
pub const ASSET_SCRIPT: &str = "app.js";

/// Stylesheet file name at the output root
pub const ASSET_STYLESHEET: &str = "style.css";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

/// Relative prefix from a page back to the output root
///
/// Pages live at `<root>/<version>/<rel_path>`, so the prefix climbs one
/// level for the version directory plus one per directory in `rel_path`.
pub fn root_prefix(rel_path: &str) -> String {
    let depth = rel_path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .count()
        .saturating_sub(1);
    "../".repeat(depth + 1)
}

/// Document shell around one rendered page
#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub title: String,
    pub site_title: String,
    pub version_id: String,
    pub version_label: String,
    /// Navigation id of the page
    pub page_id: String,
    /// Rendered Markdown body, inserted unescaped
    pub content: String,
    /// Table of contents entries
    pub sections: Vec<Section>,
    pub is_obsoleted: bool,
    /// Relative path to the output root, ending in `/`
    pub root_prefix: String,
}

impl PageTemplate {
    pub fn render_page(&self) -> Result<String, RenderError> {
        Ok(self.render()?)
    }
}

/// A version entry on the landing page
#[derive(Debug, Clone)]
pub struct VersionLink {
    pub label: String,
    pub href: String,
    pub is_default: bool,
}

/// Landing page at the output root; forwards to the default version
#[derive(Template)]
#[template(path = "site_index.html")]
pub struct SiteIndexTemplate {
    pub site_title: String,
    /// Public URL prefix of the output root, with leading and trailing `/`
    pub base_url: String,
    /// Empty when no version was built
    pub default_href: String,
    pub versions: Vec<VersionLink>,
}

impl SiteIndexTemplate {
    pub fn from_index(site_title: &str, base_url: &str, index: &VersionIndex) -> Self {
        let default_id = index.default_version_id.as_deref();
        let versions: Vec<VersionLink> = index
            .versions
            .iter()
            .map(|v| VersionLink {
                label: v.label.clone(),
                href: format!("{}{}/{}", base_url, v.id, v.default_file),
                is_default: Some(v.id.as_str()) == default_id,
            })
            .collect();
        let default_href = versions
            .iter()
            .find(|v| v.is_default)
            .map(|v| v.href.clone())
            .unwrap_or_default();

        Self {
            site_title: site_title.to_string(),
            base_url: base_url.to_string(),
            default_href,
            versions,
        }
    }

    pub fn render_page(&self) -> Result<String, RenderError> {
        Ok(self.render()?)
    }
}
