//! Shared types for jepsite
//!
//! This crate provides the records every stage of the site build hands to the
//! next one: search document identifiers, heading sections, navigation pages,
//! and the per-version manifests that make up `versions.json`.
//!
//! Field names serialize in camelCase because the client script reads these
//! structures directly.

use serde::{Deserialize, Serialize};

/// Integer identifier of a document in one version's search index
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

impl From<DocId> for u32 {
    fn from(id: DocId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sub-heading recovered from a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Anchor id carried by the heading element (never empty)
    pub id: String,
    /// Heading text without the anchor link
    pub text: String,
    /// Heading depth, 2 through 6
    pub level: u8,
}

/// Navigation descriptor for one non-obsoleted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavPage {
    pub id: String,
    /// Output path relative to the version directory (`.html`)
    pub file: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_order: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Metadata stored per document in `search_map.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocMeta {
    pub title: String,
    pub href: String,
    pub sections: Vec<Section>,
    pub is_obsoleted: bool,
}

/// Everything the client needs to render one version's navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub id: String,
    pub label: String,
    pub pages: Vec<NavPage>,
    pub default_file: String,
}

/// Site-wide version index persisted as `versions.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VersionIndex {
    pub versions: Vec<VersionManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version_id: Option<String>,
}

impl VersionIndex {
    /// Find a manifest by version id
    pub fn find(&self, id: &str) -> Option<&VersionManifest> {
        self.versions.iter().find(|v| v.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nav_page_serializes_camel_case_and_skips_missing() {
        let page = NavPage {
            id: "spec".into(),
            file: "spec.html".into(),
            title: "Specification".into(),
            nav_order: Some(2.0),
            parent: None,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["navOrder"], 2.0);
        assert!(json.get("parent").is_none());
    }

    #[test]
    fn doc_id_is_transparent() {
        let json = serde_json::to_string(&DocId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn version_index_lookup() {
        let index = VersionIndex {
            versions: vec![VersionManifest {
                id: "latest".into(),
                label: "Latest".into(),
                pages: vec![],
                default_file: "index.html".into(),
            }],
            default_version_id: Some("latest".into()),
        };
        assert!(index.find("latest").is_some());
        assert!(index.find("v1").is_none());
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["defaultVersionId"], "latest");
        assert_eq!(json["versions"][0]["defaultFile"], "index.html");
    }
}
