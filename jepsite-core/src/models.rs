//! Content model structs shared by the pipeline stages.

use jepsite_types::{DocId, NavPage, SearchDocMeta, Section};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Document status values recognised in front matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Accepted,
    Draft,
    Obsoleted,
    Rejected,
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown document status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for DocStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accepted" => Ok(DocStatus::Accepted),
            "draft" => Ok(DocStatus::Draft),
            "obsoleted" => Ok(DocStatus::Obsoleted),
            "rejected" => Ok(DocStatus::Rejected),
            "superseded" => Ok(DocStatus::Superseded),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Front matter metadata from markdown files
///
/// Every field is optional. Keys outside the recognised vocabulary are kept
/// in `extra` untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FrontMatter {
    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub nav_label: Option<String>,

    #[serde(default, deserialize_with = "opt_number")]
    pub nav_order: Option<f64>,

    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub parent: Option<String>,

    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub obsoleted_by: Option<String>,

    #[serde(default, deserialize_with = "opt_scalar_string")]
    pub status: Option<String>,

    // JEP bookkeeping, carried through opaquely
    #[serde(default)]
    pub jep: Option<Value>,

    #[serde(default)]
    pub author: Option<Value>,

    #[serde(default)]
    pub created: Option<Value>,

    #[serde(default)]
    pub semver: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FrontMatter {
    /// Parsed `status`, if it is one of the known values
    pub fn doc_status(&self) -> Option<DocStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Whether the document has been replaced and should leave the navigation
    pub fn is_obsoleted(&self) -> bool {
        self.obsoleted_by.is_some()
            || matches!(
                self.doc_status(),
                Some(DocStatus::Obsoleted | DocStatus::Superseded)
            )
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => return scalar_to_string(tagged.value),
        _ => return None,
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn opt_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

/// A source file split into metadata and body
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub front_matter: FrontMatter,
    /// Markdown body without the metadata block
    pub body: String,
    /// Title derived from the file stem
    pub fallback_title: String,
}

/// What the content analyzer recovers from rendered HTML
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedContent {
    pub title: String,
    pub sections: Vec<Section>,
    /// Plain text for the search index, playground markup removed
    pub text: String,
}

/// Full-text index input for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndexEntry {
    pub id: DocId,
    pub title: String,
    pub content: String,
    pub sections_text: String,
    pub is_obsoleted: bool,
}

/// The three records derived from one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecords {
    pub search_entry: SearchIndexEntry,
    pub doc_meta: SearchDocMeta,
    /// Absent when the document is obsoleted
    pub nav_page: Option<NavPage>,
}

impl DocumentRecords {
    pub fn doc_id(&self) -> DocId {
        self.search_entry.id
    }
}
