//! Derivation of search and navigation records from one document

use crate::models::{AnalyzedContent, DocumentRecords, FrontMatter, SearchIndexEntry};
use jepsite_types::{DocId, NavPage, SearchDocMeta};

/// Output path for a source path: `.md` becomes `.html`, separators become `/`
pub fn output_path(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    match normalized.strip_suffix(".md") {
        Some(stem) => format!("{}.html", stem),
        None => normalized,
    }
}

/// Default navigation id: the relative path without its extension
pub fn default_nav_id(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    let file_start = normalized.rfind('/').map(|i| i + 1).unwrap_or(0);
    match normalized[file_start..].rfind('.') {
        Some(dot) if dot > 0 => normalized[..file_start + dot].to_string(),
        _ => normalized,
    }
}

/// Combine front matter and analysis into the per-document records
///
/// Every document is searchable. Only documents that are not obsoleted
/// receive a navigation entry.
pub fn build_records(
    front_matter: &FrontMatter,
    analyzed: &AnalyzedContent,
    doc_id: DocId,
    rel_path: &str,
) -> DocumentRecords {
    let title = front_matter
        .title
        .clone()
        .unwrap_or_else(|| analyzed.title.clone());
    let is_obsoleted = front_matter.is_obsoleted();
    let href = output_path(rel_path);

    let sections_text = analyzed
        .sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let search_entry = SearchIndexEntry {
        id: doc_id,
        title: title.clone(),
        content: analyzed.text.clone(),
        sections_text,
        is_obsoleted,
    };

    let doc_meta = SearchDocMeta {
        title: title.clone(),
        href: href.clone(),
        sections: analyzed.sections.clone(),
        is_obsoleted,
    };

    let nav_page = (!is_obsoleted).then(|| NavPage {
        id: front_matter
            .id
            .clone()
            .unwrap_or_else(|| default_nav_id(rel_path)),
        file: href,
        title: front_matter.nav_label.clone().unwrap_or(title),
        nav_order: front_matter.nav_order,
        parent: front_matter.parent.clone(),
    });

    DocumentRecords {
        search_entry,
        doc_meta,
        nav_page,
    }
}
