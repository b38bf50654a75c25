//! Front matter extraction from markdown files.

use crate::models::{ExtractedDocument, FrontMatter};
use crate::slug::title_from_stem;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Front matter must be a mapping")]
    NotAMapping,
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)(.*)\z")
            .expect("front matter pattern is valid")
    })
}

/// Parse front matter from markdown content
///
/// Returns a tuple of (front matter, markdown body).
/// If no front matter is present, returns default front matter with the full content as body.
/// An empty metadata block is valid and yields default front matter.
///
/// # Example
///
/// ```
/// use jepsite_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: Slices\nnav_order: 3\n---\n# Array Slicing\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.title.as_deref(), Some("Slices"));
/// assert_eq!(fm.nav_order, Some(3.0));
/// assert!(body.starts_with("# Array Slicing"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(FrontMatter, String), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((FrontMatter::default(), content.to_string()));
    };

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    let frontmatter = match serde_yaml::from_str::<serde_yaml::Value>(yaml)? {
        // Empty or comment-only blocks
        serde_yaml::Value::Null => FrontMatter::default(),
        value @ serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value)?,
        _ => return Err(FrontmatterError::NotAMapping),
    };

    Ok((frontmatter, body.to_string()))
}

/// Split a source file into front matter, body, and a fallback title
///
/// Never fails: a malformed metadata block is logged and the whole file is
/// treated as the body.
pub fn extract_document(content: &str, rel_path: &str) -> ExtractedDocument {
    let fallback_title = fallback_title(rel_path);

    match parse_frontmatter(content) {
        Ok((front_matter, body)) => ExtractedDocument {
            front_matter,
            body,
            fallback_title,
        },
        Err(err) => {
            tracing::warn!(path = %rel_path, "Ignoring unreadable front matter: {}", err);
            ExtractedDocument {
                front_matter: FrontMatter::default(),
                body: content.to_string(),
                fallback_title,
            }
        }
    }
}

/// Title-cased file stem, e.g. `array-slicing.md` -> `Array Slicing`
pub fn fallback_title(rel_path: &str) -> String {
    let stem = Path::new(rel_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let title = title_from_stem(stem);
    if title.is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_frontmatter() {
        let content = r#"---
title: Functions
nav_label: Built-in functions
nav_order: 4
parent: spec
status: accepted
---

# Functions

This is the content."#;

        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Functions"));
        assert_eq!(fm.nav_label.as_deref(), Some("Built-in functions"));
        assert_eq!(fm.nav_order, Some(4.0));
        assert_eq!(fm.parent.as_deref(), Some("spec"));
        assert!(!fm.is_obsoleted());
        assert!(body.contains("# Functions"));
        assert!(body.contains("This is the content."));
    }

    #[test]
    fn test_delimiter_with_trailing_space() {
        let (fm, body) = parse_frontmatter("--- \ntitle: Foo\n---\n# Bar\n").unwrap();
        assert_eq!(fm.title.as_deref(), Some("Foo"));
        assert_eq!(body, "# Bar\n");
    }

    #[test]
    fn test_parse_no_frontmatter() {
        let content = "# Just Content\n\nNo front matter here.";
        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_block() {
        let (fm, body) = parse_frontmatter("---\n---\nBody").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_block_at_end_of_file() {
        let (fm, body) = parse_frontmatter("---\ntitle: Only Meta\n---").unwrap();
        assert_eq!(fm.title.as_deref(), Some("Only Meta"));
        assert_eq!(body, "");
    }

    #[test]
    fn test_crlf_line_endings() {
        let (fm, body) = parse_frontmatter("---\r\ntitle: Windows\r\n---\r\nText\r\n").unwrap();
        assert_eq!(fm.title.as_deref(), Some("Windows"));
        assert_eq!(body, "Text\r\n");
    }

    #[test]
    fn test_invalid_yaml() {
        let content = r#"---
title: Test
invalid yaml: [unclosed
---

Content."#;

        assert!(parse_frontmatter(content).is_err());
    }

    #[test]
    fn test_extract_soft_fails_on_invalid_yaml() {
        let content = "---\ntitle: [unclosed\n---\n# Heading\n";
        let doc = extract_document(content, "grammar.md");
        assert_eq!(doc.front_matter, FrontMatter::default());
        assert_eq!(doc.body, content);
        assert_eq!(doc.fallback_title, "Grammar");
    }

    #[test]
    fn test_non_mapping_block_is_soft_failure() {
        let content = "---\n- just\n- a list\n---\nBody\n";
        let doc = extract_document(content, "list.md");
        assert_eq!(doc.front_matter, FrontMatter::default());
        assert_eq!(doc.body, content);
    }

    #[test]
    fn test_fallback_title() {
        assert_eq!(fallback_title("array-slicing.md"), "Array Slicing");
        assert_eq!(fallback_title("jeps/jep-011_let_expressions.md"), "Jep 011 Let Expressions");
        assert_eq!(fallback_title("README.md"), "README");
        assert_eq!(fallback_title("---.md"), "Untitled");
    }
}
