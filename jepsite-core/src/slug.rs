//! Heading anchor slugs and file-stem titles.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static LEADING_REGEX: OnceLock<Regex> = OnceLock::new();
static NON_WORD_REGEX: OnceLock<Regex> = OnceLock::new();
static HYPHENS_REGEX: OnceLock<Regex> = OnceLock::new();

fn leading_regex() -> &'static Regex {
    LEADING_REGEX.get_or_init(|| Regex::new(r"^[^a-z_]+").expect("valid pattern"))
}

fn non_word_regex() -> &'static Regex {
    NON_WORD_REGEX.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid pattern"))
}

fn hyphens_regex() -> &'static Regex {
    HYPHENS_REGEX.get_or_init(|| Regex::new(r"-{2,}").expect("valid pattern"))
}

/// Convert heading text to an anchor id
///
/// Rules:
/// - Lowercase
/// - Drop any leading run of characters that are not `a-z` or `_`
/// - Replace runs of characters outside `[A-Za-z0-9_-]` with one hyphen
/// - Collapse repeated hyphens
/// - Trim leading/trailing hyphens
///
/// The result may be empty; callers synthesize a fallback id in that case.
///
/// # Examples
///
/// ```
/// use jepsite_core::slug::heading_slug;
///
/// assert_eq!(heading_slug("Pipe Expressions"), "pipe-expressions");
/// assert_eq!(heading_slug("11.2 Slices"), "slices");
/// assert_eq!(heading_slug("abs(), avg()"), "abs-avg");
/// ```
pub fn heading_slug(input: &str) -> String {
    let lowercased = input.to_lowercase();
    let stripped = leading_regex().replace(&lowercased, "");
    let replaced = non_word_regex().replace_all(&stripped, "-");
    let collapsed = hyphens_regex().replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Fallback anchor id for headings whose text produces an empty slug
pub fn fallback_heading_id(depth: u8) -> String {
    format!("section-{}-{}", depth, random_suffix())
}

/// Short collision-resistant token for generated element ids
pub fn random_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Turn a file stem into a display title
///
/// `-` and `_` become spaces and every word gets an upper-case first letter.
///
/// ```
/// use jepsite_core::slug::title_from_stem;
///
/// assert_eq!(title_from_stem("array-slicing"), "Array Slicing");
/// ```
pub fn title_from_stem(stem: &str) -> String {
    stem.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut graphemes = word.graphemes(true);
    match graphemes.next() {
        Some(first) => {
            let mut out = first.to_uppercase();
            out.push_str(graphemes.as_str());
            out
        }
        None => String::new(),
    }
}
