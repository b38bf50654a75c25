//! Navigation ordering and default page selection

use jepsite_types::NavPage;
use std::cmp::Ordering;

/// Landing page candidates, highest priority first
pub const DEFAULT_PAGE_PREFERENCE: [&str; 4] =
    ["_index.html", "index.html", "spec.html", "readme.html"];

/// Defined values sort before undefined ones; two undefined values are equal
fn defined_first<T>(a: Option<T>, b: Option<T>, cmp: impl FnOnce(T, T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Title order: case-insensitive first, raw text as tie-break
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Navigation comparator
///
/// Pages without a parent come first, then pages grouped by parent id. Within
/// a group, pages with a `nav_order` precede those without, and titles break
/// the remaining ties.
pub fn compare_pages(a: &NavPage, b: &NavPage) -> Ordering {
    // Without a parent is the "defined" side here, so the usual rule is flipped.
    let by_parent = match (&a.parent, &b.parent) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(pa), Some(pb)) => pa.cmp(pb),
    };

    by_parent
        .then_with(|| defined_first(a.nav_order, b.nav_order, |x, y| x.total_cmp(&y)))
        .then_with(|| compare_titles(&a.title, &b.title))
}

/// Stable sort with [`compare_pages`]
pub fn sort_pages(pages: &mut [NavPage]) {
    pages.sort_by(compare_pages);
}

/// Pick the landing file for a sorted page list
pub fn select_default_file(sorted_pages: &[NavPage]) -> String {
    for candidate in DEFAULT_PAGE_PREFERENCE {
        if let Some(page) = sorted_pages
            .iter()
            .find(|p| p.file.eq_ignore_ascii_case(candidate))
        {
            return page.file.clone();
        }
    }

    sorted_pages
        .first()
        .map(|p| p.file.clone())
        .unwrap_or_else(|| DEFAULT_PAGE_PREFERENCE[0].to_string())
}
