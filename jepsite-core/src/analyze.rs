//! Content analysis of rendered HTML.
//!
//! The rendered fragment is parsed into a small element tree with
//! `quick-xml`. From that tree we recover the page title (first `h1`), the
//! section outline (`h2`-`h6` with ids) and plain text for the search index.
//! Playground widgets are filtered out of a copy of the tree before text
//! extraction.

use crate::markdown::headings::ANCHOR_CLASS;
use crate::markdown::playground::CONTAINER_CLASS;
use crate::models::AnalyzedContent;
use jepsite_types::Section;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("HTML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

}

/// Elements that never have content or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements that start a new line in structured text
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "dd",
    "details",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "footer",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "thead",
    "tfoot",
    "tr",
    "ul",
];

/// A node in the parsed tree
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlNode {
    Element(HtmlElement),
    Text(String),
}

/// An element with its attributes and ordered children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HtmlElement {
    /// Lower-cased tag name
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &HtmlElement> {
        self.children.iter().filter_map(|child| match child {
            HtmlNode::Element(el) => Some(el),
            HtmlNode::Text(_) => None,
        })
    }

    /// Every descendant element matching `pred`, in document order
    pub fn find_all<'a, F>(&'a self, pred: &F) -> Vec<&'a HtmlElement>
    where
        F: Fn(&HtmlElement) -> bool,
    {
        let mut found = Vec::new();
        self.collect_matching(pred, &mut found);
        found
    }

    fn collect_matching<'a, F>(&'a self, pred: &F, found: &mut Vec<&'a HtmlElement>)
    where
        F: Fn(&HtmlElement) -> bool,
    {
        for el in self.elements() {
            if pred(el) {
                found.push(el);
            }
            el.collect_matching(pred, found);
        }
    }

    /// First descendant element matching `pred`, in document order
    pub fn find<F>(&self, pred: &F) -> Option<&HtmlElement>
    where
        F: Fn(&HtmlElement) -> bool,
    {
        for el in self.elements() {
            if pred(el) {
                return Some(el);
            }
            if let Some(found) = el.find(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_by_class(&self, class: &str) -> Option<&HtmlElement> {
        self.find(&|el: &HtmlElement| el.has_class(class))
    }

    pub fn find_all_by_class(&self, class: &str) -> Vec<&HtmlElement> {
        self.find_all(&|el: &HtmlElement| el.has_class(class))
    }

    /// Copy of this subtree with every element carrying `class` removed
    pub fn without_class(&self, class: &str) -> HtmlElement {
        HtmlElement {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: self
                .children
                .iter()
                .filter_map(|child| match child {
                    HtmlNode::Element(el) if el.has_class(class) => None,
                    HtmlNode::Element(el) => Some(HtmlNode::Element(el.without_class(class))),
                    HtmlNode::Text(t) => Some(HtmlNode::Text(t.clone())),
                })
                .collect(),
        }
    }

    /// Concatenation of every text node below this element
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.push_raw_text(&mut out);
        out
    }

    fn push_raw_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                HtmlNode::Text(t) => out.push_str(t),
                HtmlNode::Element(el) => el.push_raw_text(out),
            }
        }
    }

    /// Text with block elements on their own lines and whitespace collapsed
    pub fn structured_text(&self) -> String {
        let mut lines = Vec::new();
        let mut current = String::new();
        self.push_structured(&mut lines, &mut current, false);
        flush_line(&mut lines, &mut current);
        lines.join("\n")
    }

    fn push_structured(&self, lines: &mut Vec<String>, current: &mut String, in_pre: bool) {
        let is_block = BLOCK_ELEMENTS.contains(&self.tag.as_str());
        let in_pre = in_pre || self.tag == "pre";
        if is_block {
            flush_line(lines, current);
        }

        for child in &self.children {
            match child {
                HtmlNode::Text(text) if in_pre => {
                    for (i, part) in text.split('\n').enumerate() {
                        if i > 0 {
                            flush_line(lines, current);
                        }
                        current.push_str(part);
                    }
                }
                HtmlNode::Text(text) => current.push_str(text),
                HtmlNode::Element(el) if el.tag == "br" => flush_line(lines, current),
                HtmlNode::Element(el) => {
                    if matches!(el.tag.as_str(), "td" | "th") {
                        current.push(' ');
                    }
                    el.push_structured(lines, current, in_pre);
                }
            }
        }

        if is_block {
            flush_line(lines, current);
        }
    }
}

fn flush_line(lines: &mut Vec<String>, current: &mut String) {
    let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

/// Parse an HTML fragment into a tree rooted at a synthetic `<root>` element
///
/// Tag structure is repaired the way browsers do it: a closing tag closes
/// every element opened after its match, a closing tag with no open match is
/// dropped, and elements still open at the end are closed. A bare `&` stays
/// literal text. Only lexical errors (such as an unterminated comment or tag)
/// are reported.
pub fn parse_html(html: &str) -> Result<HtmlElement, AnalyzeError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut stack = vec![HtmlElement {
        tag: "root".to_string(),
        ..HtmlElement::default()
    }];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let element = element_from(&reader, &e);
                if VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    push_node(&mut stack, HtmlNode::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(e) => {
                let element = element_from(&reader, &e);
                push_node(&mut stack, HtmlNode::Element(element));
            }
            Event::End(e) => {
                let name = decode_name(&reader, e.name().as_ref());
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                // Index 0 is the synthetic root, which is never closed here
                match stack.iter().rposition(|el| el.tag == name) {
                    Some(open) if open > 0 => close_until(&mut stack, open),
                    _ => tracing::debug!(tag = %name, "Ignoring stray closing tag"),
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                push_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?.into_owned();
                push_text(&mut stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut stack, &text);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    close_until(&mut stack, 1);
    Ok(stack.pop().unwrap_or_default())
}

/// Pop every element at `depth` or deeper, attaching each to its parent
fn close_until(stack: &mut Vec<HtmlElement>, depth: usize) {
    while stack.len() > depth.max(1) {
        let Some(element) = stack.pop() else {
            break;
        };
        push_node(stack, HtmlNode::Element(element));
    }
}

fn element_from(reader: &Reader<&[u8]>, e: &BytesStart) -> HtmlElement {
    let tag = decode_name(reader, e.name().as_ref());
    let attrs = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = decode_name(reader, attr.key.as_ref());
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            (key, value)
        })
        .collect();

    HtmlElement {
        tag,
        attrs,
        children: Vec::new(),
    }
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(
            |_| String::from_utf8_lossy(name).into_owned(),
            std::borrow::Cow::into_owned,
        )
        .to_ascii_lowercase()
}

fn push_node(stack: &mut [HtmlElement], node: HtmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [HtmlElement], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(HtmlNode::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
    } else {
        parent.children.push(HtmlNode::Text(text.to_string()));
    }
}

/// Decode an entity reference name (without `&` and `;`)
fn decode_entity(entity: &str) -> String {
    let named = match entity {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        "nbsp" => Some("\u{00a0}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "hellip" => Some("\u{2026}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "copy" => Some("\u{00a9}"),
        "times" => Some("\u{00d7}"),
        "rarr" => Some("\u{2192}"),
        "larr" => Some("\u{2190}"),
        _ => None,
    };
    if let Some(text) = named {
        return text.to_string();
    }

    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => num.parse::<u32>().ok(),
        };
        if let Some(c) = code.and_then(char::from_u32) {
            return c.to_string();
        }
    }

    format!("&{entity};")
}

/// Analyze a rendered page
///
/// Never fails: if the HTML cannot be parsed the result carries the fallback
/// title, no sections, and the raw markdown body as its text.
pub fn analyze_html(html: &str, fallback_title: &str, raw_markdown: &str) -> AnalyzedContent {
    match parse_html(html) {
        Ok(root) => analyze_tree(&root, fallback_title),
        Err(err) => {
            tracing::warn!("Falling back to raw text, HTML analysis failed: {}", err);
            AnalyzedContent {
                title: fallback_title.to_string(),
                sections: Vec::new(),
                text: raw_markdown.to_string(),
            }
        }
    }
}

/// Analyze an already parsed tree
pub fn analyze_tree(root: &HtmlElement, fallback_title: &str) -> AnalyzedContent {
    let title = root
        .find(&|el: &HtmlElement| el.tag == "h1")
        .map(heading_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let sections = root
        .find_all(&|el: &HtmlElement| heading_level(&el.tag).is_some_and(|l| l >= 2))
        .into_iter()
        .filter_map(|el| {
            let id = el.attr("id").map(str::trim).filter(|id| !id.is_empty())?;
            let text = heading_text(el);
            if text.is_empty() {
                return None;
            }
            Some(Section {
                id: id.to_string(),
                text,
                level: heading_level(&el.tag)?,
            })
        })
        .collect();

    let searchable = root
        .without_class(CONTAINER_CLASS)
        .without_class(ANCHOR_CLASS);
    let mut text = searchable.structured_text();
    if text.trim().is_empty() {
        text = collapse_whitespace(&searchable.raw_text());
    }

    AnalyzedContent {
        title,
        sections,
        text,
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Heading text without the anchor link
fn heading_text(heading: &HtmlElement) -> String {
    collapse_whitespace(&heading.without_class(ANCHOR_CLASS).raw_text())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
