//! Heading anchors: stable ids plus a trailing `#` link.

use super::EventTransformer;
use crate::slug::{fallback_heading_id, heading_slug};
use pulldown_cmark::{CowStr, Event, HeadingLevel, Tag, TagEnd};

/// Class carried by the anchor link appended to every heading
pub const ANCHOR_CLASS: &str = "heading-anchor";

/// Assigns every heading an id derived from its text and appends an anchor link
#[derive(Debug, Default)]
pub struct HeadingAnchorTransformer;

impl HeadingAnchorTransformer {
    pub fn new() -> Self {
        Self
    }

    fn finish_heading(
        &self,
        level: HeadingLevel,
        classes: Vec<CowStr<'static>>,
        attrs: Vec<(CowStr<'static>, Option<CowStr<'static>>)>,
        inner: Vec<Event<'static>>,
        out: &mut Vec<Event<'static>>,
    ) {
        let depth = level as u8;
        let raw_text = heading_text(&inner);
        let mut id = heading_slug(&raw_text);
        if id.is_empty() {
            id = fallback_heading_id(depth);
            tracing::debug!(text = %raw_text, id = %id, "heading produced an empty slug");
        }

        let anchor = format!(
            "<a class=\"{}\" href=\"#{}\" aria-label=\"Link to this section\">#</a>",
            ANCHOR_CLASS,
            super::html_escape(&id)
        );

        out.push(Event::Start(Tag::Heading {
            level,
            id: Some(CowStr::Boxed(id.into_boxed_str())),
            classes,
            attrs,
        }));
        out.extend(inner);
        out.push(Event::InlineHtml(CowStr::Boxed(anchor.into_boxed_str())));
        out.push(Event::End(TagEnd::Heading(level)));
    }
}

impl EventTransformer for HeadingAnchorTransformer {
    fn name(&self) -> &'static str {
        "heading-anchors"
    }

    fn transform(&self, events: Vec<Event<'static>>) -> Vec<Event<'static>> {
        let mut out = Vec::with_capacity(events.len());
        let mut open: Option<(HeadingLevel, Vec<CowStr<'static>>, Vec<_>)> = None;
        let mut inner: Vec<Event<'static>> = Vec::new();

        for event in events {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    classes,
                    attrs,
                    ..
                }) => {
                    open = Some((level, classes, attrs));
                    inner.clear();
                }
                Event::End(TagEnd::Heading(level)) => match open.take() {
                    Some((start_level, classes, attrs)) => {
                        self.finish_heading(
                            start_level,
                            classes,
                            attrs,
                            std::mem::take(&mut inner),
                            &mut out,
                        );
                    }
                    None => out.push(Event::End(TagEnd::Heading(level))),
                },
                other if open.is_some() => inner.push(other),
                other => out.push(other),
            }
        }

        out
    }
}

/// Raw text of a heading's content; link wrappers contribute their text
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::MarkdownRenderer;

    fn render(md: &str) -> String {
        MarkdownRenderer::with_transformers(vec![Box::new(HeadingAnchorTransformer::new())])
            .render(md)
    }

    #[test]
    fn test_heading_gets_id_and_anchor() {
        let html = render("## Pipe Expressions");
        assert_eq!(
            html,
            "<h2 id=\"pipe-expressions\">Pipe Expressions<a class=\"heading-anchor\" href=\"#pipe-expressions\" aria-label=\"Link to this section\">#</a></h2>\n"
        );
    }

    #[test]
    fn test_every_depth_is_anchored() {
        let html = render("# One\n## Two\n### Three\n#### Four\n##### Five\n###### Six\n");
        for id in ["one", "two", "three", "four", "five", "six"] {
            assert!(html.contains(&format!("id=\"{}\"", id)), "missing {}", id);
            assert!(html.contains(&format!("href=\"#{}\"", id)));
        }
    }

    #[test]
    fn test_link_text_contributes() {
        let html = render("## See [the grammar](grammar.md) here");
        assert!(html.contains("id=\"see-the-grammar-here\""));
        assert!(html.contains("<a href=\"grammar.md\">the grammar</a>"));
    }

    #[test]
    fn test_code_span_text_contributes() {
        let html = render("### `sort_by` function");
        assert!(html.contains("id=\"sort_by-function\""));
    }

    #[test]
    fn test_identical_text_identical_ids() {
        let html = render("## Examples\n\ntext\n\n## Examples\n");
        assert_eq!(html.matches("id=\"examples\"").count(), 2);
    }

    #[test]
    fn test_symbol_only_heading_gets_fallback() {
        let html = render("### ???\n\n## 2024\n");
        assert!(html.contains("<h3 id=\"section-3-"));
        assert!(html.contains("<h2 id=\"section-2-"));
        assert!(html.contains("href=\"#section-3-"));
    }

    #[test]
    fn test_setext_heading() {
        let html = render("Overview\n========\n");
        assert!(html.contains("<h1 id=\"overview\">"));
    }
}
