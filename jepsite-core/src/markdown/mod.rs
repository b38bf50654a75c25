//! Markdown processing pipeline with custom extensions.
//!
//! Conversion runs pulldown-cmark with GitHub-flavored options and passes the
//! event stream through a chain of [`EventTransformer`]s before HTML output.
//! The default chain intercepts `jmespath-interactive` fences first and then
//! anchors every heading.

pub mod headings;
pub mod playground;

use pulldown_cmark::{html, Event, Options, Parser};

pub use headings::HeadingAnchorTransformer;
pub use playground::{Playground, PlaygroundTransformer};

/// One rewriting step over the markdown event stream
pub trait EventTransformer: Send + Sync {
    /// Short name used in debug logs
    fn name(&self) -> &'static str;

    fn transform(&self, events: Vec<Event<'static>>) -> Vec<Event<'static>>;
}

/// Markdown renderer with custom extensions
pub struct MarkdownRenderer {
    options: Options,
    transformers: Vec<Box<dyn EventTransformer>>,
}

impl MarkdownRenderer {
    /// Renderer with the playground and heading-anchor extensions
    pub fn new() -> Self {
        Self::with_transformers(vec![
            Box::new(PlaygroundTransformer::new()),
            Box::new(HeadingAnchorTransformer::new()),
        ])
    }

    /// Renderer with a custom transformer chain, applied in order
    pub fn with_transformers(transformers: Vec<Box<dyn EventTransformer>>) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_GFM);

        Self {
            options,
            transformers,
        }
    }

    /// Convert a markdown body to an HTML fragment
    pub fn render(&self, markdown: &str) -> String {
        let mut events: Vec<Event<'static>> = Parser::new_ext(markdown, self.options)
            .map(Event::into_static)
            .collect();

        for transformer in &self.transformers {
            tracing::trace!(transformer = transformer.name(), "applying transformer");
            events = transformer.transform(events);
        }

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
