//! Interactive JMESPath playgrounds from fenced code blocks.
//!
//! A fence whose info string starts with `jmespath-interactive` becomes a
//! widget shell instead of a code listing:
//!
//! ````markdown
//! ```jmespath-interactive expanded Filtering people
//! {"people": [{"age": 20}, {"age": 35}]}
//! ---JMESPATH---
//! people[?age > `30`]
//! ```
//! ````
//!
//! Only markup is produced here; the client script evaluates queries.

use super::{html_escape, EventTransformer};
use crate::slug::random_suffix;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};

/// Info-string token that marks a playground fence
pub const FENCE_TOKEN: &str = "jmespath-interactive";

/// Line separating the JSON input from the query
pub const QUERY_SEPARATOR: &str = "---JMESPATH---";

/// Class of the outermost playground element
pub const CONTAINER_CLASS: &str = "jmespath-playground";

const DEFAULT_TITLE: &str = "Interactive Example";

/// A parsed playground block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playground {
    pub title: String,
    pub expanded: bool,
    /// Initial JSON input, trimmed
    pub json: String,
    /// Initial query, trimmed
    pub query: String,
    /// False when the JSON input is non-empty and does not parse
    pub json_valid: bool,
}

impl Playground {
    /// Build a playground from a fence info string and block body
    ///
    /// Returns `None` when the info string is not a playground fence.
    pub fn from_fence(info: &str, body: &str) -> Option<Self> {
        let (expanded, title) = parse_fence_tag(info)?;
        let (json, query) = split_body(body);
        let json_valid =
            json.is_empty() || serde_json::from_str::<serde_json::Value>(&json).is_ok();

        Some(Self {
            title,
            expanded,
            json,
            query,
            json_valid,
        })
    }

    /// Render the widget shell with a fresh element id
    pub fn to_html(&self) -> String {
        self.to_html_with_id(&format!("{}-{}", CONTAINER_CLASS, random_suffix()))
    }

    /// Render the widget shell; every inner element id is derived from `id`
    pub fn to_html_with_id(&self, id: &str) -> String {
        let id = html_escape(id);
        let expanded = if self.expanded { "true" } else { "false" };
        let mut html = String::new();

        html.push_str(&format!(
            "<div class=\"{}\" id=\"{}\" data-expanded=\"{}\">\n",
            CONTAINER_CLASS, id, expanded
        ));
        html.push_str("<div class=\"jmespath-playground-header\">\n");
        html.push_str(&format!(
            "<button type=\"button\" class=\"jmespath-playground-toggle\" aria-expanded=\"{}\" aria-controls=\"{}-body\">{}</button>\n",
            expanded,
            id,
            html_escape(&self.title)
        ));
        html.push_str("</div>\n");

        if self.expanded {
            html.push_str(&format!(
                "<div class=\"jmespath-playground-body\" id=\"{}-body\">\n",
                id
            ));
        } else {
            html.push_str(&format!(
                "<div class=\"jmespath-playground-body\" id=\"{}-body\" hidden=\"hidden\">\n",
                id
            ));
        }

        if !self.json_valid {
            html.push_str(
                "<p class=\"jmespath-playground-warning\" role=\"alert\">Warning: the initial JSON input is not valid JSON.</p>\n",
            );
        }

        html.push_str(&format!(
            "<label class=\"jmespath-playground-label\" for=\"{id}-json\">JSON Input</label>\n\
             <textarea class=\"jmespath-playground-json\" id=\"{id}-json\" rows=\"8\" spellcheck=\"false\">{}</textarea>\n",
            html_escape(&self.json)
        ));
        html.push_str(&format!(
            "<label class=\"jmespath-playground-label\" for=\"{id}-query\">JMESPath Query</label>\n\
             <textarea class=\"jmespath-playground-query\" id=\"{id}-query\" rows=\"2\" spellcheck=\"false\">{}</textarea>\n",
            html_escape(&self.query)
        ));
        html.push_str(&format!(
            "<div class=\"jmespath-playground-label\">Result</div>\n\
             <pre class=\"jmespath-playground-output\" id=\"{id}-output\"><code></code></pre>\n\
             <div class=\"jmespath-playground-error\" id=\"{id}-error\" role=\"alert\" hidden=\"hidden\"></div>\n"
        ));
        html.push_str("</div>\n</div>\n");
        html
    }
}

/// Parse `jmespath-interactive[ expanded][ <title>]`
///
/// The token must be followed by whitespace or nothing.
pub fn parse_fence_tag(info: &str) -> Option<(bool, String)> {
    let rest = info.trim_start().strip_prefix(FENCE_TOKEN)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim();
    let (expanded, title) = match rest.strip_prefix("expanded") {
        Some(after) if after.is_empty() || after.starts_with(char::is_whitespace) => {
            (true, after.trim())
        }
        _ => (false, rest),
    };

    let title = if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title.to_string()
    };
    Some((expanded, title))
}

/// Split a block body into (json, query) on the separator line
pub fn split_body(body: &str) -> (String, String) {
    let lines: Vec<&str> = body.lines().collect();
    match lines.iter().position(|line| line.trim() == QUERY_SEPARATOR) {
        Some(idx) => (
            lines[..idx].join("\n").trim().to_string(),
            lines[idx + 1..].join("\n").trim().to_string(),
        ),
        None => (body.trim().to_string(), String::new()),
    }
}

/// Replaces playground fences with widget markup
#[derive(Debug, Default)]
pub struct PlaygroundTransformer;

impl PlaygroundTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl EventTransformer for PlaygroundTransformer {
    fn name(&self) -> &'static str {
        "playgrounds"
    }

    fn transform(&self, events: Vec<Event<'static>>) -> Vec<Event<'static>> {
        let mut out = Vec::with_capacity(events.len());
        let mut current: Option<(CowStr<'static>, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                    if parse_fence_tag(&info).is_some() =>
                {
                    current = Some((info, String::new()));
                }
                Event::Text(text) if current.is_some() => {
                    if let Some((_, body)) = current.as_mut() {
                        body.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if current.is_some() => {
                    if let Some((info, body)) = current.take() {
                        if let Some(playground) = Playground::from_fence(&info, &body) {
                            if !playground.json_valid {
                                tracing::warn!(
                                    title = %playground.title,
                                    "playground JSON input does not parse"
                                );
                            }
                            out.push(Event::Html(CowStr::Boxed(
                                playground.to_html().into_boxed_str(),
                            )));
                        }
                    }
                }
                other => out.push(other),
            }
        }

        out
    }
}
