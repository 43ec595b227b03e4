//! Event message templates.
//!
//! Templates are plain text with `{{ field }}` placeholders and two kinds of
//! sections:
//!
//! - `{{#field}} ... {{/field}}` renders its contents when `field` has a value
//! - `{{^field}} ... {{/field}}` renders its contents when it does not
//!
//! The field set is closed (see [`Field`]). Templates are parsed once when
//! saved so that syntax errors are rejected up front; rendering a parsed
//! template can still fail when a bare placeholder refers to a value the
//! caller did not supply.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Rendering format for every timestamp field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Tag body: optional sigil, then an identifier.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([#^/]?)\s*([A-Za-z_][A-Za-z0-9_]*)$").expect("valid regex"));

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The template text is malformed. `offset` is the byte position of the
    /// offending tag.
    #[error("parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    /// The template is well-formed but could not be rendered with the data
    /// supplied.
    #[error("render error: {0}")]
    Render(String),
}

impl TemplateError {
    fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// Values available to a template. Every field is optional; empty strings
/// count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateData {
    pub service_name: Option<String>,
    pub service_group_name: Option<String>,
    pub started_at: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub scheduled_start: Option<Timestamp>,
    pub scheduled_end: Option<Timestamp>,
}

impl TemplateData {
    fn value(&self, field: Field) -> Option<String> {
        let text = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
        let time = |t: &Option<Timestamp>| t.as_ref().map(format_timestamp);

        match field {
            Field::ServiceName => text(&self.service_name),
            Field::ServiceGroupName => text(&self.service_group_name),
            Field::StartedAt => time(&self.started_at),
            Field::ResolvedAt => time(&self.resolved_at),
            Field::ScheduledStart => time(&self.scheduled_start),
            Field::ScheduledEnd => time(&self.scheduled_end),
        }
    }
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// The closed set of names a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ServiceName,
    ServiceGroupName,
    StartedAt,
    ResolvedAt,
    ScheduledStart,
    ScheduledEnd,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::ServiceName,
        Field::ServiceGroupName,
        Field::StartedAt,
        Field::ResolvedAt,
        Field::ScheduledStart,
        Field::ScheduledEnd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::ServiceName => "service_name",
            Field::ServiceGroupName => "service_group_name",
            Field::StartedAt => "started_at",
            Field::ResolvedAt => "resolved_at",
            Field::ScheduledStart => "scheduled_start",
            Field::ScheduledEnd => "scheduled_end",
        }
    }

    fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(Field),
    Section {
        field: Field,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// A section that has been opened but not yet closed.
struct OpenSection {
    field: Field,
    inverted: bool,
    offset: usize,
    /// Nodes of the enclosing scope collected before this section opened.
    outer: Vec<Node>,
}

/// A parsed template, ready to render any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack: Vec<OpenSection> = Vec::new();
        let mut pos = 0;

        while let Some(rel) = source[pos..].find(OPEN) {
            let tag_start = pos + rel;
            if tag_start > pos {
                nodes.push(Node::Text(source[pos..tag_start].to_string()));
            }

            let body_start = tag_start + OPEN.len();
            let body_len = source[body_start..]
                .find(CLOSE)
                .ok_or_else(|| TemplateError::parse(tag_start, "unterminated tag"))?;
            let body = source[body_start..body_start + body_len].trim();
            pos = body_start + body_len + CLOSE.len();

            if body.is_empty() {
                return Err(TemplateError::parse(tag_start, "empty tag"));
            }
            let caps = TAG_RE
                .captures(body)
                .ok_or_else(|| TemplateError::parse(tag_start, format!("malformed tag {body:?}")))?;
            let sigil = caps.get(1).map_or("", |m| m.as_str());
            let name = caps.get(2).map_or("", |m| m.as_str());
            let field = Field::from_name(name)
                .ok_or_else(|| TemplateError::parse(tag_start, format!("unknown field {name:?}")))?;

            match sigil {
                "#" | "^" => stack.push(OpenSection {
                    field,
                    inverted: sigil == "^",
                    offset: tag_start,
                    outer: std::mem::take(&mut nodes),
                }),
                "/" => {
                    let open = stack.pop().ok_or_else(|| {
                        TemplateError::parse(tag_start, format!("closing {name:?} without an open section"))
                    })?;
                    if open.field != field {
                        return Err(TemplateError::parse(
                            tag_start,
                            format!("closing {name:?} but {:?} is open", open.field.name()),
                        ));
                    }
                    let children = std::mem::replace(&mut nodes, open.outer);
                    nodes.push(Node::Section {
                        field,
                        inverted: open.inverted,
                        children,
                    });
                }
                _ => nodes.push(Node::Var(field)),
            }
        }

        if let Some(open) = stack.pop() {
            return Err(TemplateError::parse(
                open.offset,
                format!("section {:?} is never closed", open.field.name()),
            ));
        }

        if pos < source.len() {
            nodes.push(Node::Text(source[pos..].to_string()));
        }

        Ok(Self { nodes })
    }

    pub fn render(&self, data: &TemplateData) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, data, &mut out)?;
        Ok(out)
    }
}

fn render_nodes(nodes: &[Node], data: &TemplateData, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(field) => {
                let value = data
                    .value(*field)
                    .ok_or_else(|| TemplateError::Render(format!("no value for {:?}", field.name())))?;
                out.push_str(&value);
            }
            Node::Section {
                field,
                inverted,
                children,
            } => {
                if data.value(*field).is_some() != *inverted {
                    render_nodes(children, data, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Check template syntax without rendering.
pub fn validate(source: &str) -> Result<(), TemplateError> {
    Template::parse(source).map(|_| ())
}

/// Parse and render in one step.
pub fn render(source: &str, data: &TemplateData) -> Result<String, TemplateError> {
    Template::parse(source)?.render(data)
}
