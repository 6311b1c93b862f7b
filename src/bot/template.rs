//! A small logic-less template language for Telegram's HTML dialect.
//!
//! Literal text is copied as is, and is expected to be trusted markup. Everything interpolated
//! from `{{ field }}` tags is HTML-escaped. The supported tags are:
//!
//! - `{{ path }}`: the value of a field
//! - `{{ truncate path N }}`: the value of a field, cut to `N` characters
//! - `{{#if path}} ... {{else}} ... {{/if}}`: conditional section, `else` is optional
//!
//! A template is parsed completely before being rendered, so syntax errors never produce partial
//! output.

use std::fmt::{self, Write};

use thiserror::Error;
use tracing::trace;

use crate::bot::utils::truncate;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid template at byte {position}: {message}")]
pub struct TemplateSyntaxError {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("template references unknown field `{field}`")]
pub struct RenderExecutionError {
    pub field: String,
}

/// A value a template can interpolate or test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Text(&'a str),
    Number(u64),
    Bool(bool),
}

impl Value<'_> {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Text(text) => !text.is_empty(),
            Value::Number(number) => *number != 0,
            Value::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{}", number),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Anything templates can look fields up in, by dotted path.
pub trait FieldSource {
    fn field(&self, path: &str) -> Option<Value<'_>>;
}

#[derive(Debug, PartialEq, Eq)]
enum Node<'t> {
    Text(&'t str),
    Field {
        path: &'t str,
        truncate: Option<usize>,
    },
    If {
        path: &'t str,
        then: Vec<Node<'t>>,
        otherwise: Vec<Node<'t>>,
    },
}

enum Tag<'t> {
    Node(Node<'t>),
    If(&'t str),
    Else,
    EndIf,
}

/// An `#if` block whose `/if` hasn't been reached yet.
struct OpenBlock<'t> {
    path: &'t str,
    position: usize,
    then: Vec<Node<'t>>,
    otherwise: Option<Vec<Node<'t>>>,
}

impl<'t> OpenBlock<'t> {
    fn nodes(&mut self) -> &mut Vec<Node<'t>> {
        match self.otherwise {
            Some(ref mut otherwise) => otherwise,
            None => &mut self.then,
        }
    }

    fn close(self) -> Node<'t> {
        Node::If {
            path: self.path,
            then: self.then,
            otherwise: self.otherwise.unwrap_or_default(),
        }
    }
}

#[derive(Debug)]
pub struct Template<'t> {
    nodes: Vec<Node<'t>>,
}

impl<'t> Template<'t> {
    pub fn parse(source: &'t str) -> Result<Self, TemplateSyntaxError> {
        let mut root = Vec::new();
        let mut blocks: Vec<OpenBlock<'t>> = Vec::new();

        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            let position = offset + start;
            let inner = &rest[start + OPEN.len()..];
            let end = inner
                .find(CLOSE)
                .ok_or_else(|| syntax_error(position, "unterminated tag"))?;

            let tag = parse_tag(inner[..end].trim(), position)?;
            if start > 0 {
                current_nodes(&mut root, &mut blocks).push(Node::Text(&rest[..start]));
            }

            match tag {
                Tag::Node(node) => current_nodes(&mut root, &mut blocks).push(node),
                Tag::If(path) => blocks.push(OpenBlock {
                    path,
                    position,
                    then: Vec::new(),
                    otherwise: None,
                }),
                Tag::Else => match blocks.last_mut() {
                    Some(block) if block.otherwise.is_none() => block.otherwise = Some(Vec::new()),
                    Some(_) => return Err(syntax_error(position, "duplicate `else` in `#if` block")),
                    None => return Err(syntax_error(position, "`else` outside of an `#if` block")),
                },
                Tag::EndIf => {
                    let block = blocks
                        .pop()
                        .ok_or_else(|| syntax_error(position, "`/if` without a matching `#if`"))?;
                    current_nodes(&mut root, &mut blocks).push(block.close());
                }
            }

            let consumed = start + OPEN.len() + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if let Some(block) = blocks.last() {
            return Err(syntax_error(block.position, "unclosed `#if` block"));
        }
        if !rest.is_empty() {
            root.push(Node::Text(rest));
        }

        trace!("parsed template into {} top-level nodes", root.len());
        Ok(Self { nodes: root })
    }

    pub fn render(&self, fields: &impl FieldSource) -> Result<String, RenderExecutionError> {
        let mut output = String::new();
        render_nodes(&self.nodes, fields, &mut output)?;
        Ok(output)
    }
}

/// The node list new nodes go to: the innermost open block, or the top level.
fn current_nodes<'a, 't>(
    root: &'a mut Vec<Node<'t>>,
    blocks: &'a mut [OpenBlock<'t>],
) -> &'a mut Vec<Node<'t>> {
    match blocks.last_mut() {
        Some(block) => block.nodes(),
        None => root,
    }
}

fn syntax_error(position: usize, message: &str) -> TemplateSyntaxError {
    TemplateSyntaxError {
        position,
        message: message.to_owned(),
    }
}

fn parse_tag(content: &str, position: usize) -> Result<Tag<'_>, TemplateSyntaxError> {
    if content.is_empty() {
        return Err(syntax_error(position, "empty tag"));
    }

    let words = content.split_whitespace().collect::<Vec<_>>();

    if let Some(keyword) = content.strip_prefix('#') {
        return match words.as_slice() {
            ["#if", path] => Ok(Tag::If(field_path(*path, position)?)),
            ["#if", ..] => Err(syntax_error(position, "`#if` expects exactly one field")),
            _ => Err(syntax_error(
                position,
                &format!("unknown block `#{}`", keyword.split_whitespace().next().unwrap_or("")),
            )),
        };
    }

    match words.as_slice() {
        ["/if"] => Ok(Tag::EndIf),
        ["else"] => Ok(Tag::Else),
        ["truncate"] => Err(syntax_error(
            position,
            "`truncate` expects a field and a length",
        )),
        [path] => Ok(Tag::Node(Node::Field {
            path: field_path(*path, position)?,
            truncate: None,
        })),
        ["truncate", path, max] => {
            let max = max.parse::<usize>().map_err(|_| {
                syntax_error(position, "`truncate` expects a field and a length")
            })?;
            Ok(Tag::Node(Node::Field {
                path: field_path(*path, position)?,
                truncate: Some(max),
            }))
        }
        ["truncate", ..] => Err(syntax_error(
            position,
            "`truncate` expects a field and a length",
        )),
        [helper, ..] => Err(syntax_error(
            position,
            &format!("unknown helper `{}`", helper),
        )),
        [] => Err(syntax_error(position, "empty tag")),
    }
}

fn field_path(path: &str, position: usize) -> Result<&str, TemplateSyntaxError> {
    let valid = path
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));

    if valid {
        Ok(path)
    } else {
        Err(syntax_error(position, &format!("invalid field `{}`", path)))
    }
}

fn lookup<'a>(fields: &'a impl FieldSource, path: &str) -> Result<Value<'a>, RenderExecutionError> {
    fields.field(path).ok_or_else(|| RenderExecutionError {
        field: path.to_owned(),
    })
}

fn render_nodes(
    nodes: &[Node],
    fields: &impl FieldSource,
    output: &mut String,
) -> Result<(), RenderExecutionError> {
    for node in nodes {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Field { path, truncate: max } => {
                let value = lookup(fields, path)?;
                let mut escaped = HtmlEscaper(&mut *output);
                match max {
                    Some(max) => escaped
                        .write_str(&truncate(&value.to_string(), *max))
                        .unwrap(),
                    None => write!(escaped, "{}", value).unwrap(),
                }
            }
            Node::If {
                path,
                then,
                otherwise,
            } => {
                let branch = if lookup(fields, path)?.is_truthy() {
                    then
                } else {
                    otherwise
                };
                render_nodes(branch, fields, output)?;
            }
        }
    }

    Ok(())
}

/// Writes text into the inner buffer, escaping characters that have a special meaning in HTML.
struct HtmlEscaper<'a>(&'a mut String);

impl Write for HtmlEscaper<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut last = 0;
        for (i, c) in s.char_indices() {
            // NOTE: adapted from rustdoc/html/escape.rs
            let escaped = match c {
                '>' => "&gt;",
                '<' => "&lt;",
                '&' => "&amp;",
                '\'' => "&#39;",
                '"' => "&quot;",
                _ => continue,
            };

            self.0.push_str(&s[last..i]);
            self.0.push_str(escaped);
            last = i + 1;
        }

        if last < s.len() {
            self.0.push_str(&s[last..]);
        }

        Ok(())
    }
}
