//! Prompt templates with `{variable}` placeholders.
//!
//! Syntax follows the brace style used in pipeline documents: `{name}` is a
//! variable, `{{` and `}}` are literal braces. Templates are parsed once when a
//! step is built, so malformed templates fail at load time rather than mid-run.

use crate::error::{MetacogError, MetacogResult};
use crate::types::Inputs;

/// Whether a variable absent from the inputs is an error (`true`) or renders
/// as an empty string (`false`).
pub const STRICT_TEMPLATE_VARS: bool = true;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl PromptTemplate {
    pub fn parse(source: impl Into<String>) -> MetacogResult<Self> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(invalid(&source, "nested '{' in placeholder")),
                            other => field.push(other),
                        }
                    }
                    if !closed {
                        return Err(invalid(&source, "unclosed '{'"));
                    }

                    // Format specs and conversions (`{x:>8}`, `{x!r}`) are not
                    // rendered; only the field name matters.
                    let name = field
                        .split([':', '!'])
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    if name.is_empty() {
                        return Err(invalid(&source, "empty placeholder"));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    if !variables.contains(&name) {
                        variables.push(name.clone());
                    }
                    segments.push(Segment::Var(name));
                }
                '}' => return Err(invalid(&source, "single '}' outside a placeholder")),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source,
            segments,
            variables,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct variable names in order of first appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Render against chain inputs using [`STRICT_TEMPLATE_VARS`].
    pub fn format(&self, inputs: &Inputs) -> MetacogResult<String> {
        self.render(|key| inputs.get(key), STRICT_TEMPLATE_VARS)
    }

    /// Render with an arbitrary lookup. Only the variables the template
    /// references are looked up.
    pub fn render<'a, F>(&self, lookup: F, strict: bool) -> MetacogResult<String>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(name) => match lookup(name) {
                    Some(value) => out.push_str(value),
                    None if strict => {
                        return Err(MetacogError::MissingTemplateKey { key: name.clone() })
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }
}

fn invalid(template: &str, message: &str) -> MetacogError {
    MetacogError::InvalidTemplate {
        template: template.to_string(),
        message: message.to_string(),
    }
}
