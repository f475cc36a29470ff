//! Positional Parameter Binding
//!
//! A template is document syntax with `#` placeholders:
//!
//! ```text
//! { count: # }                          1 placeholder
//! { geoNear: #, near: [#, #] }          3 placeholders
//! { name: 'a # inside quotes' }         0 placeholders
//! ```
//!
//! Binding happens in two steps:
//!
//! 1. **Substitute**: every placeholder is replaced, left to right, by the
//!    literal form of the next parameter (see [`Value`]'s `Display`).
//! 2. **Parse**: the substituted text is parsed as one document.
//!
//! String parameters are written as escaped, quoted literals, so a
//! parameter can never close its literal early and inject extra keys.

use crate::document::{Document, Value};
use crate::template::parser::parse_document;
use thiserror::Error;
use tracing::trace;

/// The placeholder token.
pub const PLACEHOLDER: u8 = b'#';

/// Errors that can occur while binding a template.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    /// Placeholder count and parameter count differ
    #[error("template has {placeholders} placeholder(s) but {params} parameter(s) were supplied")]
    Arity { placeholders: usize, params: usize },

    /// The substituted template is not a well-formed document
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
}

/// A template scanned once for its placeholder positions.
///
/// Scanning is cheap, but a `Template` kept around lets repeated binds skip
/// it entirely.
///
/// # Example
///
/// ```
/// use docbind::template::Template;
/// use docbind::params;
///
/// let template = Template::new("{ count: # }");
/// assert_eq!(template.placeholders(), 1);
///
/// let doc = template.bind(&params!["friends"]).unwrap();
/// assert_eq!(doc.to_string(), r#"{ "count" : "friends" }"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    /// Byte offsets of each placeholder, in order
    positions: Vec<usize>,
}

impl Template {
    /// Scans `text` for placeholders.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let positions = scan_placeholders(&text);
        Self { text, positions }
    }

    /// Number of placeholders in the template.
    pub fn placeholders(&self) -> usize {
        self.positions.len()
    }

    /// The template text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Binds `params` into the template and parses the result.
    pub fn bind(&self, params: &[Value]) -> Result<Document, BindError> {
        if self.positions.len() != params.len() {
            return Err(BindError::Arity {
                placeholders: self.positions.len(),
                params: params.len(),
            });
        }

        let substituted = self.substitute(params);
        trace!(
            placeholders = self.positions.len(),
            bound = %substituted,
            "Bound template"
        );
        parse_document(&substituted)
    }

    /// Replaces each placeholder with its parameter's literal form.
    fn substitute(&self, params: &[Value]) -> String {
        if params.is_empty() {
            return self.text.clone();
        }

        let mut out = String::with_capacity(self.text.len() + params.len() * 8);
        let mut last = 0;
        for (&pos, param) in self.positions.iter().zip(params) {
            out.push_str(&self.text[last..pos]);
            // Writing into a String cannot fail
            let _ = param.write_literal(&mut out);
            last = pos + 1;
        }
        out.push_str(&self.text[last..]);
        out
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template::new(text)
    }
}

/// Finds the byte offset of every placeholder outside quoted strings.
fn scan_placeholders(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut positions = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1; // skip the escaped byte
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                PLACEHOLDER => positions.push(i),
                _ => {}
            },
        }
        i += 1;
    }

    positions
}

/// Binds `params` into `template` and parses the resulting document.
///
/// # Example
///
/// ```
/// use docbind::template::bind;
/// use docbind::document::Value;
///
/// let doc = bind("{ count: #, limit: # }", &[Value::from("friends"), Value::from(10)]).unwrap();
/// assert_eq!(doc.get("count"), Some(&Value::from("friends")));
/// assert_eq!(doc.get("limit"), Some(&Value::Int(10)));
/// ```
pub fn bind(template: &str, params: &[Value]) -> Result<Document, BindError> {
    Template::new(template).bind(params)
}

/// Renders `params` into `template` without parsing, for diagnostics.
pub fn render(template: &str, params: &[Value]) -> Result<String, BindError> {
    let template = Template::new(template);
    if template.placeholders() != params.len() {
        return Err(BindError::Arity {
            placeholders: template.placeholders(),
            params: params.len(),
        });
    }
    Ok(template.substitute(params))
}
