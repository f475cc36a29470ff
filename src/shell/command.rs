//! Shell Line Parsing
//!
//! Turns one input line into a [`ShellCommand`]. Parameters follow the
//! template after a `|`, as a JSON array:
//!
//! ```text
//! run { count: # } | ["friends"]
//! insert friends { name: #, age: # } | ["Ann", 31]
//! index friends { loc: '2d' }
//! find friends { age: { $gte: # } } | [18]
//! count friends
//! ```

use crate::document::Value;
use thiserror::Error;

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Run a command template against the database
    Run { template: String, params: Vec<Value> },
    /// Insert a document into a collection
    Insert {
        collection: String,
        template: String,
        params: Vec<Value>,
    },
    /// Create an index on a collection
    Index { collection: String, template: String },
    /// Query a collection
    Find {
        collection: String,
        template: String,
        params: Vec<Value>,
    },
    /// Count the documents of a collection
    Count { collection: String },
    Help,
    Quit,
    /// Blank line
    Empty,
}

/// Errors in a shell line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineError {
    #[error("unknown command '{0}', try 'help'")]
    UnknownCommand(String),

    #[error("'{command}' requires {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("parameters must be a JSON array: {0}")]
    InvalidParams(String),
}

impl ShellCommand {
    /// Parses one line, without its terminator.
    pub fn parse(line: &str) -> Result<Self, LineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ShellCommand::Empty);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_lowercase().as_str() {
            "run" => {
                let (template, params) = split_params(required(rest, "run", "a template")?)?;
                Ok(ShellCommand::Run { template, params })
            }
            "insert" => {
                let (collection, rest) = collection_and_rest(rest, "insert")?;
                let (template, params) = split_params(rest)?;
                Ok(ShellCommand::Insert {
                    collection,
                    template,
                    params,
                })
            }
            "index" => {
                let (collection, rest) = collection_and_rest(rest, "index")?;
                Ok(ShellCommand::Index {
                    collection,
                    template: rest.to_string(),
                })
            }
            "find" => {
                let (collection, rest) = match rest.split_once(char::is_whitespace) {
                    Some((collection, rest)) => (collection.to_string(), rest.trim()),
                    None => (required(rest, "find", "a collection")?.to_string(), "{ }"),
                };
                let (template, params) = split_params(rest)?;
                Ok(ShellCommand::Find {
                    collection,
                    template,
                    params,
                })
            }
            "count" => Ok(ShellCommand::Count {
                collection: required(rest, "count", "a collection")?.to_string(),
            }),
            "help" | "?" => Ok(ShellCommand::Help),
            "quit" | "exit" => Ok(ShellCommand::Quit),
            other => Err(LineError::UnknownCommand(other.to_string())),
        }
    }
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, LineError> {
    if rest.is_empty() {
        Err(LineError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

fn collection_and_rest<'a>(
    rest: &'a str,
    command: &'static str,
) -> Result<(String, &'a str), LineError> {
    let (collection, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or(LineError::MissingArgument {
            command,
            argument: "a collection and a template",
        })?;
    Ok((collection.to_string(), rest.trim()))
}

/// Splits `template | [params]`. The last `|` followed by a `[` starts the
/// parameters; any other `|` belongs to the template.
fn split_params(text: &str) -> Result<(String, Vec<Value>), LineError> {
    let split = text
        .rfind('|')
        .filter(|&at| text[at + 1..].trim_start().starts_with('['));

    let (template, params) = match split {
        Some(at) => (text[..at].trim(), text[at + 1..].trim()),
        None => return Ok((text.to_string(), Vec::new())),
    };

    let json: serde_json::Value =
        serde_json::from_str(params).map_err(|e| LineError::InvalidParams(e.to_string()))?;
    match json {
        serde_json::Value::Array(values) => Ok((
            template.to_string(),
            values.into_iter().map(Value::from).collect(),
        )),
        _ => Err(LineError::InvalidParams("not an array".to_string())),
    }
}
