//! Command Results
//!
//! A [`CommandResult`] wraps the raw response of an administrative command.
//! Decoding never looks at the success indicator; callers opt into
//! validation with [`CommandResult::throw_on_error`], which moves the
//! result from [`Unvalidated`] to [`Validated`].
//!
//! ```text
//!                        throw_on_error()
//! CommandResult<Unvalidated> ──────────────> CommandResult<Validated>
//!          │                    │
//!          │ outcome()          └──────────> Err(CommandFailure)
//!          ▼
//!   CommandOutcome::Ok | CommandOutcome::Failed
//! ```

use crate::decode::{from_document, Decode, DecodeError};
use crate::document::{Document, Value};
use crate::result::handler::ResultHandler;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::debug;

/// Message used when a failed response carries no `errmsg`.
const FALLBACK_MESSAGE: &str = "command failed";

/// Marker: the success indicator has not been checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unvalidated;

/// Marker: the response is known to report success.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated;

/// A command the engine executed and reported as failed.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct CommandFailure {
    /// The engine's `errmsg`, verbatim
    pub message: String,
    /// The engine's error code, when it sent one
    pub code: Option<i64>,
    /// The full failed response
    pub response: Document,
}

impl CommandFailure {
    fn from_response(response: &Document) -> Self {
        let message = match response.get("errmsg").and_then(Value::as_str) {
            Some(errmsg) => errmsg.to_string(),
            None => format!("{}: {}", FALLBACK_MESSAGE, response),
        };
        CommandFailure {
            message,
            code: response.get("code").and_then(Value::as_i64),
            response: response.clone(),
        }
    }
}

/// The two possible readings of a command response.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome<'a> {
    /// The engine reported success
    Ok(&'a Document),
    /// The engine reported a failure
    Failed(CommandFailure),
}

impl CommandOutcome<'_> {
    /// Returns true for a successful response.
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandOutcome::Ok(_))
    }
}

/// The response of an administrative command.
///
/// # Example
///
/// ```
/// use docbind::result::CommandResult;
/// use docbind::document::Document;
///
/// let failed = CommandResult::new(
///     Document::new().with("ok", 0.0).with("errmsg", "no such cmd: invalid"),
/// );
/// assert!(!failed.is_success());
///
/// let err = failed.throw_on_error().unwrap_err();
/// assert_eq!(err.message, "no such cmd: invalid");
/// ```
pub struct CommandResult<S = Unvalidated> {
    response: Document,
    _state: PhantomData<S>,
}

impl<S> Clone for CommandResult<S> {
    fn clone(&self) -> Self {
        Self {
            response: self.response.clone(),
            _state: PhantomData,
        }
    }
}

impl<S> fmt::Debug for CommandResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandResult")
            .field("state", &std::any::type_name::<S>())
            .field("response", &self.response)
            .finish()
    }
}

impl<S> fmt::Display for CommandResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.response, f)
    }
}

impl CommandResult<Unvalidated> {
    /// Wraps a raw command response.
    pub fn new(response: Document) -> Self {
        Self {
            response,
            _state: PhantomData,
        }
    }

    /// Checks the success indicator.
    ///
    /// Returns the validated result, or the engine's error message and code.
    pub fn throw_on_error(self) -> Result<CommandResult<Validated>, CommandFailure> {
        if let CommandOutcome::Failed(failure) = self.outcome() {
            debug!(errmsg = %failure.message, code = ?failure.code, "Command reported failure");
            return Err(failure);
        }
        Ok(CommandResult {
            response: self.response,
            _state: PhantomData,
        })
    }
}

impl<S> CommandResult<S> {
    /// True when `ok` equals `1.0`. A missing `ok` is a failure.
    pub fn is_success(&self) -> bool {
        match self.response.get("ok") {
            Some(Value::Double(ok)) => *ok == 1.0,
            Some(Value::Int(ok)) => *ok == 1,
            Some(Value::Bool(ok)) => *ok,
            _ => false,
        }
    }

    /// Reads the response as success or failure.
    pub fn outcome(&self) -> CommandOutcome<'_> {
        if self.is_success() {
            CommandOutcome::Ok(&self.response)
        } else {
            CommandOutcome::Failed(CommandFailure::from_response(&self.response))
        }
    }

    /// The raw response.
    pub fn document(&self) -> &Document {
        &self.response
    }

    /// A top-level field of the response.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.response.get(key)
    }

    /// The engine's `errmsg`, if present.
    pub fn error_message(&self) -> Option<&str> {
        self.response.get("errmsg").and_then(Value::as_str)
    }

    /// The engine's error `code`, if present.
    pub fn error_code(&self) -> Option<i64> {
        self.response.get("code").and_then(Value::as_i64)
    }

    /// Consumes the result and returns the raw response.
    pub fn into_document(self) -> Document {
        self.response
    }

    /// Passes the raw response to a handler.
    pub fn map<R, H: ResultHandler<R>>(&self, handler: H) -> R {
        handler.map(&self.response)
    }

    /// Decodes the response into `T`.
    pub fn as_type<T: Decode>(&self) -> Result<T, DecodeError> {
        T::decode_document(&self.response)
    }

    /// Decodes the response through serde.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        from_document(&self.response)
    }
}
