//! Crate Error Type
//!
//! [`Error`] collects every failure a client call can produce. Transport
//! failures and logical command failures stay distinct variants.

use crate::decode::DecodeError;
use crate::engine::TransportError;
use crate::result::CommandFailure;
use crate::template::BindError;
use thiserror::Error;

/// Errors returned by [`Client`](crate::client::Client) and
/// [`Collection`](crate::client::Collection).
#[derive(Debug, Error)]
pub enum Error {
    /// The template could not be bound
    #[error("bind error: {0}")]
    Bind(#[from] BindError),

    /// The engine round trip failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The engine executed the command and reported failure
    #[error("command failed: {0}")]
    Command(#[from] CommandFailure),

    /// The response could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
