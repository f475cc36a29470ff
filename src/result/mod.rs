//! Result Interpretation
//!
//! This module gives typed access to engine responses.
//!
//! ## Modules
//!
//! - `command`: [`CommandResult`], its validation states and [`CommandFailure`]
//! - `query`: [`QueryResult`], the documents returned by a query
//! - `handler`: The [`ResultHandler`] mapping trait
//!
//! Command responses carry a success indicator (`ok`); query responses do
//! not. Each has its own type so the two are never confused.

pub mod command;
pub mod handler;
pub mod query;

pub use command::{CommandFailure, CommandOutcome, CommandResult, Unvalidated, Validated};
pub use handler::{RawDocumentHandler, ResultHandler};
pub use query::QueryResult;
