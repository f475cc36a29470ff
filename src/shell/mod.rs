//! Interactive Shell
//!
//! A line-oriented front end over a [`Client`](crate::client::Client),
//! used by the `docbind` binary.
//!
//! ## Modules
//!
//! - `command`: Parsing of shell lines into [`ShellCommand`]
//! - `session`: The read-execute-reply loop ([`Session`])

pub mod command;
pub mod session;

pub use command::{LineError, ShellCommand};
pub use session::{Session, SessionError, SessionStats};
