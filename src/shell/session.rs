//! Shell Session
//!
//! A [`Session`] reads lines from any `AsyncRead`, runs them against a
//! [`Client`] and writes replies to any `AsyncWrite`.
//!
//! ## Session Lifecycle
//!
//! ```text
//! ┌──────────────────────────────┐
//! │      Main Loop               │
//! │                              │
//! │  ┌─────────────────────────┐ │
//! │  │ Take a line from buffer │◄├──── read more bytes
//! │  └───────────┬─────────────┘ │
//! │              ▼               │
//! │  ┌─────────────────────────┐ │
//! │  │ Parse ShellCommand      │ │
//! │  └───────────┬─────────────┘ │
//! │              ▼               │
//! │  ┌─────────────────────────┐ │
//! │  │ Execute via Client      │ │
//! │  └───────────┬─────────────┘ │
//! │              ▼               │
//! │  ┌─────────────────────────┐ │
//! │  │ Write reply             │ │
//! │  └─────────────────────────┘ │
//! └──────────────────────────────┘
//!        │
//!        ▼
//!  EOF or `quit`
//! ```
//!
//! Input is accumulated in a `BytesMut` buffer; a read may carry half a
//! line or several lines.

use crate::client::Client;
use crate::shell::command::ShellCommand;
use bytes::BytesMut;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Maximum length of one input line (64 KB)
const MAX_LINE_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

const HELP: &str = "\
commands:
  run <template> [| <json params>]              run a command
  insert <coll> <template> [| <json params>]    insert a document
  index <coll> <template>                       create an index
  find <coll> [<template> [| <json params>]]    query a collection
  count <coll>                                  count documents
  help                                          show this message
  quit                                          leave the shell
";

/// Statistics for shell sessions
#[derive(Debug, Default)]
pub struct SessionStats {
    pub lines_processed: AtomicU64,
    pub errors: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_processed(&self) {
        self.lines_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// I/O error on the input or output
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A line is not valid UTF-8
    #[error("input is not valid UTF-8")]
    InvalidUtf8,

    /// A line exceeded the size limit
    #[error("line exceeds {MAX_LINE_SIZE} bytes")]
    LineTooLong,
}

/// What to do after a line.
enum Reply {
    Output(String),
    Quit,
}

/// An interactive shell session.
pub struct Session<R, W> {
    /// Line input
    reader: R,

    /// Reply output
    writer: BufWriter<W>,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Database handle the lines run against
    client: Client,

    /// Written before each line when set
    prompt: Option<String>,

    /// Session statistics (shared)
    stats: Arc<SessionStats>,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, client: Client, stats: Arc<SessionStats>) -> Self {
        Self {
            reader,
            writer: BufWriter::new(writer),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            client,
            prompt: None,
            stats,
        }
    }

    /// Writes `prompt` before reading each line.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Runs until end of input or `quit`.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        info!(db = self.client.database(), "Shell session started");

        let result = self.main_loop().await;
        match &result {
            Ok(()) => info!("Shell session ended"),
            Err(e) => warn!(error = %e, "Shell session failed"),
        }
        result
    }

    /// Gives back the reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer.into_inner())
    }

    async fn main_loop(&mut self) -> Result<(), SessionError> {
        self.send_prompt().await?;
        loop {
            while let Some(line) = self.try_take_line(false)? {
                if !self.process_line(&line).await? {
                    return Ok(());
                }
                self.send_prompt().await?;
            }

            if !self.read_more_data().await? {
                // Input ended; a last line may lack its terminator
                if let Some(line) = self.try_take_line(true)? {
                    self.process_line(&line).await?;
                }
                return Ok(());
            }
        }
    }

    /// Runs one line and writes its reply. Returns false on `quit`.
    async fn process_line(&mut self, line: &str) -> Result<bool, SessionError> {
        self.stats.line_processed();
        trace!(line = line, "Processing line");

        match self.execute(line) {
            Reply::Output(text) => {
                self.send(&text).await?;
                Ok(true)
            }
            Reply::Quit => Ok(false),
        }
    }

    /// Takes one complete line out of the buffer.
    fn try_take_line(&mut self, at_eof: bool) -> Result<Option<String>, SessionError> {
        let end = match self.buffer.iter().position(|&b| b == b'\n') {
            Some(end) => end + 1,
            None if at_eof && !self.buffer.is_empty() => self.buffer.len(),
            None => return Ok(None),
        };

        let raw = self.buffer.split_to(end);
        let line = std::str::from_utf8(&raw).map_err(|_| SessionError::InvalidUtf8)?;
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Reads more input. Returns false at end of input.
    async fn read_more_data(&mut self) -> Result<bool, SessionError> {
        if self.buffer.len() >= MAX_LINE_SIZE {
            return Err(SessionError::LineTooLong);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(false);
        }

        self.stats.bytes_read(n);
        trace!(bytes = n, "Read data");
        Ok(true)
    }

    async fn send_prompt(&mut self) -> Result<(), SessionError> {
        if let Some(prompt) = self.prompt.clone() {
            self.send(&prompt).await?;
        }
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(text.len());
        Ok(())
    }

    fn execute(&self, line: &str) -> Reply {
        let command = match ShellCommand::parse(line) {
            Ok(command) => command,
            Err(e) => return self.error(e),
        };

        let output = match command {
            ShellCommand::Empty => Ok(String::new()),
            ShellCommand::Help => Ok(HELP.to_string()),
            ShellCommand::Quit => return Reply::Quit,
            ShellCommand::Run { template, params } => self
                .client
                .run_command(&template, &params)
                .map(|result| format!("{}\n", result)),
            ShellCommand::Insert {
                collection,
                template,
                params,
            } => self
                .client
                .collection(&collection)
                .insert(&template, &params)
                .map(|()| "{ \"n\" : 1, \"ok\" : 1.0 }\n".to_string()),
            ShellCommand::Index {
                collection,
                template,
            } => self
                .client
                .collection(&collection)
                .ensure_index(&template, &[])
                .map(|()| "{ \"ok\" : 1.0 }\n".to_string()),
            ShellCommand::Find {
                collection,
                template,
                params,
            } => self
                .client
                .collection(&collection)
                .find(&template, &params)
                .map(|found| {
                    let mut out = String::new();
                    for doc in found.documents() {
                        let _ = writeln!(out, "{}", doc);
                    }
                    out
                }),
            ShellCommand::Count { collection } => self
                .client
                .collection(&collection)
                .count()
                .map(|n| format!("{}\n", n)),
        };

        match output {
            Ok(text) => Reply::Output(text),
            Err(e) => self.error(e),
        }
    }

    fn error(&self, e: impl std::fmt::Display) -> Reply {
        self.stats.error();
        debug!(error = %e, "Line failed");
        Reply::Output(format!("(error) {}\n", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;

    fn client() -> Client {
        Client::new(Arc::new(MemoryEngine::new()), "test")
    }

    async fn run_script(script: &str) -> (String, Arc<SessionStats>) {
        let stats = Arc::new(SessionStats::new());
        let mut session = Session::new(script.as_bytes(), Vec::new(), client(), Arc::clone(&stats));
        session.run().await.unwrap();
        let (_, output) = session.into_parts();
        (String::from_utf8(output).unwrap(), stats)
    }

    #[tokio::test]
    async fn test_run_ping() {
        let (output, stats) = run_script("run { ping: 1 }\n").await;
        assert_eq!(output, "{ \"ok\" : 1.0 }\n");
        assert_eq!(stats.lines_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_insert_find_count() {
        let script = "\
insert friends { _id: 1, name: # } | [\"Ann\"]
insert friends { _id: 2, name: # } | [\"Bob\"]
find friends { name: 'Bob' }
count friends
";
        let (output, stats) = run_script(script).await;
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "{ \"n\" : 1, \"ok\" : 1.0 }",
                "{ \"n\" : 1, \"ok\" : 1.0 }",
                "{ \"_id\" : 2, \"name\" : \"Bob\" }",
                "2",
            ]
        );
        assert_eq!(stats.errors.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_errors_keep_session_alive() {
        let script = "run { count: # }\nfly\nrun { ping: 1 }";
        let (output, stats) = run_script(script).await;
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("(error) bind error:"));
        assert_eq!(lines[1], "(error) unknown command 'fly', try 'help'");
        assert_eq!(lines[2], "{ \"ok\" : 1.0 }");
        assert_eq!(stats.errors.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_failed_command_prints_response() {
        let (output, stats) = run_script("run { forceerror: 1 }\n").await;
        assert!(output.contains("\"errmsg\" : \"exception: forced error\""));
        assert_eq!(stats.errors.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_quit_stops_reading() {
        let (output, stats) = run_script("quit\nrun { ping: 1 }\n").await;
        assert!(output.is_empty());
        assert_eq!(stats.lines_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_scripted_io() {
        let mock = tokio_test::io::Builder::new()
            .read(b"run { count: 'friends' }\n")
            .write(b"{ \"n\" : 0.0, \"ok\" : 1.0 }\n")
            .read(b"run { invalid: 1 }\r\n")
            .write(b"{ \"ok\" : 0.0, \"errmsg\" : \"no such cmd: invalid\", \"code\" : 59, \"bad cmd\" : { \"invalid\" : 1 } }\n")
            .build();
        let (reader, writer) = tokio::io::split(mock);

        let stats = Arc::new(SessionStats::new());
        let mut session = Session::new(reader, writer, client(), Arc::clone(&stats));
        session.run().await.unwrap();
        assert_eq!(stats.lines_processed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_prompt() {
        let stats = Arc::new(SessionStats::new());
        let mut session =
            Session::new("help\n".as_bytes(), Vec::new(), client(), stats).with_prompt("> ");
        session.run().await.unwrap();
        let (_, output) = session.into_parts();
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("> commands:"));
        assert!(output.ends_with("> "));
    }
}
