//! The uniform command contract.
//!
//! The routing collaborator answers a request with an ordered list of
//! values implementing [`Command`]. The dispatcher only ever sees this
//! contract: run the work, ask for cache contributions, and check the
//! hanging-activity flag.

use async_trait::async_trait;
use thiserror::Error;

use crate::session::Session;

/// The value a command produces for rendering.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub value: serde_json::Value,
}

impl CommandResult {
    pub fn empty() -> Self {
        Self {
            value: serde_json::Value::Null,
        }
    }
}

/// What a command asks the dispatcher to do next.
///
/// Redirects and output suppression are ordinary outcomes here, not
/// errors; the dispatcher pattern-matches instead of catching.
pub enum CommandOutcome {
    /// Work finished; the result may drive rendering.
    Done(CommandResult),
    /// Send the client elsewhere instead of rendering.
    Redirect(String),
    /// Send nothing at all and close the connection.
    SuppressOutput,
}

/// Failure modes a command can report.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("access denied")]
    AccessDenied,
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Failed(String),
}

/// A single executable unit of work for one request.
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute against the request's session.
    async fn run(&self, session: &mut Session) -> Result<CommandOutcome, CommandError>;

    /// This command's cache-lifetime contribution, in seconds.
    fn max_age(&self) -> u64 {
        10
    }

    /// Opaque fingerprint fragments for the response ETag. An empty list
    /// means this command cannot be fingerprinted, which disables
    /// conditional caching for the whole request.
    fn etag_data(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether execution may block for a long time (streaming, waiting on
    /// external events). Hanging work gives its concurrency slot back for
    /// the duration so it cannot stall a quiesce.
    fn is_hanging_activity(&self) -> bool {
        false
    }
}
