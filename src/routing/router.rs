//! The routing collaborator seam.
//!
//! # Responsibilities
//! - Map a request (method, path, parameters) to an ordered command list
//! - Report no-match as an explicit usage error so the dispatcher can try
//!   the trailing-slash correction
//!
//! # Design Decisions
//! - The command/URL map belongs to the wider application; this crate only
//!   defines the contract it must satisfy

use thiserror::Error;

use crate::http::request::RequestContext;
use crate::routing::command::Command;
use crate::session::Session;

/// Failure modes of route resolution.
#[derive(Debug, Error)]
pub enum RouteError {
    /// No route matches the path as given.
    #[error("no route matches {0}")]
    Usage(String),
    /// The route exists but this request may not use it.
    #[error("access denied")]
    AccessDenied,
    #[error("{0}")]
    Internal(String),
}

/// Maps requests to executable command lists.
pub trait CommandRouter: Send + Sync {
    fn map(
        &self,
        ctx: &RequestContext,
        session: &Session,
    ) -> Result<Vec<Box<dyn Command>>, RouteError>;
}
