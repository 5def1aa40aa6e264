//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; the subscriber is initialized by the
//!   binary, never by the library
//! - Metric updates are cheap (atomic increments); the exporter is
//!   optional and off by default
//! - Secrets, cookie names and session ids never appear in log fields

pub mod metrics;
