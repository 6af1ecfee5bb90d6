//! Job orchestration for the vaultsync backup engine.
//!
//! Takes a configured [`Source`](vaultsync_types::source::Source) through
//! one run: connector construction, credential test, dependency-ordered
//! endpoint execution with retry and partial-failure semantics, progress
//! tracking, and terminal status classification.

#![warn(clippy::pedantic)]

pub mod cancel;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod result;

pub use cancel::CancellationToken;
pub use errors::JobError;
pub use orchestrator::{CredentialResolver, Orchestrator, StaticCredentials};
pub use result::{EndpointReport, JobResult};
