//! Shared model types for the vaultsync backup engine.
//!
//! Pure data: platforms and auth shapes, endpoint catalog entries,
//! sources and jobs, the structured connector error model, and the
//! watermark state used for incremental fetches. No I/O lives here so
//! every other crate can depend on this one without cycles.

#![warn(clippy::pedantic)]

pub mod endpoint;
pub mod error;
pub mod ids;
pub mod job;
pub mod platform;
pub mod record;
pub mod source;
pub mod watermark;
