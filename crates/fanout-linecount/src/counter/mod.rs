//! Line-match counting on top of the `fanout` dispatcher.
//!
//! ## Structure
//!
//! - [`config`] - CLI arguments and validated runtime settings.
//! - [`source`] - Opening files and URLs as line readers.
//! - [`job`] - The per-source counting job and its result.
//! - [`report`] - Result aggregation and the printed report.
//! - [`run`] - End-to-end orchestration.
//! - [`telemetry`] - Logging, spans and metrics.

pub mod config;
pub mod job;
pub mod report;
pub mod run;
pub mod source;
pub mod telemetry;

#[cfg(test)]
mod testing;
