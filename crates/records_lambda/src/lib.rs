//! AWS-oriented adapters and handlers for the record service.
//!
//! This crate owns runtime integration details (the Lambda entrypoint, the
//! DynamoDB storage adapter, configuration, and logging). Routing, validation,
//! and the record model come from `records_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
