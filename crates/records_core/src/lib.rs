//! Shared record service domain primitives.
//!
//! This crate owns the record model, the HTTP request/response contract,
//! routing, cursor encoding, and retry policy. It intentionally excludes AWS
//! SDK and Lambda runtime concerns, which live in `records_lambda`.

pub mod contract;
pub mod cursor;
pub mod http;
pub mod record;
pub mod retry;
pub mod routing;
