//! Testing utilities for kafka_pubsub
//!
//! Test infrastructure for exercising the transport without a broker. It's
//! only compiled when running tests.
//!
//! # Organization
//! - `mocks.rs` - mockall doubles of the broker client traits
//! - `helpers.rs` - Record fixtures and a loopback client factory

#![cfg(test)]

pub mod helpers;
pub mod mocks;

// Re-export commonly used items
pub use helpers::{request_record, StubClients};
pub use mocks::mock_config;
