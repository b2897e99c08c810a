//! Library half of `dream`: the translate pipeline behind the binary.
//!
//! Exposed so integration tests can drive the pipeline with a substitute
//! [`engine::BuildEngine`] instead of a real build engine.

pub mod catalog;
pub mod config;
pub mod consolidate;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hash_extract;
pub mod ipc;
pub mod lockfile;
pub mod request;
pub mod resolve;
pub mod special_args;
pub mod telemetry;
pub mod translate;
pub mod validate;
