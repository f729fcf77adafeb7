//! Core types and trait definitions for running table rows through an
//! entity-extraction service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! SQLite store and the Comprehend client implement the traits defined here;
//! [`pipeline::run`] drives them.

pub mod entity;
pub mod error;
pub mod extractor;
pub mod job;
pub mod key;
pub mod pipeline;
pub mod store;
pub mod text;

pub use error::{Error, Result};

/// Maximum number of documents the service accepts in one batch call.
pub const BATCH_SIZE: usize = 25;

/// Language code sent with every batch.
pub const LANGUAGE_CODE: &str = "en";
