//! AWS Comprehend implementation of
//! [`EntityExtractor`](comprehend_core::extractor::EntityExtractor).
//!
//! Speaks the JSON 1.1 protocol directly over `reqwest` and signs each
//! request with Signature Version 4 ([`sigv4`]).

mod client;
pub mod error;
pub mod sigv4;

pub use client::{ClientConfig, ComprehendClient, Credentials, DEFAULT_REGION};
pub use error::{Error, Result};
