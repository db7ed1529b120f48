#![deny(unused)]
//! Upstream provider clients for vibegate.
//!
//! This crate provides:
//! - An OpenAI-compatible HTTP client
//! - A mock provider for development and tests
//! - The flat cost model applied at settlement

pub mod mock;
pub mod openai;
pub mod pricing;

pub use mock::MockUpstream;
pub use openai::OpenAiCompatClient;
pub use pricing::CostModel;
