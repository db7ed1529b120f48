#![deny(unused)]
//! Core types, traits, and error definitions for vibegate.
//!
//! This crate provides the foundational building blocks shared across all
//! layers of the admission gateway.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
