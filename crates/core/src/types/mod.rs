//! Core type definitions for vibegate.
//!
//! Broken down into submodules for better maintainability.

pub mod agent;
pub mod audit;
pub mod chat;

pub use agent::*;
pub use audit::*;
pub use chat::*;
