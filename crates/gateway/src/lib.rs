#![deny(unused)]
//! Admission pipeline and HTTP entry point for vibegate.
//!
//! Every inbound completion request passes the ordered pipeline (identity,
//! rate limit, content screen, upstream forward, settlement, audit) before
//! a response leaves the gateway.

pub mod pipeline;
pub mod server;

pub use pipeline::{AdmissionPipeline, CHAT_ENDPOINT};
pub use server::{GatewayConfig, GatewayServer};
