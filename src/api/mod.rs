//! HTTP API exposing the toolkit to stateless worker processes
//!
//! Application handlers run in separate processes and share nothing but this
//! server, so every coordination primitive is one HTTP round trip mapping to
//! one atomic store operation.

pub mod http;
pub mod rest;
pub mod state;
