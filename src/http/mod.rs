//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the convert and download endpoints
//! - Multipart upload streaming into the artifact store
//! - Single-use download streams that delete their file
//! - Health, version and artifact statistics endpoints
//! - Static client files, CORS and request tracing

pub mod convert;
pub mod download;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
