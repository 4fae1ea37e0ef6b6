//! HTTP/REST API layer for skillrt.
//!
//! Axum-based REST API at `/api/v1/` with an envelope response format and
//! CORS support. Every request nudges the presence tracker.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
