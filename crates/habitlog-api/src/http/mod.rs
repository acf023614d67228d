//! HTTP/REST transport for habitlog.
//!
//! Axum-based REST API at `/api/v1/` exposing the conversation, stats and
//! timezone operations with an envelope response format and CORS support.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
