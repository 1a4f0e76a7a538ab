//! HTTP API Module
//!
//! Provides the client-facing REST API and the internal replication routes.

mod http;

pub use http::{HttpServer, AppState, Session, ListPostsResponse, HealthResponse, ErrorResponse, SESSION_HEADER, SESSION_COOKIE};
