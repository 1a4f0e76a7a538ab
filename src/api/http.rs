//! HTTP API Server
//!
//! Public routes for clients plus the `/internal` routes peers use to pull
//! and push replicated records.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Json, Query, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::node::ReplicaNode;
use crate::replication::protocol::{SinceQuery, INTERNAL_CLEARS, INTERNAL_POSTS};
use crate::store::{ClearCommand, Post};

/// Header carrying an explicit session id
pub const SESSION_HEADER: &str = "x-session-id";

/// Cookie carrying the session id between requests
pub const SESSION_COOKIE: &str = "wolfnote_session";

/// Shared application state
pub struct AppState {
    pub node: Arc<ReplicaNode>,
}

/// HTTP API server
pub struct HttpServer {
    config: ApiConfig,
    bind_address: String,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ApiConfig, bind_address: impl Into<String>, node: Arc<ReplicaNode>) -> Self {
        Self {
            config,
            bind_address: bind_address.into(),
            state: Arc::new(AppState { node }),
        }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Self::create_router(Arc::clone(&self.state), self.config.cors_enabled)
    }

    fn create_router(state: Arc<AppState>, cors_enabled: bool) -> Router {
        let router = Router::new()
            // Client operations
            .route("/posts", post(handle_create_post).get(handle_list_posts))
            .route("/sync", post(handle_sync))
            .route("/clear", post(handle_clear))
            .route("/debug", get(handle_debug))
            .route("/health", get(handle_health))
            // Peer replication
            .route(INTERNAL_POSTS, get(handle_pull_posts).post(handle_push_post))
            .route(INTERNAL_CLEARS, get(handle_pull_clears).post(handle_push_clear))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if cors_enabled {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind and serve until the process exits
    pub async fn start(&self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        tracing::info!("HTTP API listening on {}", self.bind_address);
        self.serve(listener).await
    }

    /// Serve on an already-bound listener
    pub async fn serve(&self, listener: tokio::net::TcpListener) -> Result<()> {
        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))
    }
}

// ============ Sessions ============

/// The client session a request belongs to
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// True when the id was minted for this request
    pub issued: bool,
}

impl Session {
    /// Attach the session cookie to `response` if the id is new
    fn attach(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.issued {
            let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
        }
        response
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let from_cookie = || {
            parts
                .headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
                .map(|(_, value)| value)
        };

        let session = match from_header.or_else(from_cookie) {
            Some(id) => Session { id: id.to_string(), issued: false },
            None => Session {
                id: uuid::Uuid::new_v4().to_string(),
                issued: true,
            },
        };
        Ok(session)
    }
}

// ============ Request/Response Types ============

/// Create-post request
#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}

/// List query
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sync: bool,
}

/// List response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListPostsResponse {
    pub replica: String,
    pub session_id: String,
    pub posts: Vec<Post>,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub replica: String,
    pub peers: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(e: Error) -> Response {
    let status = match e {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorResponse {
        error: e.to_string(),
        code: e.code().to_string(),
    };
    (status, Json(body)).into_response()
}

// ============ Handlers ============

async fn handle_create_post(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<CreatePostRequest>,
) -> impl IntoResponse {
    let response = match state.node.create_post(&session.id, &req.author, &req.content).await {
        Ok(post) => (StatusCode::CREATED, Json(post)).into_response(),
        Err(e) => error_response(e),
    };
    session.attach(response)
}

async fn handle_list_posts(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let posts = state.node.list_posts(&session.id, query.sync).await;
    session.attach(Json(ListPostsResponse {
        replica: state.node.replica().to_string(),
        session_id: session.id.clone(),
        posts,
    }))
}

async fn handle_sync(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> impl IntoResponse {
    let summary = state.node.sync(&session.id).await;
    session.attach(Json(summary))
}

async fn handle_clear(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.node.issue_clear().await)
}

async fn handle_debug(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> impl IntoResponse {
    let info = state.node.debug_info(&session.id).await;
    session.attach(Json(info))
}

async fn handle_health(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        replica: state.node.replica().to_string(),
        peers: state.node.registry().len(),
    })
}

async fn handle_pull_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SinceQuery>,
) -> impl IntoResponse {
    Json(state.node.posts_since(query.since).await)
}

async fn handle_push_post(
    State(state): State<Arc<AppState>>,
    Json(post): Json<Post>,
) -> impl IntoResponse {
    Json(state.node.receive_post(post).await)
}

async fn handle_pull_clears(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.node.clear_commands().await)
}

async fn handle_push_clear(
    State(state): State<Arc<AppState>>,
    Json(command): Json<ClearCommand>,
) -> impl IntoResponse {
    Json(state.node.receive_clear(command).await)
}
