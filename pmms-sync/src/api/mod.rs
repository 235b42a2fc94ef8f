//! Host bridge: HTTP inbound, SSE and callbacks outbound
//!
//! | Route           | Method | Purpose                                      |
//! |-----------------|--------|----------------------------------------------|
//! | `/message`      | POST   | enqueue one host command (fire-and-forget)   |
//! | `/events`       | GET    | SSE stream of outbound notifications         |
//! | `/entities`     | GET    | registry snapshot, answered by the engine    |
//! | `/health`       | GET    | liveness                                     |

pub mod forwarder;
pub mod handlers;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::events::EventBus;
use crate::playback::EngineHandle;

pub use forwarder::{startup_handshake, HostForwarder};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppContext {
    /// Submission side of the engine queue
    pub engine: EngineHandle,
    /// Outbound notification bus
    pub bus: EventBus,
    pub started_at: DateTime<Utc>,
    pub port: u16,
}

impl AppContext {
    pub fn new(engine: EngineHandle, bus: EventBus, port: u16) -> Self {
        Self {
            engine,
            bus,
            started_at: Utc::now(),
            port,
        }
    }
}

/// Create the bridge router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/message", post(handlers::post_message))
        .route("/entities", get(handlers::get_entities))
        .route("/events", get(sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
