//! sitestock-gw library - gateway service wiring
//!
//! Telephony-facing service for the SiteStock inventory: USSD session
//! callbacks drive the menu state machine, inbound SMS free-text questions
//! go through the grounded completion flow, and both read or write the
//! shared material store.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod advisor;
pub mod api;
pub mod clients;
pub mod notify;
pub mod ussd;

use clients::{CompletionClient, SmsSender};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Outbound SMS collaborator
    pub sms: Arc<dyn SmsSender>,
    /// Language-model completion collaborator
    pub completion: Arc<dyn CompletionClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        sms: Arc<dyn SmsSender>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            db,
            sms,
            completion,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ussd", post(api::ussd_callback))
        .route("/incoming-messages", post(api::incoming_message))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
