//! HTTP API for the blackjack server.
//!
//! # Modules
//!
//! - [`games`]: Account balances and rounds (deal, hit, stand)
//! - [`request_id`]: Request correlation ids
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                                   - Health check
//! POST /api/v1/accounts/{account_id}                             - Open account (starting grant)
//! GET  /api/v1/accounts/{account_id}/balance                     - Current balance
//! POST /api/v1/accounts/{account_id}/balance/adjust              - Admin adjustment
//! POST /api/v1/accounts/{account_id}/sessions                    - Deal a new round
//! POST /api/v1/accounts/{account_id}/sessions/{session_id}/hit   - Draw a card
//! POST /api/v1/accounts/{account_id}/sessions/{session_id}/stand - Stand and settle
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bj_server::api::{create_router, AppState};
//! use blackjack::{
//!     BlackjackService, InMemoryBalanceCache, InMemoryBalanceStore, LedgerStore, PayoutConfig,
//!     SessionRegistry,
//! };
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = LedgerStore::new(
//!     Arc::new(InMemoryBalanceStore::new()),
//!     Arc::new(InMemoryBalanceCache::new()),
//! );
//! let service = BlackjackService::new(
//!     Arc::new(SessionRegistry::default()),
//!     Arc::new(ledger),
//!     PayoutConfig::default(),
//! );
//!
//! let state = AppState::new(Arc::new(service), None, Duration::from_secs(2));
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod games;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use blackjack::{BlackjackService, Deadline, db::Database};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;

use crate::metrics;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BlackjackService>,
    /// Durable store, `None` when balances are kept in memory
    pub database: Option<Database>,
    /// Budget for all ledger I/O of one request
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        service: Arc<BlackjackService>,
        database: Option<Database>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            service,
            database,
            request_timeout,
        }
    }

    /// Deadline for a request arriving now
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.request_timeout)
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .route_layer(axum::middleware::from_fn(metrics::track_http))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/accounts/{account_id}", post(games::open_account))
        .route("/accounts/{account_id}/balance", get(games::get_balance))
        .route(
            "/accounts/{account_id}/balance/adjust",
            post(games::adjust_balance),
        )
        .route("/accounts/{account_id}/sessions", post(games::new_session))
        .route(
            "/accounts/{account_id}/sessions/{session_id}/hit",
            post(games::hit),
        )
        .route(
            "/accounts/{account_id}/sessions/{session_id}/stand",
            post(games::stand),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the durable store answers (or none is configured),
/// `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"active_sessions":3,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(database) => database.health_check().await.is_ok(),
        None => true,
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "ledger_backend": if state.database.is_some() { "postgres" } else { "memory" },
        "active_sessions": state.service.active_sessions(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
