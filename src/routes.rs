//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Access key gate │ ← 401 / redirect on admin paths without key or whitelisted IP
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/`, `/health` - Public (the gate only applies under the admin prefix)
//! - `/administrator`, `/administrator/{*rest}` - Admin dashboard

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::AccessKeyLayer;
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The gate layer wraps every route; it decides per request whether the
/// path belongs to the admin surface.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;
    let admin_prefix = config.admin_path_prefix.trim_end_matches('/');

    let router = Router::new()
        .route("/", get(handlers::site_root))
        .route("/health", get(handlers::health_check))
        .route(admin_prefix, get(handlers::dashboard))
        .route(&format!("{admin_prefix}/{{*rest}}"), get(handlers::dashboard));

    let gate_layer = AccessKeyLayer::from_state(&state);
    if gate_layer.is_enabled() {
        info!(
            admin_prefix = %admin_prefix,
            whitelist_entries = state.gate.allowlist.len(),
            fail_action = %state.gate.fail_action,
            "Access key gate enabled"
        );
    } else {
        info!("Access key gate disabled (no ACCESS_KEY set)");
    }

    router
        .layer(gate_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
