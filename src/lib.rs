//! # Access Key Gate
//!
//! Hides an administrator area behind a secret query parameter and an IP
//! allowlist. This is a speed bump, not an authentication system:
//!
//! - **Key**: the *presence* of a configured query parameter opens the gate
//! - **Allowlist**: exact IPs and CIDR ranges skip the key check
//! - **Sticky**: once through, the session bypasses all checks
//! - **Deny actions**: 401 with a message, redirect, or silent pass-through
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Trace → AccessKeyLayer)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Gate core (decide → allowlist → CIDR, IP resolver, deny)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AuthFlagStore (session "already authorized" flag)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use accesskey_gate::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let app = build_router(AppState::new(config));
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Using the core directly
//!
//! ```rust
//! use accesskey_gate::gate::{Allowlist, GateConfig, GateVerdict, RequestContext, decide};
//! use accesskey_gate::session::{InMemoryFlagStore, SessionFlag, SessionId};
//!
//! let config = GateConfig::new("letmein").with_allowlist(Allowlist::from_csv("10.0.0.0/8"));
//! let store = InMemoryFlagStore::new();
//! let flag = SessionFlag::new(&store, SessionId::generate());
//!
//! let ctx = RequestContext::admin().with_query("letmein");
//! let verdict = decide(&config, &ctx, &flag).unwrap();
//! assert!(matches!(verdict, GateVerdict::Allow(_)));
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

/// Fixed `tracing` target for every record the gate emits.
pub const LOG_TARGET: &str = "accesskey";

// Re-exports for convenience
pub use config::Config;
pub use error::{GateError, GateResult};
pub use gate::{GateConfig, GateVerdict, decide};
pub use middleware::AccessKeyLayer;
pub use routes::build_router;
pub use session::{AuthFlagStore, InMemoryFlagStore};
pub use state::AppState;
