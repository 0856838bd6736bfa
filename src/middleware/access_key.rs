//! Access key gate middleware.
//!
//! # Usage
//!
//! Set the `ACCESS_KEY` environment variable to enable the gate:
//!
//! ```bash
//! ACCESS_KEY=letmein cargo run
//! ```
//!
//! The administrator area then only opens when the key parameter is present
//! in the query (its value is ignored) or the visitor IP is whitelisted:
//!
//! ```bash
//! curl "http://localhost:3000/administrator?letmein"
//! ```
//!
//! Once a visitor passes, a session cookie is issued and later requests from
//! that session skip every check.
//!
//! # Failure Handling
//!
//! If the flag store fails while the verdict is computed, the request ends
//! with a generic 500. Nothing about the failure is exposed to the client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, info};

use crate::LOG_TARGET;
use crate::error::{GateError, GateResult};
use crate::gate::{
    DenyOutcome, GateConfig, GateVerdict, QueryParams, RequestContext, SourceValues, decide,
    execute, whitelist_notice,
};
use crate::session::{AuthFlagStore, SessionFlag, SessionId};
use crate::state::AppState;

/// Default path prefix of the gated area.
pub const DEFAULT_ADMIN_PREFIX: &str = "/administrator";

/// Default session cookie name.
pub const DEFAULT_SESSION_COOKIE: &str = "accesskey_session";

/// Notice attached to the request for whitelisted visitors without the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistNotice(pub String);

/// Access key gate layer.
///
/// When no key is configured the layer still runs but every verdict is
/// `Skip(GateDisabled)`.
#[derive(Clone)]
pub struct AccessKeyLayer {
    gate: Arc<GateConfig>,
    flags: Arc<dyn AuthFlagStore>,
    admin_prefix: Arc<str>,
    cookie_name: Arc<str>,
}

impl AccessKeyLayer {
    /// Create a layer guarding [`DEFAULT_ADMIN_PREFIX`].
    pub fn new(gate: Arc<GateConfig>, flags: Arc<dyn AuthFlagStore>) -> Self {
        Self {
            gate,
            flags,
            admin_prefix: Arc::from(DEFAULT_ADMIN_PREFIX),
            cookie_name: Arc::from(DEFAULT_SESSION_COOKIE),
        }
    }

    /// Create a layer from application state and its configuration.
    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.gate.clone(), state.flags.clone())
            .with_admin_prefix(&state.config.admin_path_prefix)
            .with_cookie_name(&state.config.session_cookie_name)
    }

    /// Guard a different path prefix. A trailing `/` is ignored.
    pub fn with_admin_prefix(mut self, prefix: &str) -> Self {
        self.admin_prefix = Arc::from(prefix.trim_end_matches('/'));
        self
    }

    pub fn with_cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = Arc::from(name);
        self
    }

    /// Check if a key is configured.
    pub fn is_enabled(&self) -> bool {
        self.gate.is_enabled()
    }
}

impl<S> Layer<S> for AccessKeyLayer {
    type Service = AccessKeyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessKeyService {
            inner,
            gate: self.gate.clone(),
            flags: self.flags.clone(),
            admin_prefix: self.admin_prefix.clone(),
            cookie_name: self.cookie_name.clone(),
        }
    }
}

/// Access key gate service wrapper.
#[derive(Clone)]
pub struct AccessKeyService<S> {
    inner: S,
    gate: Arc<GateConfig>,
    flags: Arc<dyn AuthFlagStore>,
    admin_prefix: Arc<str>,
    cookie_name: Arc<str>,
}

impl<S> Service<Request<Body>> for AccessKeyService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let flags = self.flags.clone();
        let admin_prefix = self.admin_prefix.clone();
        let cookie_name = self.cookie_name.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let existing = session_from_cookies(req.headers(), &cookie_name);
            let session = existing.unwrap_or_else(SessionId::generate);
            let flag = SessionFlag::new(flags.as_ref(), session);

            let (ctx, verdict) = match check(&gate, &req, &admin_prefix, &flag) {
                Ok(checked) => checked,
                Err(e) => {
                    // Rendering an Internal error logs it with full detail
                    let internal = match e {
                        GateError::Internal(_) => e,
                        other => GateError::Internal(other.to_string()),
                    };
                    return Ok(internal.into_response());
                }
            };

            debug!(
                target: LOG_TARGET,
                path = %req.uri().path(),
                verdict = %verdict,
                "Access key gate verdict"
            );

            if let GateVerdict::Deny(action) = verdict {
                return match execute(action, &gate) {
                    DenyOutcome::Halt(response) => Ok(response),
                    DenyOutcome::Continue => inner.call(req).await,
                };
            }

            if let Some(notice) = whitelist_notice(&gate, &ctx, &verdict) {
                info!(
                    target: LOG_TARGET,
                    notice = %notice,
                    "Whitelisted IP accessed without access key"
                );
                req.extensions_mut()
                    .insert(WhitelistNotice(notice.to_string()));
            }

            let mut response = inner.call(req).await?;

            if verdict.marks_session() && existing.is_none() {
                let cookie = format!("{cookie_name}={session}; Path=/; HttpOnly; SameSite=Lax");
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }

            Ok(response)
        })
    }
}

/// Build the request context and run the decision.
fn check<B>(
    gate: &GateConfig,
    req: &Request<B>,
    admin_prefix: &str,
    flag: &SessionFlag<'_>,
) -> GateResult<(RequestContext, GateVerdict)> {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let ctx = RequestContext {
        ip_sources: SourceValues::from_headers(req.headers(), remote_addr),
        query_params: QueryParams::parse(req.uri().query()),
        is_admin_surface: is_admin_path(req.uri().path(), admin_prefix),
        already_authorized: flag.is_set()?,
    };

    let verdict = decide(gate, &ctx, flag)?;
    Ok((ctx, verdict))
}

/// Whether `path` is the prefix itself or lies beneath it.
///
/// Matching is case-sensitive; `/administratorx` is not under `/administrator`.
fn is_admin_path(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Find the session id in `Cookie` headers. Non-UUID values are ignored.
fn session_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| SessionId::parse(value))
}
