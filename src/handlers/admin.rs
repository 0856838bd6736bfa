//! Administrator area and public site root.
//!
//! # Endpoints
//!
//! - `GET /` - Public site root, never gated
//! - `GET /administrator` and anything below it - Admin dashboard, gated
//!
//! The dashboard shows the visitor IP as the gate resolves it so operators
//! can copy their own address into `ACCESS_KEY_WHITELIST`.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::ConnectInfo;
use axum::http::request::Parts;
use tracing::instrument;

use crate::gate::{SourceValues, visitor_ip_for_display};
use crate::middleware::WhitelistNotice;
use crate::models::AdminDashboardResponse;

/// Public site root.
pub async fn site_root() -> &'static str {
    "Welcome to the public site."
}

/// Administrator dashboard.
///
/// # Response Body
///
/// ```json
/// {
///   "message": "Administrator area",
///   "visitor_ip": "203.0.113.7",
///   "notice": "Your IP address is whitelisted, ...",
///   "path": "/administrator"
/// }
/// ```
#[instrument(skip(parts), fields(path = %parts.uri.path()))]
pub async fn dashboard(parts: Parts) -> Json<AdminDashboardResponse> {
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let sources = SourceValues::from_headers(&parts.headers, remote_addr);

    Json(AdminDashboardResponse {
        message: "Administrator area".to_string(),
        visitor_ip: visitor_ip_for_display(&sources).into_owned(),
        notice: parts
            .extensions
            .get::<WhitelistNotice>()
            .map(|WhitelistNotice(notice)| notice.clone()),
        path: parts.uri.path().to_string(),
    })
}
