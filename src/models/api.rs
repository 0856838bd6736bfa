use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy"
    pub status: String,
    /// Whether a key is configured
    pub gate_enabled: bool,
    /// Application version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Response timestamp
    pub timestamp: DateTime<Utc>,
}

/// Administrator dashboard response.
#[derive(Debug, Serialize)]
pub struct AdminDashboardResponse {
    pub message: String,
    /// Visitor address as the gate sees it, or "Unknown"
    pub visitor_ip: String,
    /// Informational notice for whitelisted visitors without the key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Path that was requested under the admin prefix
    pub path: String,
}
