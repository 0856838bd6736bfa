mod api;

pub use api::{AdminDashboardResponse, HealthResponse};
