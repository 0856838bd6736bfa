mod admin;
mod health;

pub use admin::{dashboard, site_root};
pub use health::health_check;
