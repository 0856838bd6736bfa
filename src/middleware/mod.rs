//! HTTP middleware adapting the gate to axum.
//!
//! # Architecture
//!
//! ```text
//! Request → Trace → AccessKey gate → Handler → Response
//!                        ↓
//!            401 message / 303 redirect / pass-through
//! ```
//!
//! # Security Considerations
//!
//! - The key is a plain query parameter and only its presence is checked
//! - IP headers are client-controllable unless a proxy overwrites them
//! - Session ids are random UUIDs; forged cookie values are ignored

pub mod access_key;

pub use access_key::{
    AccessKeyLayer, AccessKeyService, DEFAULT_ADMIN_PREFIX, DEFAULT_SESSION_COOKIE,
    WhitelistNotice,
};
