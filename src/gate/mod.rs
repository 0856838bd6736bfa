//! Access-decision core.
//!
//! # Flow
//!
//! ```text
//! Request ─► already authorized? ──yes──► Allow(AlreadySessioned)
//!                 │ no
//!                 ▼
//!            key configured? ──no──► Skip(GateDisabled)
//!                 │ yes
//!                 ▼
//!            admin surface? ──no──► Skip(NotAdminSurface)
//!                 │ yes
//!                 ▼
//!            resolve IP ─► allowlisted? ──yes──► Allow(Whitelisted) + mark
//!                 │ no / unresolved
//!                 ▼
//!            key param present? ──yes──► Allow(KeyMatched) + mark
//!                 │ no
//!                 ▼
//!            Deny(fail_action) ─► DenyActionExecutor
//! ```
//!
//! The core is framework-agnostic apart from the response type produced by
//! [`deny::execute`]; [`crate::middleware`] adapts it to axum.

pub mod allowlist;
pub mod cidr;
pub mod context;
pub mod decision;
pub mod deny;
pub mod ip;

use std::fmt;

pub use allowlist::{Allowlist, is_allowed};
pub use cidr::{CidrRange, cidr_matches};
pub use context::{QueryParams, RequestContext};
pub use decision::{AllowReason, GateVerdict, SkipReason, decide, whitelist_notice};
pub use deny::{DenyOutcome, execute};
pub use ip::{
    IpSource, ResolvedIp, SourceValues, UNKNOWN_IP, resolve_visitor_ip, sanitize_ip,
    visitor_ip_for_display,
};

/// 401 body used when no message is configured.
pub const DEFAULT_FAIL_MESSAGE: &str = "Unauthorized access";

/// Notice shown to allowlisted visitors who did not pass the key.
pub const DEFAULT_WHITELIST_MESSAGE: &str = "Your IP address is whitelisted, so the access key was not required. Remember to use the access key when you log in from another location.";

/// What to do with a request that fails every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailAction {
    /// Let the request through untouched ("log only" deployments)
    None,
    /// 401 with the configured message
    #[default]
    Message,
    /// Redirect to the configured URL or the site root
    Redirect,
}

impl FailAction {
    /// Map the `failAction` option. Unrecognised values mean [`FailAction::None`].
    pub fn from_option(value: &str) -> Self {
        match value.trim() {
            "message" => FailAction::Message,
            "redirect" => FailAction::Redirect,
            _ => FailAction::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailAction::None => "none",
            FailAction::Message => "message",
            FailAction::Redirect => "redirect",
        }
    }
}

impl fmt::Display for FailAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Query parameter whose presence grants access; `None` disables the gate
    pub key_param: Option<String>,
    /// Addresses and ranges exempt from the key check
    pub allowlist: Allowlist,
    pub fail_action: FailAction,
    /// Body of the 401 response
    pub fail_message: String,
    /// Redirect target; `None` falls back to `site_root`
    pub redirect_url: Option<String>,
    pub whitelist_message: String,
    pub site_root: String,
}

impl GateConfig {
    /// Gate with the given key and defaults everywhere else.
    pub fn new(key_param: impl Into<String>) -> Self {
        let key_param = key_param.into();
        Self {
            key_param: Some(key_param).filter(|k| !k.is_empty()),
            ..Self::default()
        }
    }

    pub fn with_allowlist(mut self, allowlist: Allowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_fail_action(mut self, action: FailAction) -> Self {
        self.fail_action = action;
        self
    }

    pub fn with_fail_message(mut self, message: impl Into<String>) -> Self {
        self.fail_message = message.into();
        self
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into()).filter(|u| !u.is_empty());
        self
    }

    /// Whether a key is configured.
    pub fn is_enabled(&self) -> bool {
        self.key_param.is_some()
    }

    /// 401 body, defaulted when the configured one is empty.
    pub fn fail_message(&self) -> &str {
        if self.fail_message.is_empty() {
            DEFAULT_FAIL_MESSAGE
        } else {
            &self.fail_message
        }
    }

    /// Redirect target, falling back to the site root.
    pub fn redirect_target(&self) -> &str {
        self.redirect_url.as_deref().unwrap_or(&self.site_root)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            key_param: None,
            allowlist: Allowlist::default(),
            fail_action: FailAction::Message,
            fail_message: DEFAULT_FAIL_MESSAGE.to_string(),
            redirect_url: None,
            whitelist_message: DEFAULT_WHITELIST_MESSAGE.to_string(),
            site_root: "/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_action_from_option() {
        assert_eq!(FailAction::from_option("message"), FailAction::Message);
        assert_eq!(FailAction::from_option(" redirect "), FailAction::Redirect);
        assert_eq!(FailAction::from_option("nothing"), FailAction::None);
        assert_eq!(FailAction::from_option(""), FailAction::None);
        // Matching is case-sensitive like the option values themselves
        assert_eq!(FailAction::from_option("Message"), FailAction::None);
    }

    #[test]
    fn test_empty_key_disables_gate() {
        assert!(!GateConfig::new("").is_enabled());
        assert!(GateConfig::new("letmein").is_enabled());
    }

    #[test]
    fn test_fail_message_default() {
        let config = GateConfig::new("k").with_fail_message("");
        assert_eq!(config.fail_message(), "Unauthorized access");

        let config = GateConfig::new("k").with_fail_message("Nope");
        assert_eq!(config.fail_message(), "Nope");
    }

    #[test]
    fn test_redirect_target_falls_back_to_site_root() {
        let config = GateConfig {
            site_root: "https://example.com/".to_string(),
            ..GateConfig::new("k")
        };
        assert_eq!(config.redirect_target(), "https://example.com/");

        let config = config.with_redirect_url("https://example.com/away");
        assert_eq!(config.redirect_target(), "https://example.com/away");

        let config = config.with_redirect_url("");
        assert_eq!(config.redirect_target(), "https://example.com/");
    }
}
