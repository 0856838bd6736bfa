//! Turns a deny verdict into an observable effect.

use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, info};

use super::{FailAction, GateConfig};
use crate::LOG_TARGET;
use crate::error::GateError;

/// Result of executing a deny action.
#[derive(Debug)]
pub enum DenyOutcome {
    /// Stop processing and send this response
    Halt(Response),
    /// No action configured; the request continues un-gated
    Continue,
}

impl DenyOutcome {
    pub fn is_halt(&self) -> bool {
        matches!(self, DenyOutcome::Halt(_))
    }
}

/// Execute the configured deny action.
///
/// `Message` renders a 401 with the configured body, `Redirect` a 303 to the
/// configured URL or the site root, `None` lets the request pass.
pub fn execute(action: FailAction, config: &GateConfig) -> DenyOutcome {
    match action {
        FailAction::Message => {
            let message = config.fail_message();
            info!(target: LOG_TARGET, message = %message, "Access denied");
            DenyOutcome::Halt(GateError::unauthorized(message).into_response())
        }
        FailAction::Redirect => {
            let url = config.redirect_target();
            info!(target: LOG_TARGET, url = %url, "Access denied: redirecting");
            DenyOutcome::Halt(Redirect::to(url).into_response())
        }
        FailAction::None => {
            debug!(target: LOG_TARGET, "Access denied but no fail action configured, passing through");
            DenyOutcome::Continue
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_message_is_401_with_configured_body() {
        let config = GateConfig::new("k").with_fail_message("Keep out");

        let DenyOutcome::Halt(response) = execute(FailAction::Message, &config) else {
            panic!("message action must halt");
        };
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Keep out");
    }

    #[tokio::test]
    async fn test_message_defaults_when_empty() {
        let config = GateConfig::new("k").with_fail_message("");

        let DenyOutcome::Halt(response) = execute(FailAction::Message, &config) else {
            panic!("message action must halt");
        };
        assert_eq!(body_text(response).await, "Unauthorized access");
    }

    #[test]
    fn test_redirect_to_configured_url() {
        let config = GateConfig::new("k").with_redirect_url("https://example.com/nope");

        let DenyOutcome::Halt(response) = execute(FailAction::Redirect, &config) else {
            panic!("redirect action must halt");
        };
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/nope"
        );
    }

    #[test]
    fn test_redirect_falls_back_to_site_root() {
        let config = GateConfig {
            site_root: "https://example.com/".to_string(),
            ..GateConfig::new("k")
        };

        let DenyOutcome::Halt(response) = execute(FailAction::Redirect, &config) else {
            panic!("redirect action must halt");
        };
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_none_passes_through() {
        let outcome = execute(FailAction::None, &GateConfig::new("k"));
        assert!(!outcome.is_halt());
    }
}
