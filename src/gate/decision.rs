//! Per-request decision state machine.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. Session already authorized → `Allow(AlreadySessioned)`
//! 2. No key configured → `Skip(GateDisabled)`
//! 3. Not the admin surface → `Skip(NotAdminSurface)`
//! 4. Resolve the visitor IP; failure is not a denial
//! 5. Allowlisted → `Allow(Whitelisted)`, flag marked
//! 6. Key parameter present (any value) → `Allow(KeyMatched)`, flag marked
//! 7. Otherwise → `Deny(fail_action)`
//!
//! Once the flag is set the session bypasses every check. IP resolution
//! failure falls through to the key check rather than denying.

use std::fmt;

use tracing::{debug, warn};

use super::context::RequestContext;
use super::ip::{ResolvedIp, resolve_visitor_ip};
use super::{FailAction, GateConfig};
use crate::LOG_TARGET;
use crate::error::GateResult;
use crate::metrics;
use crate::session::SessionFlag;

/// Why the gate did not evaluate the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    GateDisabled,
    NotAdminSurface,
}

/// Why the request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    AlreadySessioned,
    Whitelisted,
    KeyMatched,
}

/// Terminal output of [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Gate does not apply; the caller proceeds normally
    Skip(SkipReason),
    Allow(AllowReason),
    Deny(FailAction),
}

impl GateVerdict {
    /// Whether this verdict set the session flag.
    pub fn marks_session(&self) -> bool {
        matches!(
            self,
            GateVerdict::Allow(AllowReason::Whitelisted | AllowReason::KeyMatched)
        )
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateVerdict::Skip(SkipReason::GateDisabled) => "skip_gate_disabled",
            GateVerdict::Skip(SkipReason::NotAdminSurface) => "skip_not_admin",
            GateVerdict::Allow(AllowReason::AlreadySessioned) => "allow_sessioned",
            GateVerdict::Allow(AllowReason::Whitelisted) => "allow_whitelisted",
            GateVerdict::Allow(AllowReason::KeyMatched) => "allow_key",
            GateVerdict::Deny(_) => "deny",
        }
    }
}

impl fmt::Display for GateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether a request may reach the admin surface.
///
/// # Errors
///
/// Only flag store failures are returned; the caller turns them into a 500.
pub fn decide(
    config: &GateConfig,
    ctx: &RequestContext,
    flag: &SessionFlag<'_>,
) -> GateResult<GateVerdict> {
    let verdict = evaluate(config, ctx, flag)?;
    metrics::record_verdict(verdict.as_str());
    Ok(verdict)
}

fn evaluate(
    config: &GateConfig,
    ctx: &RequestContext,
    flag: &SessionFlag<'_>,
) -> GateResult<GateVerdict> {
    if ctx.already_authorized {
        return Ok(GateVerdict::Allow(AllowReason::AlreadySessioned));
    }

    let Some(key_param) = config.key_param.as_deref() else {
        warn!(target: LOG_TARGET, "Access key gate is enabled but no key is configured");
        return Ok(GateVerdict::Skip(SkipReason::GateDisabled));
    };

    if !ctx.is_admin_surface {
        return Ok(GateVerdict::Skip(SkipReason::NotAdminSurface));
    }

    match resolve_visitor_ip(&ctx.ip_sources) {
        ResolvedIp::Resolved { addr, source } => {
            if config.allowlist.contains(&addr) {
                debug!(target: LOG_TARGET, ip = %addr, source = %source, "Visitor IP is whitelisted");
                flag.mark()?;
                return Ok(GateVerdict::Allow(AllowReason::Whitelisted));
            }
        }
        ResolvedIp::Unresolved => {
            warn!(
                target: LOG_TARGET,
                "IP detection failed: Unable to detect visitor IP address from any source"
            );
        }
    }

    if ctx.query_params.contains(key_param) {
        debug!(target: LOG_TARGET, "Access key provided");
        flag.mark()?;
        return Ok(GateVerdict::Allow(AllowReason::KeyMatched));
    }

    Ok(GateVerdict::Deny(config.fail_action))
}

/// Notice for an allowlisted visitor who came in without the key.
pub fn whitelist_notice<'a>(
    config: &'a GateConfig,
    ctx: &RequestContext,
    verdict: &GateVerdict,
) -> Option<&'a str> {
    let key_param = config.key_param.as_deref()?;

    if *verdict == GateVerdict::Allow(AllowReason::Whitelisted)
        && !ctx.query_params.contains(key_param)
    {
        Some(config.whitelist_message.as_str())
    } else {
        None
    }
}
