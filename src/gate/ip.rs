//! Visitor IP resolution from an ordered list of sources.
//!
//! # Source Priority
//!
//! Sources are scanned in a fixed order and the first one that yields a
//! well-formed address wins:
//!
//! 1. `X-Forwarded-For`
//! 2. `X-Real-IP`
//! 3. `Client-IP`
//! 4. `X-Forwarded`
//! 5. `Forwarded-For`
//! 6. `Forwarded`
//! 7. The transport-layer remote address
//!
//! # Sanitising
//!
//! A raw value is trimmed and, when it is a comma-separated forwarding chain,
//! cut down to its first element. What remains must parse as an IPv4 or IPv6
//! address; anything else (ports, `for=` pairs, garbage) is rejected and the
//! scan moves on to the next source.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! Every header in the list is client-controllable unless a reverse proxy
//! overwrites it. The first `X-Forwarded-For` element in particular is
//! whatever the client sent. The allowlist built on top of this is a speed
//! bump, not an authentication mechanism.

use std::borrow::Cow;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::LOG_TARGET;
use crate::error::{GateError, GateResult};
use crate::metrics;

/// Literal shown when no source yields an address in display mode.
pub const UNKNOWN_IP: &str = "Unknown";

/// Where a visitor address can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpSource {
    XForwardedFor,
    XRealIp,
    ClientIp,
    XForwarded,
    ForwardedFor,
    Forwarded,
    RemoteAddr,
}

impl IpSource {
    /// Scan order used by [`resolve_visitor_ip`].
    pub const PRIORITY: [IpSource; 7] = [
        IpSource::XForwardedFor,
        IpSource::XRealIp,
        IpSource::ClientIp,
        IpSource::XForwarded,
        IpSource::ForwardedFor,
        IpSource::Forwarded,
        IpSource::RemoteAddr,
    ];

    /// Lower-case header name, or `None` for the remote address.
    pub fn header_name(&self) -> Option<&'static str> {
        match self {
            IpSource::XForwardedFor => Some("x-forwarded-for"),
            IpSource::XRealIp => Some("x-real-ip"),
            IpSource::ClientIp => Some("client-ip"),
            IpSource::XForwarded => Some("x-forwarded"),
            IpSource::ForwardedFor => Some("forwarded-for"),
            IpSource::Forwarded => Some("forwarded"),
            IpSource::RemoteAddr => None,
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        self.header_name().unwrap_or("remote-addr")
    }
}

impl fmt::Display for IpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw values captured from a request, one slot per [`IpSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceValues {
    values: Vec<(IpSource, String)>,
}

impl SourceValues {
    /// Capture every known header plus the socket peer address.
    ///
    /// Header values that are not valid visible ASCII are treated as absent.
    pub fn from_headers(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        let mut values = Vec::with_capacity(IpSource::PRIORITY.len());

        for source in IpSource::PRIORITY {
            if let Some(name) = source.header_name()
                && let Some(value) = headers.get(name)
                && let Ok(value) = value.to_str()
            {
                values.push((source, value.to_string()));
            }
        }

        if let Some(addr) = remote_addr {
            values.push((IpSource::RemoteAddr, addr.ip().to_string()));
        }

        Self { values }
    }

    /// Set the raw value for a source, replacing any previous one.
    pub fn with(mut self, source: IpSource, value: impl Into<String>) -> Self {
        self.values.retain(|(s, _)| *s != source);
        self.values.push((source, value.into()));
        self
    }

    /// Raw value for a source, if any.
    pub fn get(&self, source: IpSource) -> Option<&str> {
        self.values
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of resolution: a validated address or the unresolved marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedIp {
    Resolved { addr: IpAddr, source: IpSource },
    Unresolved,
}

impl ResolvedIp {
    /// The validated address, if any.
    pub fn addr(&self) -> Option<IpAddr> {
        match self {
            ResolvedIp::Resolved { addr, .. } => Some(*addr),
            ResolvedIp::Unresolved => None,
        }
    }

    /// Demand an address, failing with `IpDetectionFailed` when unresolved.
    pub fn require(self) -> GateResult<IpAddr> {
        self.addr().ok_or_else(|| {
            GateError::IpDetectionFailed(
                "Unable to detect visitor IP address from any source".to_string(),
            )
        })
    }
}

/// Sanitise one raw source value into an address.
///
/// Keeps only the first element of a comma-separated chain.
pub fn sanitize_ip(raw: &str) -> GateResult<IpAddr> {
    let candidate = raw.split(',').next().unwrap_or_default().trim();

    candidate
        .parse::<IpAddr>()
        .map_err(|_| GateError::InvalidAddress(candidate.to_string()))
}

/// Resolve the visitor address used for the access decision.
pub fn resolve_visitor_ip(sources: &SourceValues) -> ResolvedIp {
    for source in IpSource::PRIORITY {
        let Some(raw) = sources.get(source) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }

        match sanitize_ip(raw) {
            Ok(addr) => {
                debug!(target: LOG_TARGET, source = %source, ip = %addr, "Visitor IP detected");
                metrics::record_ip_resolution(source.as_str(), "resolved");
                return ResolvedIp::Resolved { addr, source };
            }
            Err(e) => {
                warn!(target: LOG_TARGET, source = %source, error = %e, "Invalid IP address detected");
                metrics::record_ip_resolution(source.as_str(), "invalid");
            }
        }
    }

    metrics::record_ip_resolution("none", "unresolved");
    ResolvedIp::Unresolved
}

/// Resolve the visitor address for display, falling back to [`UNKNOWN_IP`].
///
/// Never use the result for the access decision.
pub fn visitor_ip_for_display(sources: &SourceValues) -> Cow<'static, str> {
    match resolve_visitor_ip(sources) {
        ResolvedIp::Resolved { addr, .. } => Cow::Owned(addr.to_string()),
        ResolvedIp::Unresolved => {
            warn!(target: LOG_TARGET, "Failed to detect visitor IP address, using fallback");
            Cow::Borrowed(UNKNOWN_IP)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    /// Counts warnings emitted under the gate's log target.
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let meta = event.metadata();
            if *meta.level() == Level::WARN && meta.target() == LOG_TARGET {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_warnings(f: impl FnOnce()) -> usize {
        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        tracing::subscriber::with_default(subscriber, f);
        counter.0.load(Ordering::SeqCst)
    }

    #[test]
    fn test_sanitize_single_ipv4() {
        assert_eq!(sanitize_ip("203.0.113.50").unwrap(), ip("203.0.113.50"));
    }

    #[test]
    fn test_sanitize_keeps_first_of_chain() {
        assert_eq!(
            sanitize_ip("  192.168.1.1  , 10.0.0.1").unwrap(),
            ip("192.168.1.1")
        );
    }

    #[test]
    fn test_sanitize_ipv6() {
        assert_eq!(sanitize_ip("2001:db8::1, 10.0.0.1").unwrap(), ip("2001:db8::1"));
        assert_eq!(sanitize_ip("::1").unwrap(), ip("::1"));
    }

    #[test]
    fn test_sanitize_rejects_invalid() {
        assert!(matches!(
            sanitize_ip("not-an-ip"),
            Err(GateError::InvalidAddress(_))
        ));
        assert!(sanitize_ip("192.168.1.1:8080").is_err());
        assert!(sanitize_ip("for=192.0.2.60").is_err());
        assert!(sanitize_ip("").is_err());
        assert!(sanitize_ip(", 10.0.0.1").is_err());
    }

    #[test]
    fn test_resolve_first_header_and_first_element_win() {
        let sources = SourceValues::default()
            .with(IpSource::XForwardedFor, "1.2.3.4, 5.6.7.8")
            .with(IpSource::RemoteAddr, "9.9.9.9");

        assert_eq!(
            resolve_visitor_ip(&sources),
            ResolvedIp::Resolved {
                addr: ip("1.2.3.4"),
                source: IpSource::XForwardedFor
            }
        );
    }

    #[test]
    fn test_resolve_skips_malformed_source() {
        let sources = SourceValues::default()
            .with(IpSource::XForwardedFor, "not-an-ip")
            .with(IpSource::RemoteAddr, "9.9.9.9");

        assert_eq!(
            resolve_visitor_ip(&sources),
            ResolvedIp::Resolved {
                addr: ip("9.9.9.9"),
                source: IpSource::RemoteAddr
            }
        );
    }

    #[test]
    fn test_resolve_skips_empty_values_silently() {
        let sources = SourceValues::default()
            .with(IpSource::XForwardedFor, "")
            .with(IpSource::ClientIp, "10.1.1.1");

        let warnings = count_warnings(|| {
            assert_eq!(resolve_visitor_ip(&sources).addr(), Some(ip("10.1.1.1")));
        });
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_resolve_warns_on_whitespace_only_value() {
        let sources = SourceValues::default()
            .with(IpSource::XForwardedFor, "   ")
            .with(IpSource::ClientIp, "10.1.1.1");

        let warnings = count_warnings(|| {
            assert_eq!(resolve_visitor_ip(&sources).addr(), Some(ip("10.1.1.1")));
        });
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_resolve_warns_on_malformed_value() {
        let sources = SourceValues::default().with(IpSource::XRealIp, "not-an-ip");

        let warnings = count_warnings(|| {
            assert_eq!(resolve_visitor_ip(&sources), ResolvedIp::Unresolved);
        });
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_resolve_priority_order() {
        let sources = SourceValues::default()
            .with(IpSource::Forwarded, "6.6.6.6")
            .with(IpSource::ForwardedFor, "5.5.5.5")
            .with(IpSource::XForwarded, "4.4.4.4")
            .with(IpSource::ClientIp, "3.3.3.3")
            .with(IpSource::XRealIp, "2.2.2.2");

        assert_eq!(resolve_visitor_ip(&sources).addr(), Some(ip("2.2.2.2")));
    }

    #[test]
    fn test_resolve_unresolved_when_nothing_valid() {
        let sources = SourceValues::default()
            .with(IpSource::XForwardedFor, "garbage")
            .with(IpSource::Forwarded, "for=192.0.2.60");

        let resolved = resolve_visitor_ip(&sources);
        assert_eq!(resolved, ResolvedIp::Unresolved);
        assert!(matches!(
            resolved.require(),
            Err(GateError::IpDetectionFailed(_))
        ));
    }

    #[test]
    fn test_display_falls_back_to_unknown() {
        let ip = visitor_ip_for_display(&SourceValues::default());
        assert_eq!(ip, "Unknown");
        assert!(matches!(ip, Cow::Borrowed(_)));
    }

    #[test]
    fn test_display_resolved_is_owned() {
        let sources = SourceValues::default().with(IpSource::XRealIp, "192.168.1.1");
        let ip = visitor_ip_for_display(&sources);
        assert_eq!(ip, "192.168.1.1");
        assert!(matches!(ip, Cow::Owned(_)));
    }

    #[test]
    fn test_from_headers_captures_all_sources() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1"));
        headers.insert("client-ip", HeaderValue::from_static("3.3.3.3"));
        headers.insert("forwarded", HeaderValue::from_static("for=4.4.4.4"));
        let remote: SocketAddr = "127.0.0.1:5555".parse().unwrap();

        let sources = SourceValues::from_headers(&headers, Some(remote));
        assert_eq!(sources.get(IpSource::XForwardedFor), Some("1.1.1.1"));
        assert_eq!(sources.get(IpSource::ClientIp), Some("3.3.3.3"));
        assert_eq!(sources.get(IpSource::Forwarded), Some("for=4.4.4.4"));
        assert_eq!(sources.get(IpSource::XRealIp), None);
        // Port is dropped from the socket address
        assert_eq!(sources.get(IpSource::RemoteAddr), Some("127.0.0.1"));
    }

    #[test]
    fn test_with_replaces_existing_value() {
        let sources = SourceValues::default()
            .with(IpSource::XRealIp, "1.1.1.1")
            .with(IpSource::XRealIp, "2.2.2.2");
        assert_eq!(sources.get(IpSource::XRealIp), Some("2.2.2.2"));
    }

    #[test]
    fn test_long_proxy_chain() {
        let long_chain = (0..100)
            .map(|i| format!("10.0.0.{}", i % 256))
            .collect::<Vec<_>>()
            .join(", ");
        let sources = SourceValues::default().with(IpSource::XForwardedFor, long_chain);

        assert_eq!(resolve_visitor_ip(&sources).addr(), Some(ip("10.0.0.0")));
    }
}
