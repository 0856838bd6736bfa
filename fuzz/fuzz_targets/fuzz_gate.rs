//! Fuzz testing for the address parsers behind the gate.
//!
//! Every function here sees attacker-controlled header and query text, so
//! none of them may panic on any input.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_gate -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `CidrRange::parse` and `cidr_matches`: whitelist range entries
//! - `sanitize_ip`: forwarded header values
//! - `Allowlist::from_csv`: the raw `ACCESS_KEY_WHITELIST` value
//! - `QueryParams::parse`: the request query string

#![no_main]

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use accesskey_gate::gate::{Allowlist, CidrRange, QueryParams, cidr_matches, sanitize_ip};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(range) = CidrRange::parse(s) {
        let _ = range.contains(&range.subnet());
        let _ = range.to_string();
    }

    let probes = [
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
    ];
    for ip in &probes {
        let _ = cidr_matches(ip, s);
    }

    if let Ok(ip) = sanitize_ip(s) {
        // Anything accepted must round-trip through the exact-match path
        assert!(Allowlist::from_csv(&ip.to_string()).contains(&ip));
    }

    let list = Allowlist::from_csv(s);
    for ip in &probes {
        let _ = list.contains(ip);
    }

    let query = QueryParams::parse(Some(s));
    let _ = query.contains("letmein");
});
