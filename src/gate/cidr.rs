//! Binary CIDR containment.
//!
//! Both addresses are compared in their fixed-width octet form (4 bytes for
//! IPv4, 16 for IPv6). Whole bytes covered by the prefix are compared
//! directly; a trailing partial byte is compared under a left-justified mask.
//!
//! Malformed ranges never raise: [`CidrRange::parse`] returns `None` and
//! [`cidr_matches`] answers `false`.

use std::fmt;
use std::net::IpAddr;

/// Parsed `address/prefix` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    /// Subnet address as written (host bits are not cleared)
    subnet: IpAddr,
    /// Prefix length, at most 32 for IPv4 and 128 for IPv6
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "2001:db8::/32").
    ///
    /// Returns `None` when the `/` is missing, the prefix is not a number,
    /// the subnet is not an IP address, or the prefix exceeds the family width.
    pub fn parse(cidr: &str) -> Option<Self> {
        let (subnet, bits) = cidr.trim().split_once('/')?;

        let subnet: IpAddr = subnet.parse().ok()?;
        let prefix_len: u8 = bits.parse().ok()?;

        if prefix_len > max_prefix(&subnet) {
            return None;
        }

        Some(Self { subnet, prefix_len })
    }

    /// Subnet address of the range.
    pub fn subnet(&self) -> IpAddr {
        self.subnet
    }

    /// Prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Check if an IP address lies inside this range.
    ///
    /// An address of the other family never matches.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.subnet, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                prefix_matches(&net.octets(), &addr.octets(), self.prefix_len)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                prefix_matches(&net.octets(), &addr.octets(), self.prefix_len)
            }
            _ => false,
        }
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subnet, self.prefix_len)
    }
}

/// Check `ip` against an unparsed CIDR string.
///
/// Returns `false` for anything [`CidrRange::parse`] rejects.
pub fn cidr_matches(ip: &IpAddr, cidr: &str) -> bool {
    CidrRange::parse(cidr).is_some_and(|range| range.contains(ip))
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Compare the leading `prefix_len` bits of two equal-width octet strings.
fn prefix_matches(subnet: &[u8], addr: &[u8], prefix_len: u8) -> bool {
    if subnet.len() != addr.len() {
        return false;
    }

    let whole_bytes = usize::from(prefix_len / 8);
    let remaining_bits = prefix_len % 8;

    if whole_bytes > subnet.len() {
        return false;
    }

    let (subnet_head, subnet_tail) = subnet.split_at(whole_bytes);
    let (addr_head, addr_tail) = addr.split_at(whole_bytes);

    if subnet_head != addr_head {
        return false;
    }

    if remaining_bits == 0 {
        return true;
    }

    match (subnet_tail.first(), addr_tail.first()) {
        (Some(net_byte), Some(addr_byte)) => {
            let mask = 0xFF_u8 << (8 - remaining_bits);
            (net_byte & mask) == (addr_byte & mask)
        }
        // Prefix already covers every byte
        _ => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_cidr_parse_ipv4() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();
        assert_eq!(cidr.prefix_len(), 8);
        assert_eq!(cidr.subnet(), ip("10.0.0.0"));
    }

    #[test]
    fn test_cidr_parse_ipv6() {
        let cidr = CidrRange::parse("2001:db8::/32").unwrap();
        assert_eq!(cidr.prefix_len(), 32);
    }

    #[test]
    fn test_cidr_parse_rejects_malformed() {
        assert!(CidrRange::parse("192.168.1.1").is_none()); // no slash
        assert!(CidrRange::parse("not-an-ip/24").is_none());
        assert!(CidrRange::parse("10.0.0.0/abc").is_none());
        assert!(CidrRange::parse("10.0.0.0/").is_none());
        assert!(CidrRange::parse("10.0.0.0/-1").is_none());
        assert!(CidrRange::parse("10.0.0.0/24/8").is_none());
    }

    #[test]
    fn test_cidr_parse_rejects_prefix_out_of_range() {
        assert!(CidrRange::parse("10.0.0.0/33").is_none());
        assert!(CidrRange::parse("::/129").is_none());
        assert!(CidrRange::parse("10.0.0.0/32").is_some());
        assert!(CidrRange::parse("::/128").is_some());
    }

    #[test]
    fn test_cidr_contains_slash24() {
        assert!(cidr_matches(&ip("192.168.1.5"), "192.168.1.0/24"));
        assert!(!cidr_matches(&ip("192.168.2.5"), "192.168.1.0/24"));
    }

    #[test]
    fn test_cidr_contains_partial_byte_prefix() {
        assert!(cidr_matches(&ip("10.0.0.1"), "10.0.0.0/30"));
        assert!(cidr_matches(&ip("10.0.0.3"), "10.0.0.0/30"));
        assert!(!cidr_matches(&ip("10.0.0.4"), "10.0.0.0/30"));
        assert!(!cidr_matches(&ip("10.0.0.5"), "10.0.0.0/30"));
    }

    #[test]
    fn test_cidr_contains_slash12() {
        let cidr = CidrRange::parse("172.16.0.0/12").unwrap();
        assert!(cidr.contains(&ip("172.16.0.1")));
        assert!(cidr.contains(&ip("172.31.255.255")));
        assert!(!cidr.contains(&ip("172.32.0.0")));
    }

    #[test]
    fn test_cidr_zero_prefix_matches_whole_family() {
        assert!(cidr_matches(&ip("8.8.8.8"), "0.0.0.0/0"));
        assert!(cidr_matches(&ip("2001:db8::1"), "::/0"));
        assert!(!cidr_matches(&ip("2001:db8::1"), "0.0.0.0/0"));
    }

    #[test]
    fn test_cidr_full_prefix_is_exact() {
        assert!(cidr_matches(&ip("10.1.2.3"), "10.1.2.3/32"));
        assert!(!cidr_matches(&ip("10.1.2.4"), "10.1.2.3/32"));
        assert!(cidr_matches(&ip("::1"), "::1/128"));
        assert!(!cidr_matches(&ip("::2"), "::1/128"));
    }

    #[test]
    fn test_cidr_host_bits_in_subnet_are_ignored() {
        assert!(cidr_matches(&ip("192.168.1.200"), "192.168.1.77/24"));
    }

    #[test]
    fn test_cidr_ipv6_partial_byte_prefix() {
        // /36 keeps the high nibble of the fifth byte
        assert!(cidr_matches(&ip("2001:db8:0fff::1"), "2001:db8::/36"));
        assert!(!cidr_matches(&ip("2001:db8:1000::1"), "2001:db8::/36"));
    }

    #[test]
    fn test_cidr_family_mismatch_never_matches() {
        assert!(!cidr_matches(&ip("::ffff:10.0.0.1"), "10.0.0.0/8"));
        assert!(!cidr_matches(&ip("10.0.0.1"), "::/0"));
    }

    #[test]
    fn test_cidr_display() {
        let cidr = CidrRange::parse(" 10.0.0.0/8 ").unwrap();
        assert_eq!(cidr.to_string(), "10.0.0.0/8");
    }
}
