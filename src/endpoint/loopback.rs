//! Loopback address detection
//!
//! Certificate checks are only relaxed for runtimes on this machine, so the
//! test has to hold for literal addresses and for names that resolve to
//! loopback (`localhost`, `/etc/hosts` aliases).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::Url;

const LOOPBACK_ADDRESSES: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::LOCALHOST),
    IpAddr::V6(Ipv6Addr::LOCALHOST),
];

/// Whether `ip` is one of the loopback addresses (IPv4-mapped IPv6 included)
pub fn is_loopback_ip(ip: IpAddr) -> bool {
    LOOPBACK_ADDRESSES.contains(&ip.to_canonical())
}

/// Whether `host` names this machine
///
/// Accepts `localhost`, bracketed or bare IP literals, and host names whose
/// every resolved address is loopback. Resolution failures count as remote.
pub async fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_loopback_ip(ip);
    }

    resolves_to_loopback(host).await
}

/// Whether every address `host` resolves to is loopback
async fn resolves_to_loopback(host: &str) -> bool {
    match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => {
            let addrs: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
            tracing::trace!(host, ?addrs, "Resolved host for loopback check");
            all_loopback(&addrs)
        }
        Err(e) => {
            tracing::debug!(host, error = %e, "Could not resolve host, treating as remote");
            false
        }
    }
}

fn all_loopback(addrs: &[IpAddr]) -> bool {
    !addrs.is_empty() && addrs.iter().copied().all(is_loopback_ip)
}

/// Whether TLS certificate validation may be skipped for `url`
///
/// Only for `https` URLs that point at this machine.
pub async fn relaxes_certificate_validation(url: &Url) -> bool {
    if url.scheme() != "https" {
        return false;
    }
    match url.host_str() {
        Some(host) => is_loopback_host(host).await,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_literal_loopback_addresses() {
        assert!(is_loopback_host("127.0.0.1").await);
        assert!(is_loopback_host("::1").await);
        assert!(is_loopback_host("[::1]").await);
        assert!(is_loopback_host("localhost").await);
        assert!(is_loopback_host("::ffff:127.0.0.1").await);
    }

    #[tokio::test]
    async fn test_names_resolving_to_loopback() {
        // Resolved through the system resolver, not the literal shortcut
        assert!(resolves_to_loopback("localhost").await);
        assert!(!resolves_to_loopback("no-such-host.invalid").await);
    }

    #[test]
    fn test_resolved_addresses_must_all_be_loopback() {
        let v4 = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let lan: IpAddr = "192.168.1.20".parse().unwrap();

        assert!(all_loopback(&[v4, v6]));
        assert!(!all_loopback(&[v4, lan]));
        assert!(!all_loopback(&[]));
    }

    #[tokio::test]
    async fn test_remote_addresses() {
        assert!(!is_loopback_host("10.0.2.2").await);
        assert!(!is_loopback_host("192.168.1.20").await);
        assert!(!is_loopback_host("[fe80::1]").await);
        assert!(!is_loopback_host("example.com").await);
    }

    #[tokio::test]
    async fn test_certificate_relaxation_needs_https_and_loopback() {
        let local = Url::parse("https://127.0.0.1:9222").unwrap();
        assert!(relaxes_certificate_validation(&local).await);

        let local_v6 = Url::parse("https://[::1]:9222").unwrap();
        assert!(relaxes_certificate_validation(&local_v6).await);

        let remote = Url::parse("https://example.com:9222").unwrap();
        assert!(!relaxes_certificate_validation(&remote).await);

        let plain = Url::parse("http://127.0.0.1:9222").unwrap();
        assert!(!relaxes_certificate_validation(&plain).await);
    }
}
