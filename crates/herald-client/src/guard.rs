//! Outbound URL guard.
//!
//! Allowlisted domains are public news sites; anything resolving into a
//! loopback, private or otherwise reserved range is refused before a
//! connection is made.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use herald_core::error::AppError;
use url::Url;

/// Refuse non-http(s) URLs and hosts that resolve to reserved addresses.
pub async fn check_public_url(raw: &str) -> Result<(), AppError> {
    let url = Url::parse(raw).map_err(|e| AppError::HttpError(format!("Invalid URL {raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::HttpError(format!(
            "Refusing {} URL {raw}",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| AppError::HttpError(format!("URL has no host: {raw}")))?;

    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        return refuse_reserved(host, ip);
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let resolved = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS lookup failed for {host}: {e}")))?;

    let mut any = false;
    for addr in resolved {
        any = true;
        refuse_reserved(host, addr.ip())?;
    }
    if !any {
        return Err(AppError::NetworkError(format!("No addresses for {host}")));
    }
    Ok(())
}

fn refuse_reserved(host: &str, ip: IpAddr) -> Result<(), AppError> {
    if is_reserved(ip) {
        tracing::warn!(host, %ip, "Blocked request to reserved address");
        return Err(AppError::HttpError(format!(
            "Blocked request to {host}: {ip} is a reserved address"
        )));
    }
    Ok(())
}

pub fn is_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_reserved_v4(v4),
        IpAddr::V6(v6) => is_reserved_v6(v6),
    }
}

fn is_reserved_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        // carrier-grade NAT, 100.64.0.0/10
        || (a == 100 && (64..128).contains(&b))
}

fn is_reserved_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_reserved_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xffc0) == 0xfe80
        || (first & 0xfe00) == 0xfc00
}
