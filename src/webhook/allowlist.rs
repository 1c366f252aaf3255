//! Source IP allowlist for the webhook endpoint.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid allowlist entry '{0}': expected an IP address or CIDR block")]
pub struct AllowlistError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Exact(IpAddr),
    Cidr { network: IpAddr, prefix: u8 },
}

impl Entry {
    fn parse(raw: &str) -> Result<Self, AllowlistError> {
        let raw = raw.trim();
        let invalid = || AllowlistError(raw.to_string());

        let Some((addr, prefix)) = raw.split_once('/') else {
            let ip: IpAddr = raw.parse().map_err(|_| invalid())?;
            return Ok(Entry::Exact(ip.to_canonical()));
        };

        let network: IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(invalid());
        }
        Ok(Entry::Cidr { network, prefix })
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match *self {
            Entry::Exact(allowed) => allowed == ip,
            Entry::Cidr { network, prefix } => match (network, ip) {
                (IpAddr::V4(net), IpAddr::V4(ip)) => {
                    let mask = mask_u32(prefix);
                    u32::from(net) & mask == u32::from(ip) & mask
                }
                (IpAddr::V6(net), IpAddr::V6(ip)) => {
                    let mask = mask_u128(prefix);
                    u128::from(net) & mask == u128::from(ip) & mask
                }
                _ => false,
            },
        }
    }
}

fn mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

/// Parsed allowlist. An empty list admits every caller.
#[derive(Debug, Clone, Default)]
pub struct IpAllowlist {
    entries: Vec<Entry>,
}

impl IpAllowlist {
    pub fn parse(entries: &[String]) -> Result<Self, AllowlistError> {
        let entries = entries
            .iter()
            .filter(|e| !e.trim().is_empty())
            .map(|e| Entry::parse(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// IPv4-mapped IPv6 callers are matched as IPv4.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        self.entries.iter().any(|entry| entry.contains(ip))
    }

    pub fn permits(&self, ip: Option<IpAddr>) -> bool {
        if self.is_empty() {
            return true;
        }
        ip.is_some_and(|ip| self.contains(ip))
    }
}

/// Caller IP: first `X-Forwarded-For` entry, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    forwarded.or_else(|| peer.map(|addr| addr.ip()))
}
