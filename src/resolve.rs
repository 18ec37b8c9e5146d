use anyhow::{anyhow, Error, Result};
use std::net::{IpAddr, ToSocketAddrs};

/// Resolves `server` through the system resolver. IP literals resolve to
/// themselves without a lookup.
pub fn resolve_host(server: &str) -> Result<Vec<IpAddr>> {
    if server.is_empty() {
        return Err(resolution_failed(server, "empty hostname"));
    }

    let addrs: Vec<IpAddr> = (server, 0)
        .to_socket_addrs()
        .map_err(|e| resolution_failed(server, e))?
        .map(|addr| addr.ip())
        .collect();

    if addrs.is_empty() {
        return Err(resolution_failed(server, "no addresses returned"));
    }

    tracing::info!(server, addresses = ?addrs, "resolved hostname");
    Ok(addrs)
}

fn resolution_failed(server: &str, reason: impl std::fmt::Display) -> Error {
    tracing::error!(server, error = %reason, "hostname resolution failed");
    anyhow!("Unable to resolve hostname {}: {}", server, reason)
}
