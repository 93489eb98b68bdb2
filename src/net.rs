//! Local network address discovery for outbound sensor reports
//!
//! Best effort: a connected UDP socket reveals the interface used to reach the
//! probe address without sending anything. If that fails the hostname is
//! resolved instead, and loopback is the last resort.

use std::net::{IpAddr, Ipv4Addr};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

const HOSTNAME_FILES: [&str; 2] = ["/proc/sys/kernel/hostname", "/etc/hostname"];

pub async fn resolve_local_address(probe_address: &str) -> IpAddr {
    match probe_interface(probe_address).await {
        Ok(address) => {
            info!("Local address {} (via {})", address, probe_address);
            return address;
        }
        Err(e) => warn!("UDP probe to {} failed: {}", probe_address, e),
    }

    match resolve_hostname().await {
        Some(address) => {
            info!("Local address {} (via hostname)", address);
            address
        }
        None => {
            warn!("Hostname resolution failed, using loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn probe_interface(probe_address: &str) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect(probe_address).await?;
    let address = socket.local_addr()?.ip();

    if address.is_unspecified() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "probe socket bound to unspecified address",
        ));
    }
    Ok(address)
}

async fn hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }

    for path in HOSTNAME_FILES {
        if let Ok(content) = tokio::fs::read_to_string(path).await {
            let name = content.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

async fn resolve_hostname() -> Option<IpAddr> {
    let name = hostname().await?;
    debug!("Resolving hostname {}", name);

    let addresses = tokio::net::lookup_host((name.as_str(), 0)).await.ok()?;
    let addresses: Vec<IpAddr> = addresses.map(|address| address.ip()).collect();

    addresses
        .iter()
        .find(|address| address.is_ipv4())
        .or_else(|| addresses.first())
        .copied()
}
