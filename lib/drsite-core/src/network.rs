//! Address derivation for subnetworks

use crate::{CoreError, Result};
use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Gateway of a subnetwork: the address right after the network address.
///
/// Fails when that address falls outside the block (a /32 or /128).
pub fn gateway_address(cidr: &IpNetwork) -> Result<IpAddr> {
    let gateway = match cidr.network() {
        IpAddr::V4(addr) => u32::from(addr)
            .checked_add(1)
            .map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        IpAddr::V6(addr) => u128::from(addr)
            .checked_add(1)
            .map(|n| IpAddr::V6(Ipv6Addr::from(n))),
    };

    match gateway {
        Some(addr) if cidr.contains(addr) => Ok(addr),
        _ => Err(CoreError::TransformPolicy(format!(
            "range {} has no room for a gateway address",
            cidr
        ))),
    }
}
