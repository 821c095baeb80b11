use anyhow::Result;
use if_addrs::{get_if_addrs, IfAddr};
use std::net::Ipv4Addr;

/// First non-loopback IPv4 address of this host, used to tell the operator
/// where the admin surface is reachable. `None` when only loopback is up.
pub fn first_ipv4() -> Result<Option<Ipv4Addr>> {
    for iface in get_if_addrs()? {
        if let IfAddr::V4(v4) = iface.addr {
            if !v4.ip.is_loopback() {
                return Ok(Some(v4.ip));
            }
        }
    }
    Ok(None)
}
