//! Default-router list: entries, the table seam, and the scan pass.

pub mod netlink;
pub mod scanner;

use crate::error::QueryError;
use std::net::Ipv6Addr;

pub use netlink::NetlinkRouterTable;
pub use scanner::{ScanReport, probe_default_routers, validate};

/// Upper bound on default-router entries looked at per scan pass.
pub const MAX_DEFAULT_ROUTERS: usize = 10;

/// One default router as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterEntry {
    pub address: Ipv6Addr,
    /// Zero terminates the list.
    pub interface_index: u32,
}

impl RouterEntry {
    pub fn new(address: Ipv6Addr, interface_index: u32) -> Self {
        Self {
            address,
            interface_index,
        }
    }
}

/// Source of the current default-router list.
pub trait RouterTable {
    /// Fetch a fresh copy of the list.
    ///
    /// Any query socket is owned by this call and closed on drop before it
    /// returns, on success and on every error path. Nothing is held between
    /// calls.
    fn default_routers(&self) -> Result<Vec<RouterEntry>, QueryError>;
}
