//! mvirt-rtprobe - active reachability probing of IPv6 default routers.
//!
//! Instead of waiting for router advertisements to time out, each default
//! router is sent a minimal probe: an empty `IPPROTO_NONE` packet with hop
//! limit 1, pinned to the router's interface. The kernel's neighbor discovery
//! takes it from there; this crate only sends.
//!
//! ## Architecture
//!
//! - **Probe channel** ([`probe`]): one raw socket plus a reusable envelope
//! - **Router scanner** ([`router`]): reads the default-router list and probes
//!   each eligible entry

pub mod error;
pub mod iface;
pub mod probe;
pub mod router;

use crate::error::ConfigError;
use crate::probe::Prober;
use crate::router::{RouterTable, ScanReport, probe_default_routers};
use log::info;
use std::time::Duration;

pub use crate::probe::ProbeChannel;
pub use crate::router::{NetlinkRouterTable, RouterEntry};

/// Configuration for the probe daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interfaces whose default routers get probed.
    pub interfaces: Vec<String>,
    /// Time between probe passes.
    pub interval: Duration,
    /// Run a single pass and exit.
    pub once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            interval: Duration::from_secs(60),
            once: false,
        }
    }
}

impl Config {
    /// Resolve configured interface names to kernel indices.
    pub fn resolve_interfaces(&self) -> Result<Vec<u32>, ConfigError> {
        if self.interfaces.is_empty() {
            return Err(ConfigError::NoInterface);
        }
        self.interfaces
            .iter()
            .map(|name| iface::resolve_index(name))
            .collect()
    }
}

/// Run one probe pass over every interface in `interfaces`.
pub fn run_pass<T, P>(table: &T, prober: &mut P, interfaces: &[u32]) -> ScanReport
where
    T: RouterTable + ?Sized,
    P: Prober + ?Sized,
{
    let mut total = ScanReport::default();
    for &index in interfaces {
        total.merge(probe_default_routers(table, prober, index));
    }

    info!(
        "Probe pass done: {} probed, {} rejected, {} failed",
        total.probed.len(),
        total.rejected.len(),
        total.failed.len()
    );

    total
}
