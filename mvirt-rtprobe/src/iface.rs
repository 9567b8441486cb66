//! Interface name <-> index helpers.

use crate::error::ConfigError;
use std::fmt;

/// Resolve an interface name to its kernel index.
pub fn resolve_index(name: &str) -> Result<u32, ConfigError> {
    nix::net::if_::if_nametoindex(name).map_err(|e| ConfigError::UnknownInterface(name.to_string(), e))
}

/// Interface name for log messages. Falls back to the index when the
/// interface has gone away.
pub fn interface_name(index: u32) -> String {
    match nix::net::if_::if_indextoname(index) {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(_) => format!("ifindex {}", index),
    }
}

/// Interface index that prints as its name.
///
/// The lookup happens when formatted, so a log line below the active level
/// costs no syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfName(pub u32);

impl fmt::Display for IfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&interface_name(self.0))
    }
}
