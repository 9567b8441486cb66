//! Error types for rtprobe.

use std::io;
use std::net::Ipv6Addr;
use thiserror::Error;

/// Probe channel could not be set up. Fatal to the probing subsystem.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Failed to open raw IPv6 probe socket: {0}")]
    Socket(io::Error),
}

/// Default-router table could not be read. Aborts the current scan pass only.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to open netlink socket: {0}")]
    Open(io::Error),

    #[error("Netlink send failed: {0}")]
    Send(io::Error),

    #[error("Netlink receive failed: {0}")]
    Recv(io::Error),

    #[error("Failed to decode netlink message: {0}")]
    Decode(String),

    #[error("Kernel rejected route dump: {0}")]
    Kernel(String),
}

/// Router entry that must never be probed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationWarning {
    #[error("default router list contains a non-linklocal address ({address}) on interface {interface_index}")]
    NotLinkLocal {
        address: Ipv6Addr,
        interface_index: u32,
    },
}

/// Transmission failure for a single probe target.
#[derive(Debug, Error)]
#[error("sendmsg to {target} on interface {interface_index} failed: {source}")]
pub struct SendError {
    pub target: Ipv6Addr,
    pub interface_index: u32,
    #[source]
    pub source: io::Error,
}

/// Daemon configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No interface given")]
    NoInterface,

    #[error("Unknown interface '{0}': {1}")]
    UnknownInterface(String, nix::errno::Errno),
}
