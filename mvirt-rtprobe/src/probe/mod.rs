//! Probe channel: a send-only raw IPv6 socket for router reachability probes.
//!
//! Each probe is an IPv6 packet with next header "no next header" and no
//! payload. The outgoing interface and a hop limit of 1 ride along as
//! ancillary data, so the packet can never leave the attached link.

mod cmsg;

pub use cmsg::{ControlBuffer, ControlBufferFull, Record, Records, record_space};

use crate::error::{InitError, SendError};
use crate::iface::IfName;
use log::{debug, error};
use socket2::{Domain, MsgHdr, Protocol, SockAddr, Socket, Type};
use std::io::{self, IoSlice};
use std::mem;
use std::net::{Ipv6Addr, Shutdown, SocketAddrV6};

/// Hop limit carried by every probe.
pub const PROBE_HOP_LIMIT: libc::c_int = 1;

/// Sends one reachability probe to a router.
pub trait Prober {
    fn probe(&mut self, target: Ipv6Addr, interface_index: u32) -> Result<(), SendError>;
}

/// Reusable message envelope: destination slot plus control records.
///
/// Both are rewritten by every [`ProbeMessage::prepare`] call, so no
/// addressing survives from one probe to the next.
#[derive(Debug, Clone)]
pub struct ProbeMessage {
    destination: SocketAddrV6,
    control: ControlBuffer,
}

impl ProbeMessage {
    pub fn new() -> Self {
        Self {
            destination: SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0),
            control: ControlBuffer::for_records(&[
                mem::size_of::<libc::in6_pktinfo>(),
                mem::size_of::<libc::c_int>(),
            ]),
        }
    }

    /// Address the envelope to `target` via `interface_index`.
    pub fn prepare(
        &mut self,
        target: Ipv6Addr,
        interface_index: u32,
    ) -> Result<(), ControlBufferFull> {
        // Linux refuses link-local destinations without a scope.
        self.destination = SocketAddrV6::new(target, 0, 0, interface_index);

        self.control.clear();

        // Pin the outgoing interface, let the stack pick the source.
        let pktinfo = libc::in6_pktinfo {
            ipi6_addr: libc::in6_addr {
                s6_addr: Ipv6Addr::UNSPECIFIED.octets(),
            },
            ipi6_ifindex: interface_index,
        };
        self.control
            .push(libc::IPPROTO_IPV6, libc::IPV6_PKTINFO, &pktinfo)?;
        self.control
            .push(libc::IPPROTO_IPV6, libc::IPV6_HOPLIMIT, &PROBE_HOP_LIMIT)?;

        Ok(())
    }

    pub fn destination(&self) -> SocketAddrV6 {
        self.destination
    }

    pub fn control(&self) -> &ControlBuffer {
        &self.control
    }

    /// Probes carry no payload.
    pub fn payload_len(&self) -> usize {
        0
    }
}

impl Default for ProbeMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw `IPPROTO_NONE` socket plus its reusable envelope.
///
/// Opened once at startup. `probe` takes `&mut self` because the envelope is
/// rewritten in place, so callers sharing a channel across threads have to
/// serialize access themselves.
pub struct ProbeChannel {
    socket: Socket,
    message: ProbeMessage,
}

impl ProbeChannel {
    /// Open the probe socket. Requires `CAP_NET_RAW`.
    pub fn open() -> Result<Self, InitError> {
        let message = ProbeMessage::new();

        let socket = Socket::new(
            Domain::IPV6,
            Type::RAW,
            Some(Protocol::from(libc::IPPROTO_NONE)),
        )
        .map_err(|e| {
            error!("Failed to open probe socket: {}", e);
            InitError::Socket(e)
        })?;

        // Make the socket send-only. Some kernels report ENOTCONN for an
        // unconnected raw socket; the probe path never reads, so carry on.
        if let Err(e) = socket.shutdown(Shutdown::Read) {
            debug!("Probe socket receive half left open: {}", e);
        }

        debug!(
            "Probe channel open ({} bytes of control space)",
            message.control.capacity()
        );

        Ok(Self { socket, message })
    }

    fn send(&self) -> io::Result<usize> {
        let addr = SockAddr::from(self.message.destination);
        let payload = [IoSlice::new(&[])];
        let msg = MsgHdr::new()
            .with_addr(&addr)
            .with_buffers(&payload)
            .with_control(self.message.control.as_bytes());
        self.socket.sendmsg(&msg, 0)
    }
}

impl Prober for ProbeChannel {
    fn probe(&mut self, target: Ipv6Addr, interface_index: u32) -> Result<(), SendError> {
        if let Err(e) = self.message.prepare(target, interface_index) {
            error!("Failed to build probe for {}: {}", target, e);
            return Err(SendError {
                target,
                interface_index,
                source: io::Error::other(e),
            });
        }

        debug!("probe a router {} on {}", target, IfName(interface_index));

        match self.send() {
            Ok(_) => Ok(()),
            Err(source) => {
                error!(
                    "sendmsg to {} on {}: {}",
                    target,
                    IfName(interface_index),
                    source
                );
                Err(SendError {
                    target,
                    interface_index,
                    source,
                })
            }
        }
    }
}
