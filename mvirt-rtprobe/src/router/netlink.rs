//! Default-router list from the kernel routing table via rtnetlink.

use super::{RouterEntry, RouterTable};
use crate::error::QueryError;
use log::debug;
use netlink_packet_core::{
    NLM_F_DUMP, NLM_F_REQUEST, NetlinkHeader, NetlinkMessage, NetlinkPayload,
};
use netlink_packet_route::route::{RouteAddress, RouteAttribute, RouteMessage};
use netlink_packet_route::{AddressFamily, RouteNetlinkMessage};
use netlink_sys::{Socket, SocketAddr, protocols::NETLINK_ROUTE};
use std::net::Ipv6Addr;

const RECV_BUFFER_SIZE: usize = 32 * 1024;

/// Reads IPv6 default routes with an `RTM_GETROUTE` dump.
///
/// Every query opens its own `NETLINK_ROUTE` socket and drops it before
/// returning.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetlinkRouterTable;

impl NetlinkRouterTable {
    pub fn new() -> Self {
        Self
    }
}

impl RouterTable for NetlinkRouterTable {
    fn default_routers(&self) -> Result<Vec<RouterEntry>, QueryError> {
        let mut socket = Socket::new(NETLINK_ROUTE).map_err(QueryError::Open)?;
        socket.bind_auto().map_err(QueryError::Open)?;
        socket
            .connect(&SocketAddr::new(0, 0))
            .map_err(QueryError::Open)?;

        let request = dump_request();
        socket.send(&request, 0).map_err(QueryError::Send)?;

        let mut routers = Vec::new();
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let size = socket
                .recv(&mut &mut buf[..], 0)
                .map_err(QueryError::Recv)?;
            if size == 0 {
                return Err(QueryError::Decode("empty netlink reply".into()));
            }

            if decode_chunk(&buf[..size], &mut routers)? {
                return Ok(routers);
            }
        }
    }
}

/// Walk the messages in one `recv` chunk, collecting default routers.
///
/// Returns `true` once `NLMSG_DONE` is seen. ACKs and unrelated messages are
/// skipped; a kernel error reply aborts the query.
fn decode_chunk(buf: &[u8], routers: &mut Vec<RouterEntry>) -> Result<bool, QueryError> {
    let mut offset = 0;
    while offset < buf.len() {
        let msg = NetlinkMessage::<RouteNetlinkMessage>::deserialize(&buf[offset..])
            .map_err(|e| QueryError::Decode(e.to_string()))?;

        match msg.payload {
            NetlinkPayload::Done(_) => return Ok(true),
            NetlinkPayload::Error(e) if e.code.is_some() => {
                return Err(QueryError::Kernel(e.to_io().to_string()));
            }
            NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewRoute(route)) => {
                for entry in routers_from_route(&route) {
                    if entry.interface_index == 0 {
                        debug!(
                            "Skipping default router {} without interface",
                            entry.address
                        );
                        continue;
                    }
                    routers.push(entry);
                }
            }
            _ => {}
        }

        let len = msg.header.length as usize;
        if len == 0 {
            break;
        }
        offset += len;
    }
    Ok(false)
}

fn dump_request() -> Vec<u8> {
    let mut route = RouteMessage::default();
    route.header.address_family = AddressFamily::Inet6;

    let mut header = NetlinkHeader::default();
    header.flags = NLM_F_REQUEST | NLM_F_DUMP;
    header.sequence_number = 1;

    let mut packet = NetlinkMessage::new(
        header,
        NetlinkPayload::from(RouteNetlinkMessage::GetRoute(route)),
    );
    packet.finalize();

    let mut buf = vec![0u8; packet.buffer_len()];
    packet.serialize(&mut buf[..]);
    buf
}

fn gateway_v6(attr: &RouteAttribute) -> Option<Ipv6Addr> {
    match attr {
        RouteAttribute::Gateway(RouteAddress::Inet6(addr)) => Some(*addr),
        _ => None,
    }
}

/// Default routers carried by one route message.
///
/// Only IPv6 routes with a zero-length destination prefix count. A plain
/// route yields its gateway and `RTA_OIF`; a multipath route yields one entry
/// per next hop.
pub fn routers_from_route(route: &RouteMessage) -> Vec<RouterEntry> {
    if route.header.address_family != AddressFamily::Inet6
        || route.header.destination_prefix_length != 0
    {
        return Vec::new();
    }

    let mut gateway = None;
    let mut oif = 0;
    let mut routers = Vec::new();

    for attr in &route.attributes {
        match attr {
            RouteAttribute::Gateway(_) => gateway = gateway_v6(attr),
            RouteAttribute::Oif(index) => oif = *index,
            RouteAttribute::MultiPath(hops) => {
                for hop in hops {
                    if let Some(addr) = hop.attributes.iter().find_map(gateway_v6) {
                        routers.push(RouterEntry::new(addr, hop.interface_index));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(addr) = gateway {
        routers.insert(0, RouterEntry::new(addr, oif));
    }

    routers
}
