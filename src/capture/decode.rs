//! Decodes a raw captured packet into the flow identity and TCP segment the
//! assembler needs. Anything that isn't a plain IPv4/IPv6-over-TCP packet —
//! truncated capture, unsupported link type, non-TCP transport — yields
//! `None` and the ingestion loop drops it silently (spec's "packets with
//! decoding errors are ignored" edge case).

use etherparse::{InternetSlice, SlicedPacket, TransportSlice};

use crate::assembler::TcpSegment;
use crate::flow::{Direction, Endpoint, FlowKey};

/// A packet decoded far enough to hand to the assembler.
pub struct Decoded {
    pub flow_key: FlowKey,
    /// One of two arbitrary-but-stable labels distinguishing this packet's
    /// direction of travel from its reverse; not a claim about which
    /// endpoint is the TLS client or server; `StreamHandler` makes that
    /// determination per-stream by inspecting the bytes themselves.
    pub direction: Direction,
    pub segment: TcpSegment,
}

pub fn decode(data: &[u8]) -> Option<Decoded> {
    let parsed = SlicedPacket::from_ethernet(data).ok()?;

    let (src_addr, dst_addr) = match parsed.ip? {
        InternetSlice::Ipv4(ipv4) => {
            (ipv4.source_addr().into(), ipv4.destination_addr().into())
        }
        InternetSlice::Ipv6(ipv6, _) => {
            (ipv6.source_addr().into(), ipv6.destination_addr().into())
        }
    };

    let tcp = match parsed.transport? {
        TransportSlice::Tcp(tcp) => tcp,
        _ => return None,
    };

    let src = Endpoint { addr: src_addr, port: tcp.source_port() };
    let dst = Endpoint { addr: dst_addr, port: tcp.destination_port() };
    let flow_key = FlowKey::new(src, dst);

    let (first, _second) = flow_key.endpoints(Direction::ClientToServer);
    let direction = if first == src { Direction::ClientToServer } else { Direction::ServerToClient };

    let segment = TcpSegment {
        seq: tcp.sequence_number(),
        payload: parsed.payload.to_vec(),
        fin: tcp.fin(),
        rst: tcp.rst(),
    };

    Some(Decoded { flow_key, direction, segment })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_ethernet_garbage() {
        assert!(decode(&[0u8; 4]).is_none());
    }
}
