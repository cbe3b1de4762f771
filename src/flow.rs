//! Flow identity: the (endpoint, endpoint) quadruple a TCP stream belongs
//! to, and a cheap, process-stable hash of it for log lines.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

/// One endpoint of a TCP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Which side of a bidirectional flow a stream belongs to.
///
/// `ClientToServer` is the half carrying the client's bytes (what the
/// server reads); `ServerToClient` carries the server's handshake bytes,
/// which is the half this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Identifies a bidirectional TCP conversation.
///
/// Unordered: `FlowKey::new(a, b) == FlowKey::new(b, a)`. Direction is
/// tracked separately, alongside the assembler's per-`(FlowKey, Direction)`
/// stream table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    lo: Endpoint,
    hi: Endpoint,
}

impl FlowKey {
    pub fn new(a: Endpoint, b: Endpoint) -> Self {
        if (a.addr, a.port) <= (b.addr, b.port) {
            FlowKey { lo: a, hi: b }
        } else {
            FlowKey { lo: b, hi: a }
        }
    }

    /// Renders `src -> dst` given the direction a segment travelled, for use
    /// in the handler's log prefix.
    pub fn endpoints(&self, dir: Direction) -> (Endpoint, Endpoint) {
        match dir {
            Direction::ClientToServer => (self.lo, self.hi),
            Direction::ServerToClient => (self.hi, self.lo),
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.lo, self.hi)
    }
}

/// A stable, non-cryptographic 64-bit hash of a flow key.
///
/// Only needs to be stable for the lifetime of this process — it appears in
/// log lines (`flowhash:<16-hex>`) purely to let an operator correlate
/// sightings of the same flow, not as a security boundary.
pub fn flow_hash(key: &FlowKey) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(ip: &str, port: u16) -> Endpoint {
        Endpoint { addr: ip.parse().unwrap(), port }
    }

    #[test]
    fn unordered_equality() {
        let a = ep("10.0.0.1", 443);
        let b = ep("10.0.0.2", 51000);
        assert_eq!(FlowKey::new(a, b), FlowKey::new(b, a));
    }

    #[test]
    fn hash_is_stable_within_process() {
        let a = ep("10.0.0.1", 443);
        let b = ep("10.0.0.2", 51000);
        let key = FlowKey::new(a, b);
        assert_eq!(flow_hash(&key), flow_hash(&key));
    }
}
