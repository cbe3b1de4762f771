//! Packet capture backends.
//!
//! `pcap::Capture` is a blocking API; [`PacketSource`] abstracts over it (and
//! over a literal in-memory fixture in tests) so the ingestion loop never
//! names `pcap` directly and can run a capture source on a blocking thread
//! without the rest of the loop caring which kind it is.

use std::path::Path;
use std::time::Duration;

use super::stats::CaptureStats;
use crate::error::HarvestError;

/// One packet as handed back by a capture backend.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// Capture timestamp. For an offline file this is the recorded
    /// timestamp, not wall-clock time — it drives the ingestion loop's
    /// virtual clock.
    pub timestamp: Duration,
    pub data: Vec<u8>,
}

/// A blocking packet source: a live interface or an offline capture file.
pub trait PacketSource: Send {
    /// Returns the next packet, or `None` at end-of-input — EOF for an
    /// offline file, or after the backend observes an interrupt for a live
    /// capture.
    fn next_packet(&mut self) -> Option<RawPacket>;

    /// A best-effort stats snapshot (packets received/dropped) as of the
    /// last read.
    fn stats(&mut self) -> CaptureStats;
}

fn to_raw_packet(packet: pcap::Packet<'_>) -> RawPacket {
    let ts = Duration::new(
        packet.header.ts.tv_sec.max(0) as u64,
        (packet.header.ts.tv_usec.max(0) as u32).saturating_mul(1000),
    );
    RawPacket { timestamp: ts, data: packet.data.to_vec() }
}

/// A live network interface.
pub struct LiveSource {
    capture: pcap::Capture<pcap::Active>,
}

impl LiveSource {
    pub fn open(device: &str, bpf: &str) -> Result<Self, HarvestError> {
        let mut capture = pcap::Capture::from_device(device)
            .and_then(|c| c.promisc(true).snaplen(65536).open())
            .map_err(|e| HarvestError::Capture(e.into()))?;
        capture
            .filter(bpf, true)
            .map_err(|e| HarvestError::Bpf { filter: bpf.to_string(), source: e.into() })?;
        Ok(LiveSource { capture })
    }
}

impl PacketSource for LiveSource {
    fn next_packet(&mut self) -> Option<RawPacket> {
        self.capture.next_packet().ok().map(to_raw_packet)
    }

    fn stats(&mut self) -> CaptureStats {
        self.capture.stats().map(CaptureStats::from).unwrap_or_default()
    }
}

/// An offline pcap file, replayed once from start to EOF.
pub struct OfflineSource {
    capture: pcap::Capture<pcap::Offline>,
}

impl OfflineSource {
    pub fn open(path: &Path, bpf: &str) -> Result<Self, HarvestError> {
        let mut capture =
            pcap::Capture::from_file(path).map_err(|e| HarvestError::Capture(e.into()))?;
        capture
            .filter(bpf, true)
            .map_err(|e| HarvestError::Bpf { filter: bpf.to_string(), source: e.into() })?;
        Ok(OfflineSource { capture })
    }
}

impl PacketSource for OfflineSource {
    fn next_packet(&mut self) -> Option<RawPacket> {
        self.capture.next_packet().ok().map(to_raw_packet)
    }

    fn stats(&mut self) -> CaptureStats {
        CaptureStats::default()
    }
}
