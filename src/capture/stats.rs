//! Capture statistics: both the backend's live packet-drop counters and the
//! end-of-run summary (elapsed time, throughput, packet rate) computed the
//! way the original extractor's exit summary computes it.

use std::time::Duration;

/// Packets-seen/dropped counters as reported by the capture backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub received: u32,
    pub dropped: u32,
    pub if_dropped: u32,
}

impl From<pcap::Stat> for CaptureStats {
    fn from(stat: pcap::Stat) -> Self {
        CaptureStats {
            received: stat.received,
            dropped: stat.dropped,
            if_dropped: stat.if_dropped,
        }
    }
}

/// Totals accumulated over a full capture run, used to render the
/// end-of-run summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTotals {
    pub bytes: u64,
    pub packets: u64,
    /// `last_packet_timestamp - first_packet_timestamp`, i.e. the span the
    /// capture itself covers — not wall-clock run time.
    pub capture_span: Duration,
    /// Wall-clock time this process spent running the ingestion loop.
    pub wall_clock: Duration,
}

impl RunTotals {
    /// `"<rate> Kbit/s"` / `"Mbit/s"` / `"Gbit/s"`, scaled the same way the
    /// original extractor's exit summary scales it.
    pub fn bits_per_second_label(&self) -> String {
        let seconds = self.capture_span.as_secs_f64();
        if seconds <= 0.0 {
            return "0.000 Kbit/s".to_string();
        }

        let bps = 8.0 * (self.bytes as f64) / seconds;
        if bps < 1024.0 * 1024.0 {
            format!("{:.3} Kbit/s", bps / 1024.0)
        } else if bps < 1024.0 * 1024.0 * 1024.0 {
            format!("{:.3} Mbit/s", bps / (1024.0 * 1024.0))
        } else {
            format!("{:.3} Gbit/s", bps / (1024.0 * 1024.0 * 1024.0))
        }
    }

    pub fn packets_per_second(&self) -> f64 {
        let seconds = self.wall_clock.as_secs_f64();
        if seconds <= 0.0 {
            0.0
        } else {
            self.packets as f64 / seconds
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_to_kbit_for_small_rates() {
        let totals = RunTotals {
            bytes: 1_000,
            packets: 10,
            capture_span: Duration::from_secs(1),
            wall_clock: Duration::from_secs(1),
        };
        assert!(totals.bits_per_second_label().ends_with("Kbit/s"));
    }

    #[test]
    fn scales_to_mbit_for_large_rates() {
        let totals = RunTotals {
            bytes: 50_000_000,
            packets: 10,
            capture_span: Duration::from_secs(1),
            wall_clock: Duration::from_secs(1),
        };
        assert!(totals.bits_per_second_label().ends_with("Mbit/s"));
    }

    #[test]
    fn zero_span_does_not_divide_by_zero() {
        let totals = RunTotals::default();
        assert_eq!(totals.bits_per_second_label(), "0.000 Kbit/s");
        assert_eq!(totals.packets_per_second(), 0.0);
    }
}
