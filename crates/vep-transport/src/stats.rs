//! Cumulative counters shared by both transport abstractions.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct TransportStats {
    pub messages_sent: AtomicU64,
    pub messages_failed: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub bytes_received: AtomicU64,
    pub last_send_timestamp_ns: AtomicU64,
    pub last_receive_timestamp_ns: AtomicU64,
}

impl TransportStats {
    pub fn record_send(&self, bytes: usize, timestamp_ns: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.last_send_timestamp_ns.store(timestamp_ns, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.messages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive(&self, bytes: usize, timestamp_ns: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        self.last_receive_timestamp_ns.store(timestamp_ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportStatsSnapshot {
        TransportStatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            last_send_timestamp_ns: self.last_send_timestamp_ns.load(Ordering::Relaxed),
            last_receive_timestamp_ns: self.last_receive_timestamp_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStatsSnapshot {
    pub messages_sent: u64,
    pub messages_failed: u64,
    pub bytes_sent: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub last_send_timestamp_ns: u64,
    pub last_receive_timestamp_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_receive_updates_count_bytes_and_timestamp() {
        let stats = TransportStats::default();
        stats.record_receive(12, 1_000);
        stats.record_receive(8, 2_000);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.bytes_received, 20);
        assert_eq!(snapshot.last_receive_timestamp_ns, 2_000);
        assert_eq!(snapshot.messages_sent, 0);
    }
}
