use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Process-wide ingestion counters, shared between the pipeline and the status API.
#[derive(Debug, Default)]
pub struct IngestStats {
    connected: AtomicBool,
    frames_received: AtomicU64,
    decode_failures: AtomicU64,
    creations_written: AtomicU64,
    migrations_written: AtomicU64,
    trades_written: AtomicU64,
    write_failures: AtomicU64,
    metadata_failures: AtomicU64,
    spam_skipped: AtomicU64,
    subscribed_mints: AtomicU64,
    reconnects: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub connected: bool,
    pub frames_received: u64,
    pub decode_failures: u64,
    pub creations_written: u64,
    pub migrations_written: u64,
    pub trades_written: u64,
    pub write_failures: u64,
    pub metadata_failures: u64,
    pub spam_skipped: u64,
    pub subscribed_mints: u64,
    pub reconnects: u64,
}

impl IngestStats {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn creation_written(&self) {
        self.creations_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn migration_written(&self) {
        self.migrations_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn trade_written(&self) {
        self.trades_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_failed(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn metadata_failed(&self) {
        self.metadata_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn spam_skipped(&self) {
        self.spam_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_subscribed_mints(&self, count: usize) {
        self.subscribed_mints.store(count as u64, Ordering::Relaxed);
    }

    pub fn reconnected(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connected: self.connected.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            creations_written: self.creations_written.load(Ordering::Relaxed),
            migrations_written: self.migrations_written.load(Ordering::Relaxed),
            trades_written: self.trades_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            metadata_failures: self.metadata_failures.load(Ordering::Relaxed),
            spam_skipped: self.spam_skipped.load(Ordering::Relaxed),
            subscribed_mints: self.subscribed_mints.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
