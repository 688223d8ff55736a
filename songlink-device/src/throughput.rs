//! Link throughput
//!
//! Byte totals are atomics so the BLE callback context can count received
//! writes while the main loop counts everything else. [`RateMeter`] turns the
//! totals into per-second rates once a second.

use portable_atomic::{AtomicU32, Ordering};

/// Sampling window
pub const RATE_WINDOW_MS: u32 = 1000;

/// Free-running byte totals
#[derive(Debug, Default)]
pub struct ByteCounters {
    rx: AtomicU32,
    tx: AtomicU32,
}

impl ByteCounters {
    pub const fn new() -> Self {
        Self {
            rx: AtomicU32::new(0),
            tx: AtomicU32::new(0),
        }
    }

    /// Count received bytes
    pub fn add_rx(&self, bytes: usize) {
        self.rx.fetch_add(bytes as u32, Ordering::Relaxed);
    }

    /// Count sent bytes
    pub fn add_tx(&self, bytes: usize) {
        self.tx.fetch_add(bytes as u32, Ordering::Relaxed);
    }

    /// Total received, wrapping
    pub fn rx_total(&self) -> u32 {
        self.rx.load(Ordering::Relaxed)
    }

    /// Total sent, wrapping
    pub fn tx_total(&self) -> u32 {
        self.tx.load(Ordering::Relaxed)
    }
}

/// Per-second rates derived from [`ByteCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateMeter {
    window_start_ms: Option<u32>,
    rx_mark: u32,
    tx_mark: u32,
    rx_per_sec: u32,
    tx_per_sec: u32,
}

impl RateMeter {
    pub const fn new() -> Self {
        Self {
            window_start_ms: None,
            rx_mark: 0,
            tx_mark: 0,
            rx_per_sec: 0,
            tx_per_sec: 0,
        }
    }

    /// Close the window if a second has passed
    ///
    /// Returns true when the rates were refreshed.
    pub fn update(&mut self, now_ms: u32, counters: &ByteCounters) -> bool {
        let rx = counters.rx_total();
        let tx = counters.tx_total();

        let Some(start) = self.window_start_ms else {
            self.restart(now_ms, rx, tx);
            return false;
        };

        let elapsed = now_ms.wrapping_sub(start);
        if elapsed < RATE_WINDOW_MS {
            return false;
        }

        self.rx_per_sec = per_second(rx.wrapping_sub(self.rx_mark), elapsed);
        self.tx_per_sec = per_second(tx.wrapping_sub(self.tx_mark), elapsed);
        self.restart(now_ms, rx, tx);
        true
    }

    /// Bytes received per second over the last window
    pub fn rx_per_sec(&self) -> u32 {
        self.rx_per_sec
    }

    /// Bytes sent per second over the last window
    pub fn tx_per_sec(&self) -> u32 {
        self.tx_per_sec
    }

    fn restart(&mut self, now_ms: u32, rx: u32, tx: u32) {
        self.window_start_ms = Some(now_ms);
        self.rx_mark = rx;
        self.tx_mark = tx;
    }
}

fn per_second(bytes: u32, elapsed_ms: u32) -> u32 {
    let rate = u64::from(bytes) * u64::from(RATE_WINDOW_MS) / u64::from(elapsed_ms);
    u32::try_from(rate).unwrap_or(u32::MAX)
}
