// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use napbeacon_core::Uptime;

/// Microseconds since the last cold power-on.
///
/// Backed by the low-power timer, so it keeps counting through suspend.
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_us: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Uptime {
        Uptime::from_micros(self.now_us())
    }

    pub fn advance(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }

    /// Cold power loss restarts the timer from zero.
    pub fn power_off(&self) {
        self.now_us.store(0, Ordering::SeqCst);
    }
}

impl crate::Peripheral for SimClock {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn power_off(&mut self) {
        SimClock::power_off(self);
    }

    fn snapshot(&self) -> serde_json::Value {
        let up = self.uptime();
        serde_json::json!({ "now_us": self.now_us(), "secs": up.secs, "micros": up.micros })
    }
}
