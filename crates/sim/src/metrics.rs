// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::SimulationObserver;
use napbeacon_core::{CycleReport, SleepOutcome};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct CycleMetrics {
    cycle_count: AtomicU64,
    diagnostic_cycles: AtomicU64,
    radio_failures: AtomicU64,
    sleep_failures: AtomicU64,
    power_offs: AtomicU64,
    start_time: Instant,
}

impl Default for CycleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleMetrics {
    pub fn new() -> Self {
        Self {
            cycle_count: AtomicU64::new(0),
            diagnostic_cycles: AtomicU64::new(0),
            radio_failures: AtomicU64::new(0),
            sleep_failures: AtomicU64::new(0),
            power_offs: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn get_cycles(&self) -> u64 {
        self.cycle_count.load(Ordering::SeqCst)
    }

    pub fn get_diagnostic_cycles(&self) -> u64 {
        self.diagnostic_cycles.load(Ordering::SeqCst)
    }

    pub fn get_radio_failures(&self) -> u64 {
        self.radio_failures.load(Ordering::SeqCst)
    }

    pub fn get_sleep_failures(&self) -> u64 {
        self.sleep_failures.load(Ordering::SeqCst)
    }

    pub fn get_power_offs(&self) -> u64 {
        self.power_offs.load(Ordering::SeqCst)
    }

    /// Simulated wakes per host second.
    pub fn get_cycles_per_sec(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_cycles() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cycles: self.get_cycles(),
            diagnostic_cycles: self.get_diagnostic_cycles(),
            radio_failures: self.get_radio_failures(),
            sleep_failures: self.get_sleep_failures(),
            power_offs: self.get_power_offs(),
            cycles_per_sec: self.get_cycles_per_sec(),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub cycles: u64,
    pub diagnostic_cycles: u64,
    pub radio_failures: u64,
    pub sleep_failures: u64,
    pub power_offs: u64,
    pub cycles_per_sec: f64,
}

impl SimulationObserver for CycleMetrics {
    fn on_cycle_end(&self, _cycle: u32, report: &CycleReport) {
        self.cycle_count.fetch_add(1, Ordering::SeqCst);
        if report.diagnostics {
            self.diagnostic_cycles.fetch_add(1, Ordering::SeqCst);
        }
        if !report.radio_ok {
            self.radio_failures.fetch_add(1, Ordering::SeqCst);
        }
        if report.sleep == SleepOutcome::Returned {
            self.sleep_failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_power_off(&self) {
        self.power_offs.fetch_add(1, Ordering::SeqCst);
    }
}
