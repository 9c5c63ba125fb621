// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod metrics;
pub mod peripherals;
pub mod snapshot;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use napbeacon_config::{DeviceSetup, Scenario, StopReason};
use napbeacon_core::hci::HciRadio;
use napbeacon_core::{CycleReport, Platform, PowerCycle, SleepOutcome, Uptime};
use serde::Serialize;

use peripherals::clock::SimClock;
use peripherals::gpio::GpioPort;
use peripherals::hci::VirtualController;
use peripherals::power::PowerUnit;
use peripherals::rtc::RetainedRam;
use peripherals::uart::Uart;

mod tests;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Machine halted: suspend failed in cycle {0}")]
    Halted(u32),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_simulation_start(&self) {}
    fn on_simulation_stop(&self) {}
    fn on_cycle_start(&self, _cycle: u32) {}
    fn on_cycle_end(&self, _cycle: u32, _report: &CycleReport) {}
    fn on_power_off(&self) {}
}

/// Trait representing a simulated board peripheral
pub trait Peripheral: std::fmt::Debug {
    fn name(&self) -> &'static str;
    /// Cold power loss. Volatile state goes back to its reset value.
    fn power_off(&mut self) {}
    fn snapshot(&self) -> serde_json::Value;
}

/// Board services seen by the firmware during one wake.
struct SimPlatform<'a> {
    clock: &'a SimClock,
    gpio: &'a GpioPort,
    uart: &'a mut Uart,
    power: &'a mut PowerUnit,
}

impl Platform for SimPlatform<'_> {
    type Serial = Uart;

    fn uptime(&mut self) -> Uptime {
        self.clock.uptime()
    }

    fn diagnostic_requested(&mut self) -> bool {
        self.gpio.button_pressed()
    }

    fn serial(&mut self) -> &mut Uart {
        self.uart
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance(ms as u64 * 1000);
    }

    fn deep_sleep(&mut self, duration_us: u64) -> SleepOutcome {
        self.power.suspend(self.clock, duration_us)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub stop_reason: StopReason,
    pub cycles_run: u32,
    pub reports: Vec<CycleReport>,
}

impl RunOutcome {
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.reports.last()
    }
}

pub struct Machine {
    pub clock: SimClock,
    pub rtc: RetainedRam,
    pub gpio: GpioPort,
    pub uart: Uart,
    pub controller: VirtualController,
    pub power: PowerUnit,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    boot_time_us: u64,
    cycles: u32,
    halted: bool,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Machine {
    /// A freshly powered board. `echo` mirrors the serial console to stdout.
    pub fn new(echo: bool) -> Self {
        let clock = SimClock::new();
        Self {
            controller: VirtualController::new(clock.clone()),
            clock,
            rtc: RetainedRam::new(),
            gpio: GpioPort::new(),
            uart: Uart::new(echo),
            power: PowerUnit::new(),
            observers: Vec::new(),
            boot_time_us: DeviceSetup::default().boot_time_ms * 1000,
            cycles: 0,
            halted: false,
        }
    }

    /// Builds a board wired as `setup` describes, with retained memory seeded.
    pub fn from_setup(setup: &DeviceSetup, echo: bool) -> Self {
        let mut machine = Self::new(echo);
        machine.set_boot_time_ms(setup.boot_time_ms);
        if let Some(seed) = &setup.retained {
            machine.rtc.seed(napbeacon_core::PersistentState {
                last_wake_ms: seed.last_wake_ms,
                boot_count: seed.boot_count,
            });
        }
        machine
    }

    pub fn set_boot_time_ms(&mut self, ms: u64) {
        self.boot_time_us = ms * 1000;
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn peripherals(&self) -> [&dyn Peripheral; 6] {
        [
            &self.clock,
            &self.rtc,
            &self.gpio,
            &self.uart,
            &self.controller,
            &self.power,
        ]
    }

    /// Runs one wake, from reset to the suspend request.
    ///
    /// A suspend that returns leaves the board idling; further steps fail
    /// until the next power-off.
    pub fn step(&mut self) -> SimResult<CycleReport> {
        if self.halted {
            return Err(SimulationError::Halted(self.cycles.saturating_sub(1)));
        }
        let cycle = self.cycles;
        for observer in &self.observers {
            observer.on_cycle_start(cycle);
        }

        self.clock.advance(self.boot_time_us);
        let platform = SimPlatform {
            clock: &self.clock,
            gpio: &self.gpio,
            uart: &mut self.uart,
            power: &mut self.power,
        };
        let report =
            PowerCycle::new(platform, &mut self.rtc, HciRadio::new(&mut self.controller)).run();

        self.cycles += 1;
        if let Some(tx) = self.controller.transmissions().last() {
            tracing::debug!(
                cycle,
                start_us = tx.start_us,
                major = report.identity.major,
                minor = report.identity.minor,
                "frame on air"
            );
        }
        if report.sleep == SleepOutcome::Returned {
            tracing::warn!(cycle, "suspend returned, board idles");
            self.halted = true;
        }

        for observer in &self.observers {
            observer.on_cycle_end(cycle, &report);
        }
        Ok(report)
    }

    /// Cold power loss: clock, retained memory and radio state are lost.
    pub fn power_off(&mut self) {
        tracing::info!(cycle = self.cycles, "power off");
        // The radio closes its open transmission against the old clock.
        self.controller.power_off();
        self.clock.power_off();
        self.rtc.power_off();
        self.gpio.power_off();
        self.uart.power_off();
        self.power.power_off();
        self.halted = false;
        for observer in &self.observers {
            observer.on_power_off();
        }
    }

    /// Drives the board through the scenario's schedule.
    pub fn run_scenario(&mut self, scenario: &Scenario) -> SimResult<RunOutcome> {
        let started = Instant::now();
        let setup = &scenario.device;
        let mut reports = Vec::with_capacity(scenario.limits.cycles as usize);
        let mut stop_reason = StopReason::Cycles;

        for observer in &self.observers {
            observer.on_simulation_start();
        }

        for cycle in 0..scenario.limits.cycles {
            if let Some(limit) = scenario.limits.wall_time_ms {
                if started.elapsed().as_millis() as u64 >= limit {
                    stop_reason = StopReason::WallTime;
                    break;
                }
            }
            if setup.power_off_before.contains(&cycle) {
                self.power_off();
            }
            self.gpio.set_button(setup.button.is_pressed(cycle));
            if setup.sleep_fails_at == Some(cycle) {
                self.power.fail_next_suspend();
            }

            let report = self.step()?;
            reports.push(report);
            if report.sleep == SleepOutcome::Returned {
                stop_reason = StopReason::SleepFailed;
                break;
            }
        }

        for observer in &self.observers {
            observer.on_simulation_stop();
        }

        Ok(RunOutcome {
            stop_reason,
            cycles_run: reports.len() as u32,
            reports,
        })
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        let peripherals: HashMap<String, serde_json::Value> = self
            .peripherals()
            .iter()
            .map(|p| (p.name().to_string(), p.snapshot()))
            .collect();
        snapshot::MachineSnapshot {
            cycles: self.cycles,
            halted: self.halted,
            now_us: self.clock.now_us(),
            retained: self.rtc.state(),
            transmissions: self.controller.transmissions().to_vec(),
            peripherals,
        }
    }
}

/// Runs a scenario on a board built from its device setup.
pub fn run_scenario(scenario: &Scenario, echo: bool) -> SimResult<(Machine, RunOutcome)> {
    let mut machine = Machine::from_setup(&scenario.device, echo);
    let outcome = machine.run_scenario(scenario)?;
    Ok((machine, outcome))
}
