// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on simulated wakes per scenario.
pub const MAX_CYCLES: u32 = 100_000;

pub const SCHEMA_VERSION: &str = "1.0";

fn default_boot_time_ms() -> u64 {
    20
}

/// Retained memory contents in place at the first simulated wake.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetainedSeed {
    #[serde(default)]
    pub boot_count: u32,
    #[serde(default)]
    pub last_wake_ms: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ButtonSchedule {
    #[serde(default)]
    pub always_pressed: bool,
    /// Cycle indices (0-based) during which the button is held.
    #[serde(default)]
    pub pressed_cycles: Vec<u32>,
}

impl ButtonSchedule {
    pub fn is_pressed(&self, cycle: u32) -> bool {
        self.always_pressed || self.pressed_cycles.contains(&cycle)
    }
}

/// The simulated world around the device.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DeviceSetup {
    /// Reset-to-main latency added to the clock on every wake.
    #[serde(default = "default_boot_time_ms")]
    pub boot_time_ms: u64,
    #[serde(default)]
    pub retained: Option<RetainedSeed>,
    #[serde(default)]
    pub button: ButtonSchedule,
    /// Cold power loss happens right before these cycle indices.
    #[serde(default)]
    pub power_off_before: Vec<u32>,
    /// The suspend request returns instead of sleeping in this cycle.
    #[serde(default)]
    pub sleep_fails_at: Option<u32>,
}

impl Default for DeviceSetup {
    fn default() -> Self {
        Self {
            boot_time_ms: default_boot_time_ms(),
            retained: None,
            button: ButtonSchedule::default(),
            power_off_before: Vec::new(),
            sleep_fails_at: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    pub cycles: u32,
    #[serde(default)]
    pub wall_time_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All requested cycles ran.
    Cycles,
    /// A suspend request returned and the device went idle.
    SleepFailed,
    WallTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SerialContainsAssertion {
    pub serial_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FinalBootCountAssertion {
    pub final_boot_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FrameExpectation {
    pub major: u16,
    pub minor: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LastFrameAssertion {
    pub last_frame: FrameExpectation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Assertion {
    SerialContains(SerialContainsAssertion),
    FinalBootCount(FinalBootCountAssertion),
    LastFrame(LastFrameAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub schema_version: String,
    #[serde(default)]
    pub device: DeviceSetup,
    pub limits: Limits,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl Scenario {
    /// A scenario that simply runs `cycles` wakes from a cold power-on.
    pub fn cold_start(cycles: u32) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            device: DeviceSetup::default(),
            limits: Limits {
                cycles,
                wall_time_ms: None,
            },
            assertions: Vec::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open scenario at {:?}", path.as_ref()))?;
        let scenario: Self =
            serde_yaml::from_reader(f).context("Failed to parse Scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(yaml).context("Failed to parse Scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.limits.cycles == 0 {
            anyhow::bail!("Limit 'cycles' must be greater than zero");
        }

        if self.limits.cycles > MAX_CYCLES {
            anyhow::bail!(
                "Limit 'cycles' ({}) exceeds the maximum of {}",
                self.limits.cycles,
                MAX_CYCLES
            );
        }

        let cycles = self.limits.cycles;
        if let Some(bad) = self.device.power_off_before.iter().find(|c| **c >= cycles) {
            anyhow::bail!("'power_off_before' index {} is outside 0..{}", bad, cycles);
        }
        if let Some(bad) = self.device.button.pressed_cycles.iter().find(|c| **c >= cycles) {
            anyhow::bail!("'pressed_cycles' index {} is outside 0..{}", bad, cycles);
        }
        if let Some(at) = self.device.sleep_fails_at {
            if at >= cycles {
                anyhow::bail!("'sleep_fails_at' index {} is outside 0..{}", at, cycles);
            }
        }

        Ok(())
    }
}
