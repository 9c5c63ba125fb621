// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::metrics::CycleMetrics;
    use crate::{run_scenario, Machine, SimulationError};
    use napbeacon_config::{Scenario, StopReason};
    use napbeacon_core::SleepOutcome;
    use std::sync::Arc;

    #[test]
    fn test_cold_start_ten_cycles() {
        let mut machine = Machine::new(false);
        for _ in 0..10 {
            let report = machine.step().unwrap();
            assert_eq!(report.sleep, SleepOutcome::Entered);
            assert!(report.radio_ok);
        }

        assert_eq!(machine.rtc.state().boot_count, 10);
        assert_eq!(machine.cycles(), 10);

        let txs = machine.controller.transmissions();
        assert_eq!(txs.len(), 10);
        for (i, tx) in txs.iter().enumerate() {
            let id = tx.identity().unwrap();
            assert_eq!((id.major, id.minor), (0, i as u16 + 1));
            assert_eq!(tx.duration_us(), Some(100_000));
            assert!(!tx.connectable());
        }

        let serial = machine.uart.output();
        assert_eq!(serial.matches("Start NapBeacon iBeacon").count(), 10);
        assert!(serial.contains("Since reset 1 wakeups"));
        assert!(serial.contains("Since reset 10 wakeups"));
        assert!(serial.contains("BLE device address is c0:ff:ee:00:00:01"));
    }

    #[test]
    fn test_sleep_interval_reported() {
        let mut machine = Machine::new(false);
        machine.step().unwrap();
        machine.step().unwrap();
        // 20 ms boot, 100 ms advertising, 500 ms asleep, 20 ms boot
        let serial = machine.uart.output();
        assert!(serial.contains("Deep sleep cycle was 20 ms"));
        assert!(serial.contains("Deep sleep cycle was 620 ms"));
        assert_eq!(machine.rtc.state().last_wake_ms, 640);
    }

    #[test]
    fn test_power_off_resets_counter_and_clock() {
        let mut machine = Machine::new(false);
        for _ in 0..3 {
            machine.step().unwrap();
        }
        machine.power_off();
        assert_eq!(machine.clock.now_us(), 0);
        assert_eq!(machine.rtc.state().boot_count, 0);

        let report = machine.step().unwrap();
        assert_eq!(report.previous.boot_count, 0);
        assert_eq!(report.persisted.boot_count, 1);
        // history survives power loss
        assert_eq!(machine.controller.transmissions().len(), 4);
    }

    #[test]
    fn test_power_off_while_advertising_closes_transmission() {
        use napbeacon_core::hci::HciRadio;
        use napbeacon_core::Radio;

        let mut machine = Machine::new(false);
        machine.clock.advance(5_000);
        HciRadio::new(&mut machine.controller)
            .start_advertising()
            .unwrap();
        machine.power_off();

        assert!(!machine.controller.is_advertising());
        let tx = machine.controller.transmissions().last().unwrap();
        assert_eq!(tx.start_us, 5_000);
        assert_eq!(tx.end_us, Some(5_000));
        assert_eq!(tx.duration_us(), Some(0));
        assert_eq!(machine.clock.now_us(), 0);
    }

    #[test]
    fn test_sleep_failure_halts_machine() {
        let mut machine = Machine::new(false);
        machine.power.fail_next_suspend();
        let report = machine.step().unwrap();
        assert_eq!(report.sleep, SleepOutcome::Returned);
        assert!(machine.uart.output().contains("Deep sleep failed!"));
        assert!(machine.is_halted());

        assert_eq!(machine.step(), Err(SimulationError::Halted(0)));

        machine.power_off();
        assert!(!machine.is_halted());
        assert_eq!(machine.step().unwrap().sleep, SleepOutcome::Entered);
    }

    #[test]
    fn test_scenario_counter_crosses_minor_boundary() {
        let scenario = Scenario::from_yaml(
            r#"
schema_version: "1.0"
device:
  retained:
    boot_count: 65535
limits:
  cycles: 2
"#,
        )
        .unwrap();
        let (machine, outcome) = run_scenario(&scenario, false).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Cycles);
        assert_eq!(outcome.cycles_run, 2);
        assert_eq!(
            (outcome.reports[0].identity.major, outcome.reports[0].identity.minor),
            (1, 0)
        );
        let last = outcome.last_report().unwrap();
        assert_eq!((last.identity.major, last.identity.minor), (1, 1));
        assert!(!last.diagnostics);
        assert!(machine.uart.output().is_empty());
    }

    #[test]
    fn test_scenario_button_and_sleep_failure() {
        let scenario = Scenario::from_yaml(
            r#"
schema_version: "1.0"
device:
  retained:
    boot_count: 20
  button:
    pressed_cycles: [1]
  sleep_fails_at: 3
limits:
  cycles: 6
"#,
        )
        .unwrap();
        let (machine, outcome) = run_scenario(&scenario, false).unwrap();
        assert_eq!(outcome.stop_reason, StopReason::SleepFailed);
        assert_eq!(outcome.cycles_run, 4);

        let diag: Vec<bool> = outcome.reports.iter().map(|r| r.diagnostics).collect();
        assert_eq!(diag, vec![false, true, false, false]);
        assert!(machine.uart.output().contains("Since reset 22 wakeups"));
        // diagnostics were off when the suspend failed
        assert!(!machine.uart.output().contains("Deep sleep failed!"));
        assert!(machine.is_halted());
    }

    #[test]
    fn test_scenario_power_loss_mid_run() {
        let scenario = Scenario::from_yaml(
            r#"
schema_version: "1.0"
limits:
  cycles: 5
device:
  power_off_before: [3]
"#,
        )
        .unwrap();
        let (machine, outcome) = run_scenario(&scenario, false).unwrap();
        let counts: Vec<u32> = outcome
            .reports
            .iter()
            .map(|r| r.persisted.boot_count)
            .collect();
        assert_eq!(counts, vec![1, 2, 3, 1, 2]);
        assert_eq!(machine.rtc.state().boot_count, 2);
    }

    #[test]
    fn test_metrics_observer() {
        let metrics = Arc::new(CycleMetrics::new());
        let mut machine = Machine::new(false);
        machine.observers.push(metrics.clone());
        machine.rtc.seed(napbeacon_core::PersistentState {
            last_wake_ms: 0,
            boot_count: 8,
        });

        for _ in 0..4 {
            machine.step().unwrap();
        }
        machine.power_off();

        assert_eq!(metrics.get_cycles(), 4);
        // boot counts 8 and 9 are below the threshold
        assert_eq!(metrics.get_diagnostic_cycles(), 2);
        assert_eq!(metrics.get_radio_failures(), 0);
        assert_eq!(metrics.get_sleep_failures(), 0);
        assert_eq!(metrics.get_power_offs(), 1);
    }

    #[test]
    fn test_metrics_summary_after_scenario() {
        let scenario = Scenario::from_yaml(
            r#"
schema_version: "1.0"
limits:
  cycles: 6
device:
  power_off_before: [3]
"#,
        )
        .unwrap();
        let metrics = Arc::new(CycleMetrics::new());
        let mut machine = Machine::from_setup(&scenario.device, false);
        machine.observers.push(metrics.clone());
        machine.run_scenario(&scenario).unwrap();

        let summary = metrics.summary();
        assert_eq!(summary.cycles, 6);
        assert_eq!(summary.power_offs, 1);
        assert_eq!(summary.sleep_failures, 0);
        assert!(summary.cycles_per_sec > 0.0);
    }

    #[test]
    fn test_radio_failure_does_not_stop_cycle() {
        let mut machine = Machine::new(false);
        machine.controller.force_status(Some(0x0C));
        let report = machine.step().unwrap();
        assert!(!report.radio_ok);
        assert_eq!(report.address, None);
        assert_eq!(report.sleep, SleepOutcome::Entered);
        assert_eq!(report.persisted.boot_count, 1);
        assert!(machine.uart.output().contains("Radio error: CommandFailed"));
        assert!(machine.controller.transmissions().is_empty());
    }

    #[test]
    fn test_snapshot_lists_peripherals() {
        let mut machine = Machine::new(false);
        machine.step().unwrap();
        let snap = machine.snapshot();
        assert_eq!(snap.cycles, 1);
        assert_eq!(snap.retained.boot_count, 1);
        assert_eq!(snap.transmissions.len(), 1);
        for name in ["clock", "rtc_ram", "gpio", "uart", "hci", "pmu"] {
            assert!(snap.peripherals.contains_key(name), "missing {name}");
        }
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["peripherals"]["hci"]["name"], "NapBeacon");
    }
}
