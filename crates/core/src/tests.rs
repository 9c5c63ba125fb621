// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod tests {
    use crate::consts::{ADVERTISING_DURATION_MS, DEEP_SLEEP_DURATION_MS, DEVICE_NAME};
    use crate::{
        AdvertisingMode, BdAddr, Platform, PowerCycle, Radio, RetainedMemory, SleepOutcome, Uptime,
    };

    #[derive(Default)]
    struct Cells([u32; 2]);

    impl RetainedMemory for Cells {
        fn read_cell(&self, index: usize) -> u32 {
            self.0[index]
        }

        fn write_cell(&mut self, index: usize, value: u32) {
            self.0[index] = value;
        }
    }

    struct TestPlatform {
        now_us: u64,
        button: bool,
        serial: String,
        delays: Vec<u32>,
        sleeps: Vec<u64>,
        sleep_result: SleepOutcome,
    }

    impl TestPlatform {
        fn new() -> Self {
            Self {
                now_us: 0,
                button: false,
                serial: String::new(),
                delays: Vec::new(),
                sleeps: Vec::new(),
                sleep_result: SleepOutcome::Entered,
            }
        }
    }

    impl Platform for TestPlatform {
        type Serial = String;

        fn uptime(&mut self) -> Uptime {
            Uptime::from_micros(self.now_us)
        }

        fn diagnostic_requested(&mut self) -> bool {
            self.button
        }

        fn serial(&mut self) -> &mut String {
            &mut self.serial
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delays.push(ms);
            self.now_us += ms as u64 * 1000;
        }

        fn deep_sleep(&mut self, duration_us: u64) -> SleepOutcome {
            self.sleeps.push(duration_us);
            if self.sleep_result == SleepOutcome::Entered {
                self.now_us += duration_us;
            }
            self.sleep_result
        }
    }

    #[derive(Default)]
    struct TestRadio {
        name: Option<String>,
        adv_data: Vec<u8>,
        mode: Option<AdvertisingMode>,
        enabled: bool,
        broadcasts: usize,
        broken: bool,
    }

    impl Radio for TestRadio {
        type Error = &'static str;

        fn init(&mut self, name: &str) -> Result<(), Self::Error> {
            if self.broken {
                return Err("no controller");
            }
            self.name = Some(name.to_string());
            Ok(())
        }

        fn address(&mut self) -> Result<BdAddr, Self::Error> {
            Ok(BdAddr([0xfb, 0x7f, 0x29, 0x6f, 0x46, 0x32]))
        }

        fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.adv_data = data.to_vec();
            Ok(())
        }

        fn set_scan_response_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            assert!(data.is_empty());
            Ok(())
        }

        fn set_advertising_mode(&mut self, mode: AdvertisingMode) -> Result<(), Self::Error> {
            self.mode = Some(mode);
            Ok(())
        }

        fn start_advertising(&mut self) -> Result<(), Self::Error> {
            if self.broken {
                return Err("no controller");
            }
            self.enabled = true;
            self.broadcasts += 1;
            Ok(())
        }

        fn stop_advertising(&mut self) -> Result<(), Self::Error> {
            self.enabled = false;
            Ok(())
        }
    }

    fn run_once(
        platform: TestPlatform,
        cells: Cells,
    ) -> (crate::CycleReport, TestPlatform, Cells, TestRadio) {
        let mut cycle = PowerCycle::new(platform, cells, TestRadio::default());
        let report = cycle.run();
        let (platform, cells, radio) = cycle.into_parts();
        (report, platform, cells, radio)
    }

    #[test]
    fn test_cold_start_cycle() {
        let (report, platform, cells, radio) = run_once(TestPlatform::new(), Cells::default());

        assert_eq!(report.previous.boot_count, 0);
        assert_eq!(report.persisted.boot_count, 1);
        assert_eq!(report.identity.major, 0);
        assert_eq!(report.identity.minor, 1);
        assert!(report.diagnostics);
        assert!(report.radio_ok);
        assert_eq!(report.sleep, SleepOutcome::Entered);
        assert_eq!(cells.0, [0, 1]);

        assert_eq!(radio.name.as_deref(), Some(DEVICE_NAME));
        assert_eq!(radio.mode, Some(AdvertisingMode::NonConnectable));
        assert_eq!(radio.broadcasts, 1);
        assert!(!radio.enabled);
        assert_eq!(&radio.adv_data[27..29], &[0x00, 0x01]);

        assert_eq!(platform.delays, vec![ADVERTISING_DURATION_MS]);
        assert_eq!(platform.sleeps, vec![DEEP_SLEEP_DURATION_MS as u64 * 1000]);
        assert!(platform.serial.contains("Since reset 1 wakeups"));
        assert!(platform.serial.contains("BLE device address is 32:46:6f:29:7f:fb"));
        assert!(platform.serial.contains("Advertising for 100 ms"));
        assert!(platform.serial.ends_with("Enter deep sleep for 500 ms\n\n"));
    }

    #[test]
    fn test_consecutive_cycles_count_every_wake() {
        let mut platform = TestPlatform::new();
        let mut cells = Cells::default();
        for expected in 1..=25u32 {
            let (report, p, c, _) = run_once(platform, cells);
            assert_eq!(report.persisted.boot_count, expected);
            platform = p;
            cells = c;
        }
        assert_eq!(cells.0[1], 25);
    }

    #[test]
    fn test_last_wake_timestamp_and_cycle_length() {
        let mut platform = TestPlatform::new();
        platform.now_us = 2_000_000;
        let cells = Cells([1_400, 3]);
        let (report, platform, cells, _) = run_once(platform, cells);

        assert_eq!(report.persisted.last_wake_ms, 2_000);
        assert_eq!(cells.0[0], 2_000);
        assert!(platform.serial.contains("Last reset 2s ago"));
        assert!(platform.serial.contains("Deep sleep cycle was 600 ms"));
    }

    #[test]
    fn test_counter_split_across_halves() {
        let (report, _, _, radio) = run_once(TestPlatform::new(), Cells([0, 65_535]));
        assert_eq!(report.persisted.boot_count, 65_536);
        assert_eq!(report.identity.major, 1);
        assert_eq!(report.identity.minor, 0);
        assert_eq!(&radio.adv_data[25..29], &[0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_counter_wraps_to_zero() {
        let (report, _, cells, _) = run_once(TestPlatform::new(), Cells([0, u32::MAX]));
        assert_eq!(report.persisted.boot_count, 0);
        assert_eq!(cells.0[1], 0);
        assert_eq!(report.identity.major, 0);
        assert_eq!(report.identity.minor, 0);
    }

    #[test]
    fn test_old_device_is_silent() {
        let (report, platform, _, _) = run_once(TestPlatform::new(), Cells([0, 10]));
        assert!(!report.diagnostics);
        assert!(platform.serial.is_empty());
        assert_eq!(report.persisted.boot_count, 11);
    }

    #[test]
    fn test_button_enables_diagnostics() {
        let mut platform = TestPlatform::new();
        platform.button = true;
        let (report, platform, _, _) = run_once(platform, Cells([0, 5_000]));
        assert!(report.diagnostics);
        assert!(platform.serial.contains("Since reset 5001 wakeups"));
    }

    #[test]
    fn test_threshold_uses_count_loaded_at_boot() {
        let (report, _, _, _) = run_once(TestPlatform::new(), Cells([0, 9]));
        assert!(report.diagnostics);
        assert_eq!(report.persisted.boot_count, 10);
    }

    #[test]
    fn test_failed_sleep_is_reported() {
        let mut platform = TestPlatform::new();
        platform.sleep_result = SleepOutcome::Returned;
        let (report, platform, _, _) = run_once(platform, Cells::default());
        assert_eq!(report.sleep, SleepOutcome::Returned);
        assert!(platform.serial.ends_with("Deep sleep failed!\n"));
    }

    #[test]
    fn test_failed_sleep_is_silent_without_diagnostics() {
        let mut platform = TestPlatform::new();
        platform.sleep_result = SleepOutcome::Returned;
        let (report, platform, _, _) = run_once(platform, Cells([0, 100]));
        assert_eq!(report.sleep, SleepOutcome::Returned);
        assert!(platform.serial.is_empty());
    }

    #[test]
    fn test_radio_failure_does_not_stop_the_cycle() {
        let mut cycle = PowerCycle::new(
            TestPlatform::new(),
            Cells::default(),
            TestRadio {
                broken: true,
                ..Default::default()
            },
        );
        let report = cycle.run();
        let (platform, cells, _) = cycle.into_parts();

        assert!(!report.radio_ok);
        assert_eq!(report.address, None);
        assert_eq!(cells.0[1], 1);
        assert_eq!(platform.sleeps.len(), 1);
        assert!(platform.serial.contains("Radio error: \"no controller\""));
    }
}
