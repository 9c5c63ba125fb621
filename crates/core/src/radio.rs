// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Radio abstraction and the advertising controller built on top of it.

use core::fmt;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

use crate::payload::AdvertisementFrame;

/// Bluetooth device address, little-endian as carried over HCI.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

impl fmt::Debug for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BdAddr({})", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub enum AdvertisingMode {
    /// Broadcast only; scanners cannot connect.
    NonConnectable,
    Connectable,
}

/// Operations the beacon needs from the BLE stack.
pub trait Radio {
    type Error: fmt::Debug;

    /// Brings the stack up and sets the advertised device name.
    fn init(&mut self, name: &str) -> Result<(), Self::Error>;
    fn address(&mut self) -> Result<BdAddr, Self::Error>;
    fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn set_scan_response_data(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn set_advertising_mode(&mut self, mode: AdvertisingMode) -> Result<(), Self::Error>;
    fn start_advertising(&mut self) -> Result<(), Self::Error>;
    fn stop_advertising(&mut self) -> Result<(), Self::Error>;
}

/// Owns the frame while it is on air.
#[derive(Debug)]
pub struct AdvertisingController<R> {
    radio: R,
    on_air: Option<AdvertisementFrame>,
}

impl<R: Radio> AdvertisingController<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            on_air: None,
        }
    }

    pub fn radio(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Frame currently being broadcast, if any.
    pub fn on_air(&self) -> Option<&AdvertisementFrame> {
        self.on_air.as_ref()
    }

    /// Loads `frame` with an empty scan response in non-connectable mode and
    /// starts broadcasting.
    pub fn start(&mut self, frame: AdvertisementFrame) -> Result<(), R::Error> {
        self.radio.set_advertising_data(frame.as_bytes())?;
        self.radio.set_scan_response_data(&[])?;
        self.radio
            .set_advertising_mode(AdvertisingMode::NonConnectable)?;
        self.radio.start_advertising()?;
        log_debug!(len = frame.len(), "advertising started");
        self.on_air = Some(frame);
        Ok(())
    }

    /// Stops broadcasting and drops the frame.
    pub fn stop(&mut self) -> Result<(), R::Error> {
        self.on_air = None;
        self.radio.stop_advertising()
    }

    pub fn into_inner(self) -> R {
        self.radio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::build;

    #[derive(Debug, PartialEq)]
    enum Call {
        AdvData(usize),
        ScanRsp(usize),
        Mode(AdvertisingMode),
        Start,
        Stop,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        fail_start: bool,
    }

    impl Radio for Recorder {
        type Error = &'static str;

        fn init(&mut self, _name: &str) -> Result<(), Self::Error> {
            Ok(())
        }

        fn address(&mut self) -> Result<BdAddr, Self::Error> {
            Ok(BdAddr::default())
        }

        fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.calls.push(Call::AdvData(data.len()));
            Ok(())
        }

        fn set_scan_response_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.calls.push(Call::ScanRsp(data.len()));
            Ok(())
        }

        fn set_advertising_mode(&mut self, mode: AdvertisingMode) -> Result<(), Self::Error> {
            self.calls.push(Call::Mode(mode));
            Ok(())
        }

        fn start_advertising(&mut self) -> Result<(), Self::Error> {
            if self.fail_start {
                return Err("controller busy");
            }
            self.calls.push(Call::Start);
            Ok(())
        }

        fn stop_advertising(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::Stop);
            Ok(())
        }
    }

    #[test]
    fn test_start_stop_sequence() {
        let mut adv = AdvertisingController::new(Recorder::default());
        adv.start(build(1)).unwrap();
        assert!(adv.on_air().is_some());
        adv.stop().unwrap();
        assert!(adv.on_air().is_none());

        assert_eq!(
            adv.into_inner().calls,
            vec![
                Call::AdvData(30),
                Call::ScanRsp(0),
                Call::Mode(AdvertisingMode::NonConnectable),
                Call::Start,
                Call::Stop,
            ]
        );
    }

    #[test]
    fn test_failed_start_keeps_nothing_on_air() {
        let mut adv = AdvertisingController::new(Recorder {
            fail_start: true,
            ..Default::default()
        });
        assert_eq!(adv.start(build(1)), Err("controller busy"));
        assert!(adv.on_air().is_none());
    }

    #[test]
    fn test_address_display_is_msb_first() {
        let addr = BdAddr([0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(addr.to_string(), "11:22:33:44:55:66");
    }
}
