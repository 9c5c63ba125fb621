// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde_json::json;

/// Pin wired to the diagnostic button. Active low.
pub const BUTTON_PIN: u8 = 0;

/// Input port with every pin pulled up.
#[derive(Debug)]
pub struct GpioPort {
    idr: u16, // input data register
}

impl Default for GpioPort {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort {
    pub fn new() -> Self {
        Self { idr: 0xFFFF }
    }

    pub fn set_input(&mut self, pin: u8, high: bool) {
        let mask = 1u16 << (pin & 0xF);
        if high {
            self.idr |= mask;
        } else {
            self.idr &= !mask;
        }
    }

    pub fn read_pin(&self, pin: u8) -> bool {
        self.idr & (1u16 << (pin & 0xF)) != 0
    }

    pub fn set_button(&mut self, pressed: bool) {
        self.set_input(BUTTON_PIN, !pressed);
    }

    pub fn button_pressed(&self) -> bool {
        !self.read_pin(BUTTON_PIN)
    }
}

impl crate::Peripheral for GpioPort {
    fn name(&self) -> &'static str {
        "gpio"
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "idr": self.idr, "button_pressed": self.button_pressed() })
    }
}
