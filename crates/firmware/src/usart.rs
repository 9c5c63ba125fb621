// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt;

use napbeacon_core::hci::HciTransport;

use crate::regs::*;

/// 115200 baud from the 8 MHz HSI.
const BRR_115200: u32 = 0x45;

/// Polls before a receive gives up, roughly 100 ms at 8 MHz.
const RX_TIMEOUT_SPINS: u32 = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    Timeout,
    Overrun,
}

/// Polled USART, 8N1.
pub struct Usart {
    base: u32,
}

impl Usart {
    /// USART1 on PA9: diagnostics console.
    pub fn usart1() -> Self {
        modify(RCC_APB2ENR, |v| v | APB2ENR_IOPAEN | APB2ENR_USART1EN);
        // PA9 alternate function push-pull, 50 MHz
        modify(GPIOA + GPIO_CRH, |v| (v & !(0xF << 4)) | (0b1011 << 4));
        Self::enable(USART1)
    }

    /// USART2 on PA2/PA3: HCI link to the BLE controller.
    pub fn usart2() -> Self {
        modify(RCC_APB2ENR, |v| v | APB2ENR_IOPAEN);
        modify(RCC_APB1ENR, |v| v | APB1ENR_USART2EN);
        // PA2 alternate function push-pull, PA3 floating input
        modify(GPIOA + GPIO_CRL, |v| {
            (v & !(0xFF << 8)) | (0b1011 << 8) | (0b0100 << 12)
        });
        Self::enable(USART2)
    }

    fn enable(base: u32) -> Self {
        write(base + USART_BRR, BRR_115200);
        write(base + USART_CR1, CR1_UE | CR1_TE | CR1_RE);
        Self { base }
    }

    pub fn write_byte(&mut self, byte: u8) {
        wait_set(self.base + USART_SR, SR_TXE);
        write(self.base + USART_DR, byte as u32);
    }

    pub fn read_byte(&mut self) -> Result<u8, UartError> {
        for _ in 0..RX_TIMEOUT_SPINS {
            let sr = read(self.base + USART_SR);
            if sr & SR_ORE != 0 {
                // Reading DR after SR clears the flag.
                let _ = read(self.base + USART_DR);
                return Err(UartError::Overrun);
            }
            if sr & SR_RXNE != 0 {
                return Ok(read(self.base + USART_DR) as u8);
            }
        }
        Err(UartError::Timeout)
    }
}

impl fmt::Write for Usart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            if b == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(b);
        }
        Ok(())
    }
}

impl HciTransport for Usart {
    type Error = UartError;

    fn write(&mut self, bytes: &[u8]) -> Result<(), UartError> {
        for b in bytes {
            self.write_byte(*b);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), UartError> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }
}
