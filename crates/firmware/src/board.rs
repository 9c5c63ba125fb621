// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use napbeacon_core::{Platform, SleepOutcome, Uptime};

use crate::regs::*;
use crate::usart::Usart;

/// RTC tick rate: LSE 32768 Hz / (PRL + 1).
const RTC_HZ: u32 = 1024;
const RTC_PRESCALER: u32 = 32_768 / RTC_HZ - 1;

const SYSCLK_KHZ: u32 = 8_000;

/// Blue-pill style board: HSI clock, RTC on LSE, PA0 button to ground.
pub struct Board {
    serial: Usart,
}

impl Board {
    pub fn init() -> Self {
        modify(RCC_APB1ENR, |v| v | APB1ENR_PWREN | APB1ENR_BKPEN);
        modify(PWR_CR, |v| v | CR_DBP);
        rtc_init();

        // PA0 input with pull-up
        modify(RCC_APB2ENR, |v| v | APB2ENR_IOPAEN);
        modify(GPIOA + GPIO_CRL, |v| (v & !0xF) | 0b1000);
        modify(GPIOA + GPIO_ODR, |v| v | 1);

        Self {
            serial: Usart::usart1(),
        }
    }
}

/// Starts the RTC once per backup domain lifetime. After a Standby wake it
/// is already running and only the register sync is needed.
fn rtc_init() {
    if read(RCC_BDCR) & BDCR_RTCEN == 0 {
        modify(RCC_BDCR, |v| v | BDCR_LSEON);
        wait_set(RCC_BDCR, BDCR_LSERDY);
        modify(RCC_BDCR, |v| v | BDCR_RTCSEL_LSE | BDCR_RTCEN);

        rtc_configure(|| {
            write(RTC_PRLH, 0);
            write(RTC_PRLL, RTC_PRESCALER);
            write(RTC_CNTH, 0);
            write(RTC_CNTL, 0);
        });
    }

    modify(RTC_CRL, |v| v & !CRL_RSF);
    wait_set(RTC_CRL, CRL_RSF);
}

fn rtc_configure(f: impl FnOnce()) {
    wait_set(RTC_CRL, CRL_RTOFF);
    modify(RTC_CRL, |v| v | CRL_CNF);
    f();
    modify(RTC_CRL, |v| v & !CRL_CNF);
    wait_set(RTC_CRL, CRL_RTOFF);
}

fn rtc_counter() -> u32 {
    loop {
        let hi = read(RTC_CNTH) & 0xFFFF;
        let lo = read(RTC_CNTL) & 0xFFFF;
        if read(RTC_CNTH) & 0xFFFF == hi {
            return (hi << 16) | lo;
        }
    }
}

impl Platform for Board {
    type Serial = Usart;

    fn uptime(&mut self) -> Uptime {
        let ticks = rtc_counter();
        Uptime {
            secs: ticks / RTC_HZ,
            micros: ((ticks % RTC_HZ) as u64 * 1_000_000 / RTC_HZ as u64) as u32,
        }
    }

    fn diagnostic_requested(&mut self) -> bool {
        read(GPIOA + GPIO_IDR) & 1 == 0
    }

    fn serial(&mut self) -> &mut Usart {
        &mut self.serial
    }

    fn delay_ms(&mut self, ms: u32) {
        cortex_m::asm::delay(SYSCLK_KHZ.saturating_mul(ms));
    }

    fn deep_sleep(&mut self, duration_us: u64) -> SleepOutcome {
        let ticks = (duration_us * RTC_HZ as u64 / 1_000_000).max(1) as u32;
        let alarm = rtc_counter().wrapping_add(ticks);
        rtc_configure(|| {
            write(RTC_ALRH, alarm >> 16);
            write(RTC_ALRL, alarm & 0xFFFF);
        });
        modify(RTC_CRL, |v| v & !CRL_ALRF);

        // Standby: the next wake comes back through reset.
        modify(PWR_CR, |v| v | CR_CWUF | CR_PDDS);
        modify(SCB_SCR, |v| v | SCR_SLEEPDEEP);
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();

        modify(SCB_SCR, |v| v & !SCR_SLEEPDEEP);
        SleepOutcome::Returned
    }
}
