// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! STM32F103 register map, only what the beacon touches.

pub const RCC: u32 = 0x4002_1000;
pub const RCC_APB2ENR: u32 = RCC + 0x18;
pub const RCC_APB1ENR: u32 = RCC + 0x1C;
pub const RCC_BDCR: u32 = RCC + 0x20;

pub const APB2ENR_IOPAEN: u32 = 1 << 2;
pub const APB2ENR_USART1EN: u32 = 1 << 14;
pub const APB1ENR_USART2EN: u32 = 1 << 17;
pub const APB1ENR_BKPEN: u32 = 1 << 27;
pub const APB1ENR_PWREN: u32 = 1 << 28;

pub const BDCR_LSEON: u32 = 1 << 0;
pub const BDCR_LSERDY: u32 = 1 << 1;
pub const BDCR_RTCSEL_LSE: u32 = 0b01 << 8;
pub const BDCR_RTCEN: u32 = 1 << 15;

pub const PWR_CR: u32 = 0x4000_7000;
pub const CR_PDDS: u32 = 1 << 1;
pub const CR_CWUF: u32 = 1 << 2;
pub const CR_DBP: u32 = 1 << 8;

pub const BKP: u32 = 0x4000_6C00;

pub const RTC: u32 = 0x4000_2800;
pub const RTC_CRL: u32 = RTC + 0x04;
pub const RTC_PRLH: u32 = RTC + 0x08;
pub const RTC_PRLL: u32 = RTC + 0x0C;
pub const RTC_CNTH: u32 = RTC + 0x18;
pub const RTC_CNTL: u32 = RTC + 0x1C;
pub const RTC_ALRH: u32 = RTC + 0x20;
pub const RTC_ALRL: u32 = RTC + 0x24;
pub const CRL_ALRF: u32 = 1 << 1;
pub const CRL_RSF: u32 = 1 << 3;
pub const CRL_CNF: u32 = 1 << 4;
pub const CRL_RTOFF: u32 = 1 << 5;

pub const GPIOA: u32 = 0x4001_0800;
pub const GPIO_CRL: u32 = 0x00;
pub const GPIO_CRH: u32 = 0x04;
pub const GPIO_IDR: u32 = 0x08;
pub const GPIO_ODR: u32 = 0x0C;

pub const USART1: u32 = 0x4001_3800;
pub const USART2: u32 = 0x4000_4400;
pub const USART_SR: u32 = 0x00;
pub const USART_DR: u32 = 0x04;
pub const USART_BRR: u32 = 0x08;
pub const USART_CR1: u32 = 0x0C;
pub const SR_ORE: u32 = 1 << 3;
pub const SR_RXNE: u32 = 1 << 5;
pub const SR_TXE: u32 = 1 << 7;
pub const CR1_RE: u32 = 1 << 2;
pub const CR1_TE: u32 = 1 << 3;
pub const CR1_UE: u32 = 1 << 13;

pub const SCB_SCR: u32 = 0xE000_ED10;
pub const SCR_SLEEPDEEP: u32 = 1 << 2;

#[inline(always)]
pub fn read(addr: u32) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
pub fn write(addr: u32, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

#[inline(always)]
pub fn modify(addr: u32, f: impl FnOnce(u32) -> u32) {
    write(addr, f(read(addr)));
}

pub fn wait_set(addr: u32, mask: u32) {
    while read(addr) & mask == 0 {}
}
