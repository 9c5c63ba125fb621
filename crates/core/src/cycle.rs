// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! One wake of the device: boot, decide on diagnostics, advertise, sleep.
//!
//! This is not a resident state machine. Every wake re-executes [`PowerCycle::run`]
//! from the top; the only thing carried from one wake to the next is the
//! [`PersistentState`] in retained memory.

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

use crate::consts::{ADVERTISING_DURATION_MS, DEEP_SLEEP_DURATION_MS, DEVICE_NAME};
use crate::diagnostics::{should_report, Diagnostics};
use crate::payload::{self, BeaconIdentity};
use crate::platform::{Platform, SleepOutcome};
use crate::radio::{AdvertisingController, BdAddr, Radio};
use crate::state::{CounterStore, PersistentState, RetainedMemory};

/// What a single wake did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct CycleReport {
    /// State found in retained memory at boot.
    pub previous: PersistentState,
    /// State written back before advertising.
    pub persisted: PersistentState,
    pub diagnostics: bool,
    pub identity: BeaconIdentity,
    pub address: Option<BdAddr>,
    /// False if any radio operation reported an error.
    pub radio_ok: bool,
    pub sleep: SleepOutcome,
}

pub struct PowerCycle<P, M, R> {
    platform: P,
    store: CounterStore<M>,
    advertiser: AdvertisingController<R>,
}

impl<P, M, R> PowerCycle<P, M, R>
where
    P: Platform,
    M: RetainedMemory,
    R: Radio,
{
    pub fn new(platform: P, memory: M, radio: R) -> Self {
        Self {
            platform,
            store: CounterStore::new(memory),
            advertiser: AdvertisingController::new(radio),
        }
    }

    /// Runs the wake sequence.
    ///
    /// On hardware this only returns when the suspend request failed; the
    /// caller is then expected to idle.
    pub fn run(&mut self) -> CycleReport {
        // BOOT
        let uptime = self.platform.uptime();
        let now_ms = uptime.as_millis();
        let previous = self.store.load();

        // DIAGNOSTIC_DECISION
        let requested = self.platform.diagnostic_requested();
        let diag = Diagnostics::new(should_report(requested, previous.boot_count));

        // Persist before the radio is touched so the counter reflects this
        // wake even if advertising or sleep never completes.
        let persisted = previous.advance(now_ms);
        self.store.store(persisted);
        log_info!(
            boot_count = persisted.boot_count,
            now_ms,
            diagnostics = diag.enabled(),
            "wake"
        );

        diag.banner(self.platform.serial());
        diag.wake_count(self.platform.serial(), persisted.boot_count);
        diag.since_reset(self.platform.serial(), uptime.secs);
        diag.sleep_cycle(
            self.platform.serial(),
            previous.elapsed_since_last_wake(now_ms),
        );

        // ADVERTISE
        let mut radio_ok = true;
        let address = match self.bring_up_radio() {
            Ok(addr) => {
                diag.address(self.platform.serial(), addr);
                Some(addr)
            }
            Err(err) => {
                radio_ok = false;
                self.radio_failed(diag, &err);
                None
            }
        };

        let frame = payload::build(persisted.boot_count);
        let identity = BeaconIdentity::for_boot_count(persisted.boot_count);
        if let Err(err) = self.advertiser.start(frame) {
            radio_ok = false;
            self.radio_failed(diag, &err);
        }
        diag.advertising(self.platform.serial(), ADVERTISING_DURATION_MS);
        self.platform.delay_ms(ADVERTISING_DURATION_MS);
        if let Err(err) = self.advertiser.stop() {
            radio_ok = false;
            self.radio_failed(diag, &err);
        }

        // SLEEP
        diag.sleeping(self.platform.serial(), DEEP_SLEEP_DURATION_MS);
        let sleep = self
            .platform
            .deep_sleep(DEEP_SLEEP_DURATION_MS as u64 * 1000);
        if sleep == SleepOutcome::Returned {
            log_warn!("deep sleep request returned");
            diag.sleep_failed(self.platform.serial());
        }

        CycleReport {
            previous,
            persisted,
            diagnostics: diag.enabled(),
            identity,
            address,
            radio_ok,
            sleep,
        }
    }

    fn bring_up_radio(&mut self) -> Result<BdAddr, R::Error> {
        let radio = self.advertiser.radio();
        radio.init(DEVICE_NAME)?;
        radio.address()
    }

    fn radio_failed(&mut self, diag: Diagnostics, err: &R::Error) {
        log_warn!(error = ?err, "radio operation failed");
        diag.radio_error(self.platform.serial(), err);
    }

    pub fn into_parts(self) -> (P, M, R) {
        (
            self.platform,
            self.store.into_inner(),
            self.advertiser.into_inner(),
        )
    }
}
