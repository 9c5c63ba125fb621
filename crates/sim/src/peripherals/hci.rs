// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::VecDeque;

use bt_hci::cmd::controller_baseband::Reset;
use bt_hci::cmd::info::ReadBdAddr;
use bt_hci::cmd::le::{LeSetAdvData, LeSetAdvEnable, LeSetAdvParams, LeSetScanResponseData};
use bt_hci::cmd::Cmd;
use bt_hci::param::AdvKind;
use bt_hci::FromHciBytes;
use napbeacon_core::hci::{EVENT_COMMAND_COMPLETE, PACKET_COMMAND, PACKET_EVENT, WRITE_LOCAL_NAME};
use napbeacon_core::payload::MAX_ADV_DATA_LEN;
use napbeacon_core::{BdAddr, BeaconIdentity};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::clock::SimClock;

pub const STATUS_SUCCESS: u8 = 0x00;
pub const STATUS_UNKNOWN_COMMAND: u8 = 0x01;
pub const STATUS_COMMAND_DISALLOWED: u8 = 0x0C;
pub const STATUS_INVALID_PARAMETERS: u8 = 0x12;

/// Address the controller reports unless told otherwise.
pub const DEFAULT_ADDRESS: BdAddr = BdAddr([0x01, 0x00, 0x00, 0xEE, 0xFF, 0xC0]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("HCI link idle: {wanted} bytes requested, {available} available")]
    Idle { wanted: usize, available: usize },
}

/// One advertising interval as seen on air.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmission {
    pub start_us: u64,
    pub end_us: Option<u64>,
    pub adv_type: u8,
    pub data: Vec<u8>,
    pub scan_response: Vec<u8>,
}

impl Transmission {
    pub fn identity(&self) -> Option<BeaconIdentity> {
        BeaconIdentity::decode(&self.data)
    }

    /// `None` while on air, or when the clock was reset underneath it.
    pub fn duration_us(&self) -> Option<u64> {
        self.end_us.and_then(|end| end.checked_sub(self.start_us))
    }

    pub fn connectable(&self) -> bool {
        self.adv_type != AdvKind::AdvNonconnInd as u8
    }
}

fn is<C: Cmd>(op: u16) -> bool {
    C::OPCODE.to_raw() == op
}

/// Decodes the parameter block of `C`; trailing bytes are rejected.
fn params_of<'a, C>(params: &'a [u8]) -> Option<C::Params>
where
    C: Cmd,
    C::Params: FromHciBytes<'a>,
{
    match C::Params::from_hci_bytes(params) {
        Ok((decoded, [])) => Some(decoded),
        _ => None,
    }
}

/// BLE controller on the far side of the HCI UART.
///
/// Understands the commands a broadcaster sends and answers each with a
/// Command Complete event. Advertising intervals are logged as
/// [`Transmission`]s stamped with the shared clock.
#[derive(Debug)]
pub struct VirtualController {
    clock: SimClock,
    address: BdAddr,
    name: String,
    adv_type: u8,
    interval: (u16, u16),
    adv_data: Vec<u8>,
    scan_rsp: Vec<u8>,
    advertising: bool,
    rx: Vec<u8>,
    tx: VecDeque<u8>,
    forced_status: Option<u8>,
    commands: u64,
    transmissions: Vec<Transmission>,
}

impl VirtualController {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            address: DEFAULT_ADDRESS,
            name: String::new(),
            adv_type: 0,
            interval: (0x0800, 0x0800),
            adv_data: Vec::new(),
            scan_rsp: Vec::new(),
            advertising: false,
            rx: Vec::new(),
            tx: VecDeque::new(),
            forced_status: None,
            commands: 0,
            transmissions: Vec::new(),
        }
    }

    pub fn set_address(&mut self, address: BdAddr) {
        self.address = address;
    }

    /// Answers every following command with `status` (`None` restores normal
    /// operation).
    pub fn force_status(&mut self, status: Option<u8>) {
        self.forced_status = status;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn interval(&self) -> (u16, u16) {
        self.interval
    }

    pub fn transmissions(&self) -> &[Transmission] {
        &self.transmissions
    }

    pub fn commands(&self) -> u64 {
        self.commands
    }

    fn clear_state(&mut self) {
        self.end_transmission();
        self.name.clear();
        self.adv_type = 0;
        self.interval = (0x0800, 0x0800);
        self.adv_data.clear();
        self.scan_rsp.clear();
    }

    fn begin_transmission(&mut self) {
        if self.advertising {
            return;
        }
        self.advertising = true;
        self.transmissions.push(Transmission {
            start_us: self.clock.now_us(),
            end_us: None,
            adv_type: self.adv_type,
            data: self.adv_data.clone(),
            scan_response: self.scan_rsp.clone(),
        });
        tracing::debug!(data = ?self.adv_data, "HCI: advertising enabled");
    }

    fn end_transmission(&mut self) {
        if !self.advertising {
            return;
        }
        self.advertising = false;
        let now = self.clock.now_us();
        if let Some(tx) = self.transmissions.last_mut() {
            tx.end_us = Some(now);
        }
        tracing::debug!("HCI: advertising disabled");
    }

    fn process_pending(&mut self) {
        loop {
            if self.rx.is_empty() {
                return;
            }
            if self.rx[0] != PACKET_COMMAND {
                tracing::warn!(indicator = self.rx[0], "HCI: dropping non-command byte");
                self.rx.remove(0);
                continue;
            }
            if self.rx.len() < 4 {
                return;
            }
            let len = self.rx[3] as usize;
            if self.rx.len() < 4 + len {
                return;
            }
            let packet: Vec<u8> = self.rx.drain(..4 + len).collect();
            let op = u16::from_le_bytes([packet[1], packet[2]]);
            self.execute(op, &packet[4..]);
        }
    }

    fn execute(&mut self, op: u16, params: &[u8]) {
        self.commands += 1;
        let mut ret = Vec::new();
        let status = match self.forced_status {
            Some(status) => status,
            None => self.apply(op, params, &mut ret),
        };
        if status != STATUS_SUCCESS {
            tracing::debug!(opcode = op, status, "HCI: command failed");
            ret.clear();
        }
        self.complete(op, status, &ret);
    }

    fn apply(&mut self, op: u16, params: &[u8], ret: &mut Vec<u8>) -> u8 {
        if is::<Reset>(op) {
            self.clear_state();
            STATUS_SUCCESS
        } else if op == WRITE_LOCAL_NAME {
            let end = params.iter().position(|b| *b == 0).unwrap_or(params.len());
            self.name = String::from_utf8_lossy(&params[..end]).into_owned();
            STATUS_SUCCESS
        } else if is::<ReadBdAddr>(op) {
            ret.extend_from_slice(&self.address.0);
            STATUS_SUCCESS
        } else if is::<LeSetAdvParams>(op) {
            let Some(p) = params_of::<LeSetAdvParams>(params) else {
                return STATUS_INVALID_PARAMETERS;
            };
            if self.advertising {
                return STATUS_COMMAND_DISALLOWED;
            }
            let (min, max) = ({ p.adv_interval_min }.as_u16(), { p.adv_interval_max }.as_u16());
            if min > max {
                return STATUS_INVALID_PARAMETERS;
            }
            self.interval = (min, max);
            self.adv_type = p.adv_kind as u8;
            STATUS_SUCCESS
        } else if is::<LeSetAdvData>(op) {
            match params_of::<LeSetAdvData>(params) {
                Some(p) => self.store_data(p.data_len, &p.data, false),
                None => STATUS_INVALID_PARAMETERS,
            }
        } else if is::<LeSetScanResponseData>(op) {
            match params_of::<LeSetScanResponseData>(params) {
                Some(p) => self.store_data(p.data_len, &p.data, true),
                None => STATUS_INVALID_PARAMETERS,
            }
        } else if is::<LeSetAdvEnable>(op) {
            match params_of::<LeSetAdvEnable>(params) {
                Some(true) => self.begin_transmission(),
                Some(false) => self.end_transmission(),
                None => return STATUS_INVALID_PARAMETERS,
            }
            STATUS_SUCCESS
        } else {
            STATUS_UNKNOWN_COMMAND
        }
    }

    fn store_data(
        &mut self,
        len: u8,
        block: &[u8; MAX_ADV_DATA_LEN],
        scan_response: bool,
    ) -> u8 {
        let Some(data) = block.get(..len as usize) else {
            return STATUS_INVALID_PARAMETERS;
        };
        if scan_response {
            self.scan_rsp = data.to_vec();
        } else {
            self.adv_data = data.to_vec();
        }
        STATUS_SUCCESS
    }

    fn complete(&mut self, op: u16, status: u8, ret: &[u8]) {
        let [lo, hi] = op.to_le_bytes();
        self.tx.extend([
            PACKET_EVENT,
            EVENT_COMMAND_COMPLETE,
            (4 + ret.len()) as u8,
            1,
            lo,
            hi,
            status,
        ]);
        self.tx.extend(ret.iter().copied());
    }
}

impl napbeacon_core::hci::HciTransport for VirtualController {
    type Error = LinkError;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.rx.extend_from_slice(bytes);
        self.process_pending();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        if self.tx.len() < buf.len() {
            return Err(LinkError::Idle {
                wanted: buf.len(),
                available: self.tx.len(),
            });
        }
        for b in buf.iter_mut() {
            *b = self.tx.pop_front().unwrap_or_default();
        }
        Ok(())
    }
}

impl crate::Peripheral for VirtualController {
    fn name(&self) -> &'static str {
        "hci"
    }

    fn power_off(&mut self) {
        self.clear_state();
        self.rx.clear();
        self.tx.clear();
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({
            "address": self.address.to_string(),
            "name": self.name,
            "advertising": self.advertising,
            "adv_type": self.adv_type,
            "interval": [self.interval.0, self.interval.1],
            "adv_data": self.adv_data,
            "commands": self.commands,
            "transmissions": self.transmissions.len(),
        })
    }
}
