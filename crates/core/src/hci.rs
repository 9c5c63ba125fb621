// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Minimal HCI host for an external BLE controller on a UART (H4) link.
//!
//! Only the commands a broadcaster needs are implemented. Every command is
//! acknowledged by a Command Complete or Command Status event before the next
//! one is sent; unrelated events are skipped.

use core::fmt;

use bt_hci::cmd::controller_baseband::Reset;
use bt_hci::cmd::info::ReadBdAddr;
use bt_hci::cmd::le::{LeSetAdvData, LeSetAdvEnable, LeSetAdvParams, LeSetScanResponseData};
use bt_hci::cmd::Cmd;
use bt_hci::event::{CommandComplete, CommandStatus};
use bt_hci::param::{
    AddrKind, AdvChannelMap, AdvFilterPolicy, AdvKind, BdAddr as HciBdAddr, Duration,
};
use bt_hci::{FromHciBytes, WriteHci};

use crate::consts::{ADV_INTERVAL_MAX, ADV_INTERVAL_MIN};
use crate::payload::MAX_ADV_DATA_LEN;
use crate::radio::{AdvertisingMode, BdAddr, Radio};

/// H4 packet indicators.
pub const PACKET_COMMAND: u8 = 0x01;
pub const PACKET_EVENT: u8 = 0x04;

pub const EVENT_COMMAND_COMPLETE: u8 = 0x0E;
pub const EVENT_COMMAND_STATUS: u8 = 0x0F;

/// Write_Local_Name has no typed command; it is framed by hand.
pub const WRITE_LOCAL_NAME: u16 = 0x0C13;

/// Fixed size of the Write_Local_Name parameter.
pub const LOCAL_NAME_LEN: usize = 248;

/// Indicator, opcode, length and the largest parameter block.
const MAX_COMMAND_PACKET: usize = 1 + 3 + u8::MAX as usize;

/// Byte link to the controller.
pub trait HciTransport {
    type Error: fmt::Debug;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
    /// Blocks until `buf` is completely filled.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T: HciTransport + ?Sized> HciTransport for &mut T {
    type Error = T::Error;

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).write(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(buf)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HciError<E: fmt::Debug> {
    #[error("HCI transport error: {0:?}")]
    Transport(E),
    #[error("HCI command {opcode:#06x} failed with status {status:#04x}")]
    CommandFailed { opcode: u16, status: u8 },
    #[error("unexpected HCI packet indicator {0:#04x}")]
    UnexpectedPacket(u8),
    #[error("malformed HCI event {0:#04x}")]
    MalformedEvent(u8),
    #[error("payload of {0} bytes does not fit the command")]
    PayloadTooLong(usize),
}

pub struct HciRadio<T> {
    transport: T,
}

impl<T: HciTransport> HciRadio<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Serializes a typed command, sends it and waits for its completion.
    /// Return parameters (after the status byte) are copied into `ret`.
    pub fn send<C: Cmd + WriteHci>(
        &mut self,
        cmd: &C,
        ret: &mut [u8],
    ) -> Result<usize, HciError<T::Error>> {
        let len = 1 + cmd.size();
        if len > MAX_COMMAND_PACKET {
            return Err(HciError::PayloadTooLong(len));
        }
        let mut packet = [0u8; MAX_COMMAND_PACKET];
        packet[0] = PACKET_COMMAND;
        cmd.write_hci(&mut packet[1..len])
            .map_err(|_| HciError::PayloadTooLong(len))?;
        self.transport
            .write(&packet[..len])
            .map_err(HciError::Transport)?;
        self.wait_for(C::OPCODE.to_raw(), ret)
    }

    /// Sends a command from a raw opcode and parameter block.
    pub fn command(
        &mut self,
        opcode: u16,
        params: &[u8],
        ret: &mut [u8],
    ) -> Result<usize, HciError<T::Error>> {
        if params.len() > u8::MAX as usize {
            return Err(HciError::PayloadTooLong(params.len()));
        }
        let [lo, hi] = opcode.to_le_bytes();
        self.transport
            .write(&[PACKET_COMMAND, lo, hi, params.len() as u8])
            .map_err(HciError::Transport)?;
        self.transport.write(params).map_err(HciError::Transport)?;
        self.wait_for(opcode, ret)
    }

    fn wait_for(&mut self, opcode: u16, ret: &mut [u8]) -> Result<usize, HciError<T::Error>> {
        let mut event = [0u8; u8::MAX as usize];
        loop {
            let mut indicator = [0u8; 1];
            self.transport
                .read(&mut indicator)
                .map_err(HciError::Transport)?;
            if indicator[0] != PACKET_EVENT {
                return Err(HciError::UnexpectedPacket(indicator[0]));
            }

            let mut header = [0u8; 2];
            self.transport
                .read(&mut header)
                .map_err(HciError::Transport)?;
            let [code, len] = header;
            let params = &mut event[..len as usize];
            self.transport.read(params).map_err(HciError::Transport)?;

            match code {
                EVENT_COMMAND_COMPLETE => {
                    let (complete, _) = CommandComplete::from_hci_bytes(params)
                        .map_err(|_| HciError::MalformedEvent(code))?;
                    if complete.cmd_opcode.to_raw() != opcode {
                        continue;
                    }
                    let status = complete.status.into_inner();
                    if status != 0 {
                        return Err(HciError::CommandFailed { opcode, status });
                    }
                    let returned: &[u8] = &complete.return_param_bytes;
                    let n = returned.len().min(ret.len());
                    ret[..n].copy_from_slice(&returned[..n]);
                    return Ok(n);
                }
                EVENT_COMMAND_STATUS => {
                    let (pending, _) = CommandStatus::from_hci_bytes(params)
                        .map_err(|_| HciError::MalformedEvent(code))?;
                    if pending.cmd_opcode.to_raw() != opcode {
                        continue;
                    }
                    let status = pending.status.into_inner();
                    if status != 0 {
                        return Err(HciError::CommandFailed { opcode, status });
                    }
                    return Ok(0);
                }
                _ => {
                    log_debug!(event = code, "skipping unsolicited HCI event");
                }
            }
        }
    }
}

/// Zero-padded advertising or scan response block.
fn padded(data: &[u8]) -> Option<(u8, [u8; MAX_ADV_DATA_LEN])> {
    if data.len() > MAX_ADV_DATA_LEN {
        return None;
    }
    let mut block = [0u8; MAX_ADV_DATA_LEN];
    block[..data.len()].copy_from_slice(data);
    Some((data.len() as u8, block))
}

impl<T: HciTransport> Radio for HciRadio<T> {
    type Error = HciError<T::Error>;

    fn init(&mut self, name: &str) -> Result<(), Self::Error> {
        let name = name.as_bytes();
        if name.len() > LOCAL_NAME_LEN {
            return Err(HciError::PayloadTooLong(name.len()));
        }
        self.send(&Reset::new(), &mut [])?;

        let mut params = [0u8; LOCAL_NAME_LEN];
        params[..name.len()].copy_from_slice(name);
        self.command(WRITE_LOCAL_NAME, &params, &mut [])?;
        Ok(())
    }

    fn address(&mut self) -> Result<BdAddr, Self::Error> {
        let mut ret = [0u8; 6];
        let n = self.send(&ReadBdAddr::new(), &mut ret)?;
        let malformed = HciError::MalformedEvent(EVENT_COMMAND_COMPLETE);
        let (addr, _) = HciBdAddr::from_hci_bytes(&ret[..n]).map_err(|_| malformed)?;
        let mut raw = [0u8; 6];
        raw.copy_from_slice(addr.raw());
        Ok(BdAddr(raw))
    }

    fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let (len, block) = padded(data).ok_or(HciError::PayloadTooLong(data.len()))?;
        self.send(&LeSetAdvData::new(len, block), &mut [])?;
        Ok(())
    }

    fn set_scan_response_data(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let (len, block) = padded(data).ok_or(HciError::PayloadTooLong(data.len()))?;
        self.send(&LeSetScanResponseData::new(len, block), &mut [])?;
        Ok(())
    }

    fn set_advertising_mode(&mut self, mode: AdvertisingMode) -> Result<(), Self::Error> {
        let kind = match mode {
            AdvertisingMode::NonConnectable => AdvKind::AdvNonconnInd,
            AdvertisingMode::Connectable => AdvKind::AdvInd,
        };
        let params = LeSetAdvParams::new(
            Duration::from_u16(ADV_INTERVAL_MIN),
            Duration::from_u16(ADV_INTERVAL_MAX),
            kind,
            AddrKind::PUBLIC,
            AddrKind::PUBLIC,
            HciBdAddr::new([0; 6]),
            AdvChannelMap::ALL,
            AdvFilterPolicy::Unfiltered,
        );
        self.send(&params, &mut [])?;
        Ok(())
    }

    fn start_advertising(&mut self) -> Result<(), Self::Error> {
        self.send(&LeSetAdvEnable::new(true), &mut [])?;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        self.send(&LeSetAdvEnable::new(false), &mut [])?;
        Ok(())
    }
}
