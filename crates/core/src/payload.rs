// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! iBeacon advertisement payload.
//!
//! Layout of the 30-byte frame:
//! `[02 01 flags] [1A FF <company:2 LE> 02 15 <uuid:16> <major:2 BE> <minor:2 BE> <power:1>]`

use core::fmt;

#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};
use trouble_host::advertise::{AdStructure, BR_EDR_NOT_SUPPORTED};
use uuid::Uuid;

use crate::consts::{
    BEACON_SUBTYPE, BEACON_SUBTYPE_LEN, MANUFACTURER_ID, MEASURED_POWER, PROXIMITY_UUID,
};

/// Legacy advertising payloads are capped at 31 bytes.
pub const MAX_ADV_DATA_LEN: usize = 31;

/// iBeacon record following the company identifier: sub-type, sub-type
/// length, UUID, major, minor, measured power.
pub const BEACON_RECORD_LEN: usize = 1 + 1 + 16 + 2 + 2 + 1;

/// Flags element plus manufacturer element (company id + record).
pub const FRAME_LEN: usize = 3 + 2 + 2 + BEACON_RECORD_LEN;

/// Flags advertised by the beacon.
pub const BEACON_FLAGS: u8 = BR_EDR_NOT_SUPPORTED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct BeaconIdentity {
    pub proximity_uuid: Uuid,
    pub manufacturer_id: u16,
    pub major: u16,
    pub minor: u16,
}

impl BeaconIdentity {
    /// Identity for a boot counter: high half is major, low half is minor.
    pub fn for_boot_count(boot_count: u32) -> Self {
        Self {
            proximity_uuid: PROXIMITY_UUID,
            manufacturer_id: MANUFACTURER_ID,
            major: (boot_count >> 16) as u16,
            minor: (boot_count & 0xFFFF) as u16,
        }
    }

    /// Boot counter this identity was derived from.
    pub fn boot_count(&self) -> u32 {
        ((self.major as u32) << 16) | self.minor as u32
    }

    fn encode_record(&self) -> [u8; BEACON_RECORD_LEN] {
        let mut rec = [0u8; BEACON_RECORD_LEN];
        rec[0] = BEACON_SUBTYPE;
        rec[1] = BEACON_SUBTYPE_LEN;
        rec[2..18].copy_from_slice(self.proximity_uuid.as_bytes());
        rec[18..20].copy_from_slice(&self.major.to_be_bytes());
        rec[20..22].copy_from_slice(&self.minor.to_be_bytes());
        rec[22] = MEASURED_POWER as u8;
        rec
    }

    fn decode_record(manufacturer_id: u16, rec: &[u8]) -> Option<Self> {
        if rec.len() != BEACON_RECORD_LEN
            || rec[0] != BEACON_SUBTYPE
            || rec[1] != BEACON_SUBTYPE_LEN
        {
            return None;
        }
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&rec[2..18]);
        Some(Self {
            proximity_uuid: Uuid::from_bytes(uuid),
            manufacturer_id,
            major: u16::from_be_bytes([rec[18], rec[19]]),
            minor: u16::from_be_bytes([rec[20], rec[21]]),
        })
    }

    /// Finds the beacon record in raw advertising data.
    pub fn decode(ad: &[u8]) -> Option<Self> {
        AdStructure::decode(ad)
            .map_while(Result::ok)
            .find_map(|element| match element {
                AdStructure::ManufacturerSpecificData {
                    company_identifier,
                    payload,
                } => Self::decode_record(company_identifier, payload),
                _ => None,
            })
    }
}

/// Encoded advertising data, ready for the radio.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AdvertisementFrame {
    buf: [u8; MAX_ADV_DATA_LEN],
    len: usize,
}

impl AdvertisementFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn identity(&self) -> Option<BeaconIdentity> {
        BeaconIdentity::decode(self.as_bytes())
    }

    pub fn flags(&self) -> Option<u8> {
        decode_flags(self.as_bytes())
    }
}

impl fmt::Debug for AdvertisementFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdvertisementFrame({:02X?})", self.as_bytes())
    }
}

/// Builds the advertising frame broadcast for `boot_count`.
pub fn build(boot_count: u32) -> AdvertisementFrame {
    let identity = BeaconIdentity::for_boot_count(boot_count);
    let record = identity.encode_record();
    let mut buf = [0u8; MAX_ADV_DATA_LEN];
    // Fixed-size elements; FRAME_LEN always fits.
    let len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(BEACON_FLAGS),
            AdStructure::ManufacturerSpecificData {
                company_identifier: identity.manufacturer_id,
                payload: &record,
            },
        ],
        &mut buf[..],
    )
    .unwrap_or_default();
    debug_assert_eq!(len, FRAME_LEN);
    AdvertisementFrame { buf, len }
}

/// Reads the Flags element out of raw advertising data.
pub fn decode_flags(ad: &[u8]) -> Option<u8> {
    AdStructure::decode(ad)
        .map_while(Result::ok)
        .find_map(|element| match element {
            AdStructure::Flags(flags) => Some(flags),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout_at_zero() {
        let frame = build(0);
        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), 30);
        assert_eq!(bytes.len(), FRAME_LEN);
        assert_eq!(&bytes[0..3], &[0x02, 0x01, 0x04]);
        assert_eq!(&bytes[3..9], &[0x1A, 0xFF, 0x4C, 0x00, 0x02, 0x15]);
        assert_eq!(&bytes[9..25], PROXIMITY_UUID.as_bytes());
        assert_eq!(&bytes[25..30], &[0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_major_minor_big_endian() {
        let frame = build(0x1234_5678);
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[25..27], &[0x12, 0x34]);
        assert_eq!(&bytes[27..29], &[0x56, 0x78]);
    }

    #[test]
    fn test_split_of_counter() {
        for boot_count in [0u32, 1, 0xFFFF, 0x1_0000, 0xDEAD_BEEF, u32::MAX] {
            let id = build(boot_count).identity().unwrap();
            assert_eq!(id.major as u32, boot_count >> 16);
            assert_eq!(id.minor as u32, boot_count & 0xFFFF);
            assert_eq!(id.boot_count(), boot_count);
        }
    }

    #[test]
    fn test_constant_fields_do_not_depend_on_counter() {
        let reference = build(0);
        for boot_count in [1u32, 9, 10, 65_535, 65_536, 0x8000_0000, u32::MAX] {
            let frame = build(boot_count);
            assert_eq!(frame.flags(), Some(0x04));
            assert_eq!(&frame.as_bytes()[..25], &reference.as_bytes()[..25]);
            let id = frame.identity().unwrap();
            assert_eq!(id.proximity_uuid, PROXIMITY_UUID);
            assert_eq!(id.manufacturer_id, MANUFACTURER_ID);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        assert_eq!(build(777).as_bytes(), build(777).as_bytes());
    }

    #[test]
    fn test_decode_skips_unrelated_elements() {
        let frame = build(3);
        let mut ad = [0u8; 40];
        // Complete Local Name "NB" ahead of the beacon.
        ad[..4].copy_from_slice(&[0x03, 0x09, b'N', b'B']);
        ad[4..4 + frame.len()].copy_from_slice(frame.as_bytes());
        let id = BeaconIdentity::decode(&ad).unwrap();
        assert_eq!(id.minor, 3);
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let frame = build(3);
        assert!(BeaconIdentity::decode(&frame.as_bytes()[..20]).is_none());
        assert!(BeaconIdentity::decode(&[]).is_none());
    }

    #[test]
    fn test_record_follows_company_identifier() {
        let frame = build(0x0002_0001);
        let bytes = frame.as_bytes();
        assert_eq!(bytes[3] as usize, 1 + 2 + BEACON_RECORD_LEN);
        assert_eq!(&bytes[7..9], &[BEACON_SUBTYPE, BEACON_SUBTYPE_LEN]);
    }

    #[test]
    fn test_decode_rejects_other_manufacturer_records() {
        let ad = [0x05, 0xFF, 0x59, 0x00, 0xAA, 0xBB];
        assert!(BeaconIdentity::decode(&ad).is_none());
    }
}
