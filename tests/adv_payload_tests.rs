#![no_std]
#![no_main]
#![feature(alloc_error_handler)]

mod common;

use fanband_firmware::ble::advertising::{AdvDataError, AdvPayload, StatusFlag, MAX_ADV_DATA_LEN};
use proptest::prelude::*;

#[defmt_test::tests]
mod tests {
    use defmt::{assert, assert_eq};

    use super::*;
    use crate::common::*;

    #[init]
    fn init() {
        ensure_heap_initialized();
    }

    #[test]
    fn test_payload_structure_for_all_names_and_flags() {
        proptest!(|(
            name_len in 0usize..=21,
            needs_pairing in any::<bool>(),
        )| {
            // Total length = flags (3) + name header (2) + name + mfg (5),
            // last byte = status flag, for every name that fits
            let name_bytes = alloc::vec![b'a'; name_len];
            let name = core::str::from_utf8(&name_bytes).unwrap();
            let status = if needs_pairing {
                StatusFlag::NeedsPairing
            } else {
                StatusFlag::Normal
            };

            let payload = AdvPayload::build(name, 0x0077, status).unwrap();
            let bytes = payload.as_bytes();

            prop_assert_eq!(bytes.len(), 3 + 2 + name_len + 5);
            prop_assert!(bytes.len() <= MAX_ADV_DATA_LEN);
            prop_assert_eq!(*bytes.last().unwrap(), status.as_byte());

            // Name field header
            prop_assert_eq!(bytes[3] as usize, name_len + 1);
            prop_assert_eq!(bytes[4], 0x09);
        });
    }

    #[test]
    fn test_flags_field_is_general_discoverable() {
        let payload = AdvPayload::build("fanbandble", 0x0077, StatusFlag::Normal).unwrap();
        assert_eq!(&payload.as_bytes()[..3], &[0x02, 0x01, 0x06]);
    }

    #[test]
    fn test_manufacturer_block_carries_company_id_little_endian() {
        let payload = AdvPayload::build("fanbandble", 0x0077, StatusFlag::NeedsPairing).unwrap();
        let bytes = payload.as_bytes();
        let mfg = &bytes[bytes.len() - 5..];

        assert_eq!(mfg[0], 4); // length: type + 2 company id + 1 data
        assert_eq!(mfg[1], 0xFF);
        assert_eq!(mfg[2], 0x77); // company ID LSB
        assert_eq!(mfg[3], 0x00); // company ID MSB
        assert_eq!(mfg[4], 0x01);
    }

    #[test]
    fn test_oversized_name_is_rejected() {
        let too_long = "a-device-name-that-cannot-fit";
        let result = AdvPayload::build(too_long, 0x0077, StatusFlag::Normal);
        assert!(matches!(result, Err(AdvDataError::Overflow)));
    }
}
