//! Advertising Payload Construction
//!
//! Builds the legacy advertisement broadcast by this peripheral: discovery
//! flags, the complete local name, and a manufacturer-specific block whose
//! last byte tells observers whether the device needs a fresh pairing.

use defmt::Format;
use heapless::Vec;

/// Maximum advertising data length (BLE specification)
pub const MAX_ADV_DATA_LEN: usize = 31;

// AD structure types used by this payload
const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// LE General Discoverable, BR/EDR not supported
const AD_FLAGS_GENERAL_DISCOVERABLE: u8 = 0x06;

/// Fixed overhead around the name: flags field (3) + name header (2) +
/// manufacturer field (5).
const PAYLOAD_OVERHEAD: usize = 3 + 2 + 5;

/// Status byte carried in the manufacturer-specific block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
#[repr(u8)]
pub enum StatusFlag {
    /// Normal operation, stored bonds (if any) are usable.
    Normal = 0x00,
    /// Bonding failed; the device wants a fresh pairing attempt.
    NeedsPairing = 0x01,
}

impl StatusFlag {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Advertising data errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum AdvDataError {
    /// Name plus fixed fields exceed the 31-byte advertisement limit.
    Overflow,
}

/// A built advertisement, ready to hand to the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvPayload {
    data: Vec<u8, MAX_ADV_DATA_LEN>,
}

impl AdvPayload {
    /// Build the full advertisement for the given status flag.
    ///
    /// The name is configurable at startup, so the length check is a real
    /// error path rather than an assert.
    pub fn build(name: &str, company_id: u16, status: StatusFlag) -> Result<Self, AdvDataError> {
        let name = name.as_bytes();
        if PAYLOAD_OVERHEAD + name.len() > MAX_ADV_DATA_LEN {
            return Err(AdvDataError::Overflow);
        }

        let mut data = Vec::new();

        // Flags (LE General Discoverable, BR/EDR disabled)
        data.extend_from_slice(&[2, AD_TYPE_FLAGS, AD_FLAGS_GENERAL_DISCOVERABLE])
            .map_err(|_| AdvDataError::Overflow)?;

        // Complete Local Name
        data.push(name.len() as u8 + 1).map_err(|_| AdvDataError::Overflow)?;
        data.push(AD_TYPE_COMPLETE_LOCAL_NAME)
            .map_err(|_| AdvDataError::Overflow)?;
        data.extend_from_slice(name).map_err(|_| AdvDataError::Overflow)?;

        // Manufacturer Specific Data: company ID little-endian, then status
        data.push(4).map_err(|_| AdvDataError::Overflow)?;
        data.push(AD_TYPE_MANUFACTURER_DATA)
            .map_err(|_| AdvDataError::Overflow)?;
        data.extend_from_slice(&company_id.to_le_bytes())
            .map_err(|_| AdvDataError::Overflow)?;
        data.push(status.as_byte()).map_err(|_| AdvDataError::Overflow)?;

        Ok(Self { data })
    }

    /// Payload bytes as the stack expects them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
