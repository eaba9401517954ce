//! Stack Command Port
//!
//! The narrow interface the event handler uses to talk to the vendor
//! Bluetooth stack. The real implementation lives in `runner`; tests record
//! calls against a mock. Every command returns a `Result` because any
//! non-success status from the stack is treated as fatal by the caller.

use defmt::Format;

/// Raw status code from a failed stack call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub struct StackError(pub u32);

/// Advertising mode passed to `start_advertising`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum AdvertiseMode {
    /// Connectable and scannable undirected advertising.
    ConnectableScannable,
    /// Broadcast only; no connections accepted.
    NonConnectable,
}

/// Security-manager IO capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    /// Just-Works pairing, no user interaction.
    NoInputNoOutput,
    KeyboardDisplay,
}

/// Eviction policy for the stack's bond store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum BondEviction {
    /// A new bond overwrites the bond used the longest time ago.
    OverwriteOldest,
    /// New bonds are rejected once the store is full.
    RejectNew,
}

/// Outbound commands to the Bluetooth stack.
pub trait BleStack {
    /// Allocate an advertising set and return its handle.
    fn create_advertising_set(&mut self) -> Result<u8, StackError>;

    /// Install advertising payload bytes on a set.
    fn set_advertiser_data(&mut self, set: u8, data: &[u8]) -> Result<(), StackError>;

    /// Configure advertising timing. Intervals are in 0.625 ms units;
    /// `duration` 0 means indefinite, `max_events` 0 means unlimited.
    fn set_advertiser_timing(
        &mut self,
        set: u8,
        interval_min: u16,
        interval_max: u16,
        duration: u16,
        max_events: u8,
    ) -> Result<(), StackError>;

    /// Start legacy advertising on a set.
    fn start_advertising(&mut self, set: u8, mode: AdvertiseMode) -> Result<(), StackError>;

    /// Configure the security manager.
    fn configure_security(&mut self, flags: u8, io: IoCapability) -> Result<(), StackError>;

    /// Allow or forbid new bonds.
    fn set_bondable_mode(&mut self, bondable: bool) -> Result<(), StackError>;

    /// Configure bond storage limits and eviction.
    fn store_bonding_configuration(
        &mut self,
        max_bonds: u8,
        policy: BondEviction,
    ) -> Result<(), StackError>;

    /// Request a security upgrade on an open connection.
    fn increase_security(&mut self, conn: u16) -> Result<(), StackError>;

    /// Wipe all stored bonds.
    fn delete_all_bondings(&mut self) -> Result<(), StackError>;

    /// Accept or reject a pending bonding request.
    fn confirm_bonding(&mut self, conn: u16, accept: bool) -> Result<(), StackError>;

    /// Accept or reject a passkey comparison value.
    fn confirm_passkey(&mut self, conn: u16, accept: bool) -> Result<(), StackError>;
}
