//! Inbound Stack Events
//!
//! Events consumed from the Bluetooth stack, delivered one at a time through
//! a single ordered queue to the application task.

use defmt::Format;

/// One event from the vendor stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum StackEvent {
    /// The stack has started and the radio is ready. No command may be
    /// issued before this event.
    Boot,
    /// A new connection was opened. `bonding` is the stack's bond handle for
    /// the peer, or 0xFF when the peer is not bonded.
    ConnectionOpened { conn: u16, bonding: u8 },
    /// The connection was closed, for any reason.
    ConnectionClosed { reason: u16 },
    /// Bonding with the peer failed.
    BondingFailed { conn: u16, reason: u16 },
    /// Bonding completed successfully.
    Bonded { conn: u16, bonding: u8, security_mode: u8 },
    /// The security manager asks whether the pending bonding should proceed.
    ConfirmBonding { conn: u16, bonding: u8 },
    /// The security manager asks to confirm a passkey comparison value.
    ConfirmPasskey { conn: u16, passkey: u32 },
}

impl StackEvent {
    /// True for events originating from the security manager.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            StackEvent::BondingFailed { .. }
                | StackEvent::Bonded { .. }
                | StackEvent::ConfirmBonding { .. }
                | StackEvent::ConfirmPasskey { .. }
        )
    }
}
