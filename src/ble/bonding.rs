//! Bonding Schedule & Trust Bookkeeping
//!
//! The security request after a new connection is deliberately deferred so
//! the link gets a settling window before the handshake. The pending request
//! is kept as a monotonic-clock deadline that the connection-closed path can
//! cancel.

use defmt::Format;
use embassy_time::{Duration, Instant};

/// Bonding failure reasons after which stored trust material is wiped
/// instead of retried.
pub const REASON_PIN_OR_KEY_MISSING: u16 = 0x1006;
pub const REASON_PAIRING_NOT_SUPPORTED: u16 = 0x1205;
pub const REASON_COMMAND_DISALLOWED: u16 = 0x1208;
pub const REASON_AUTHENTICATION_FAILED: u16 = 0x120B;

/// True when a bonding failure leaves the stored trust state unusable.
pub fn is_unrecoverable(reason: u16) -> bool {
    matches!(
        reason,
        REASON_PIN_OR_KEY_MISSING
            | REASON_PAIRING_NOT_SUPPORTED
            | REASON_COMMAND_DISALLOWED
            | REASON_AUTHENTICATION_FAILED
    )
}

/// Deadline for the deferred security-increase request.
///
/// Two states: idle (no deadline) and pending. Arming while pending simply
/// restarts the window, matching a reconnect before the previous window
/// elapsed.
#[derive(Debug, Clone, Copy, Default, Format)]
pub struct BondingSchedule {
    deadline: Option<Instant>,
}

impl BondingSchedule {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm (or re-arm) the schedule to fire `delay` after `now`.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// Drop a pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Poll the schedule. Returns true exactly once, on the first poll at or
    /// after the deadline. Reaching the deadline always fires; it is a
    /// minimum wait, not a timeout.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Durable "stored bond data is trustworthy" flag.
///
/// Persistence itself belongs to an external collaborator; the handler only
/// marks the flag on bonding outcomes and queries it.
pub trait BondValidityStore {
    fn is_valid(&self) -> bool;
    fn mark_valid(&mut self);
    fn invalidate(&mut self);
}

/// RAM-backed store used by this firmware.
#[derive(Debug, Clone, Copy, Default, Format)]
pub struct RamBondValidity {
    valid: bool,
}

impl BondValidityStore for RamBondValidity {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn mark_valid(&mut self) {
        self.valid = true;
    }

    fn invalidate(&mut self) {
        self.valid = false;
    }
}
