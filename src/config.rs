//! Startup Configuration
//!
//! The bonding feature flag, device identity and timing constants live in
//! one owned struct that is built once in `main` and handed to the
//! application task.

use embassy_time::Duration;

/// Advertised device name. Must leave room for the flags and manufacturer
/// fields inside the 31-byte advertisement.
pub const DEVICE_NAME: &str = "fanbandble";

/// Company identifier for the manufacturer-specific data block.
pub const COMPANY_ID: u16 = 0x0077;

/// Application configuration, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    /// Enables the whole bonding subsystem (security manager configuration,
    /// the deferred security request, and security event handling).
    pub bonding_enabled: bool,
    /// Complete local name placed in the advertisement.
    pub device_name: &'static str,
    /// Company identifier for the manufacturer-specific block.
    pub company_id: u16,
    /// Advertising interval, min and max, in 0.625 ms units.
    pub adv_interval: u16,
    /// Settling window between connection-opened and the security request.
    pub bonding_delay: Duration,
    /// Maximum number of bonds the stack's bond store keeps.
    pub max_bonds: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bonding_enabled: true,
            device_name: DEVICE_NAME,
            company_id: COMPANY_ID,
            adv_interval: 160, // 100ms
            bonding_delay: Duration::from_millis(300),
            max_bonds: 8,
        }
    }
}
