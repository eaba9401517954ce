#![no_std]

//! fanband BLE Peripheral Firmware Library
//!
//! Application logic for a single-connection BLE peripheral that advertises
//! a fixed name with a manufacturer-specific status byte, and defers a
//! bonding request for a short settling window after each connection.
//!
//! - `config`: startup configuration (bonding flag, identity, timing)
//! - `ble`: advertising payload, bonding schedule, event handler, adapters

pub mod ble;
pub mod config;
