//! BLE Connection & Bonding Logic
//!
//! The event handler in `handler` owns all state and talks to the vendor
//! stack only through the `stack::BleStack` port. `runner` and `security`
//! bind that port to the SoftDevice; everything else is hardware-free.

pub mod advertising;
pub mod bonding;
pub mod events;
pub mod handler;
pub mod runner;
pub mod security;
pub mod stack;
