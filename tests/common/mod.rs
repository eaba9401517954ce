//! Common test utilities and setup for embedded tests
//!
//! Shared by the defmt-test based suites: critical section and logger
//! plumbing, heap setup for proptest, and the recording stack mock the
//! handler tests drive.

// Re-export commonly used items for tests (except conflicting macros)
pub use defmt_rtt as _; // global logger
// Also need the same embassy dependencies as the main firmware
pub use embassy_executor as _;
// Use nrf-softdevice which provides both interrupt vectors and critical section
pub use nrf_softdevice as _;
pub use panic_probe as _; // panic handler
pub use {embassy_nrf as _, embassy_sync as _, embassy_time as _};

// Global allocator for proptest (required for alloc feature in no_std)
pub extern crate alloc;
#[allow(unused)]
pub use alloc::vec;
use core::sync::atomic::{AtomicBool, Ordering};

pub use embedded_alloc::LlffHeap as Heap;

#[global_allocator]
pub static HEAP: Heap = Heap::empty();

// Define the global allocator backing store - 8KB heap for proptest suites
pub static mut HEAP_MEM: [u8; 8192] = [0; 8192];

// Global flag to ensure heap is only initialized once
static HEAP_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Ensure heap is initialized exactly once (thread-safe)
pub fn ensure_heap_initialized() {
    if !HEAP_INITIALIZED.swap(true, Ordering::Relaxed) {
        unsafe {
            let ptr = HEAP_MEM.as_mut_ptr();
            let len = HEAP_MEM.len();
            HEAP.init(ptr as usize, len);
        }
    }
}

use embassy_time::Duration;
use fanband_firmware::ble::stack::{
    AdvertiseMode, BleStack, BondEviction, IoCapability, StackError,
};
use fanband_firmware::config::AppConfig;

/// Handle the mock hands out for the advertising set.
pub const MOCK_ADV_SET: u8 = 1;

/// One recorded outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateAdvertisingSet,
    SetAdvertiserData {
        set: u8,
        data: heapless::Vec<u8, 31>,
    },
    SetAdvertiserTiming {
        set: u8,
        interval_min: u16,
        interval_max: u16,
        duration: u16,
        max_events: u8,
    },
    StartAdvertising {
        set: u8,
        mode: AdvertiseMode,
    },
    ConfigureSecurity {
        flags: u8,
        io: IoCapability,
    },
    SetBondableMode {
        bondable: bool,
    },
    StoreBondingConfiguration {
        max_bonds: u8,
        policy: BondEviction,
    },
    IncreaseSecurity {
        conn: u16,
    },
    DeleteAllBondings,
    ConfirmBonding {
        conn: u16,
        accept: bool,
    },
    ConfirmPasskey {
        conn: u16,
        accept: bool,
    },
}

/// Stack mock that records every outbound command in order.
#[derive(Default)]
pub struct MockStack {
    pub calls: heapless::Vec<Call, 64>,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, call: Call) {
        if self.calls.push(call).is_err() {
            panic!("mock call log full");
        }
    }

    /// Payload bytes from the most recent set_advertiser_data call.
    pub fn last_adv_data(&self) -> Option<&[u8]> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::SetAdvertiserData { data, .. } => Some(data.as_slice()),
            _ => None,
        })
    }

    pub fn security_requests(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::IncreaseSecurity { .. }))
            .count()
    }

    pub fn delete_bondings_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::DeleteAllBondings))
            .count()
    }

    pub fn advertising_starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::StartAdvertising { .. }))
            .count()
    }
}

impl BleStack for MockStack {
    fn create_advertising_set(&mut self) -> Result<u8, StackError> {
        self.record(Call::CreateAdvertisingSet);
        Ok(MOCK_ADV_SET)
    }

    fn set_advertiser_data(&mut self, set: u8, data: &[u8]) -> Result<(), StackError> {
        let mut buf = heapless::Vec::new();
        buf.extend_from_slice(data).unwrap();
        self.record(Call::SetAdvertiserData { set, data: buf });
        Ok(())
    }

    fn set_advertiser_timing(
        &mut self,
        set: u8,
        interval_min: u16,
        interval_max: u16,
        duration: u16,
        max_events: u8,
    ) -> Result<(), StackError> {
        self.record(Call::SetAdvertiserTiming {
            set,
            interval_min,
            interval_max,
            duration,
            max_events,
        });
        Ok(())
    }

    fn start_advertising(&mut self, set: u8, mode: AdvertiseMode) -> Result<(), StackError> {
        self.record(Call::StartAdvertising { set, mode });
        Ok(())
    }

    fn configure_security(&mut self, flags: u8, io: IoCapability) -> Result<(), StackError> {
        self.record(Call::ConfigureSecurity { flags, io });
        Ok(())
    }

    fn set_bondable_mode(&mut self, bondable: bool) -> Result<(), StackError> {
        self.record(Call::SetBondableMode { bondable });
        Ok(())
    }

    fn store_bonding_configuration(
        &mut self,
        max_bonds: u8,
        policy: BondEviction,
    ) -> Result<(), StackError> {
        self.record(Call::StoreBondingConfiguration { max_bonds, policy });
        Ok(())
    }

    fn increase_security(&mut self, conn: u16) -> Result<(), StackError> {
        self.record(Call::IncreaseSecurity { conn });
        Ok(())
    }

    fn delete_all_bondings(&mut self) -> Result<(), StackError> {
        self.record(Call::DeleteAllBondings);
        Ok(())
    }

    fn confirm_bonding(&mut self, conn: u16, accept: bool) -> Result<(), StackError> {
        self.record(Call::ConfirmBonding { conn, accept });
        Ok(())
    }

    fn confirm_passkey(&mut self, conn: u16, accept: bool) -> Result<(), StackError> {
        self.record(Call::ConfirmPasskey { conn, accept });
        Ok(())
    }
}

/// Default test configuration with bonding toggled as requested.
pub fn test_config(bonding_enabled: bool) -> AppConfig {
    AppConfig {
        bonding_enabled,
        bonding_delay: Duration::from_millis(300),
        ..AppConfig::default()
    }
}
