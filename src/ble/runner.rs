//! SoftDevice Adapter
//!
//! Binds the hardware-free event handler to the real stack: a single ordered
//! event queue feeding the application task, a 10 ms ticker for the bonding
//! schedule, and an advertising loop built on the SoftDevice's high-level
//! peripheral API. Stack commands from the handler land here as shared
//! advertising state or raw SoftDevice calls.

use core::cell::RefCell;

use defmt::{debug, info, unwrap, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker, Timer};
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::{self, WriteOp};
use nrf_softdevice::ble::peripheral::{self, Config as PeripheralConfig, ConnectableAdvertisement};
use nrf_softdevice::ble::Connection;
use nrf_softdevice::{raw, Softdevice};

use crate::ble::advertising::MAX_ADV_DATA_LEN;
use crate::ble::bonding::RamBondValidity;
use crate::ble::events::StackEvent;
use crate::ble::handler::App;
use crate::ble::security::Bonder;
use crate::ble::stack::{AdvertiseMode, BleStack, BondEviction, IoCapability, StackError};
use crate::config::AppConfig;

/// Nominal cadence of the bonding-schedule poll.
const TICK_PERIOD: Duration = Duration::from_millis(10);

/// The single advertising set this firmware uses.
const ADV_SET: u8 = 0;

/// Reason reported when the GATT loop observes a disconnect. The high-level
/// API does not expose the HCI reason code.
const REASON_REMOTE_USER_TERMINATED: u16 = 0x13;

/// Single ordered event queue feeding the application task.
static EVENTS: Channel<CriticalSectionRawMutex, StackEvent, 8> = Channel::new();

/// Wakes the advertising loop after a start request.
static ADV_KICK: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Advertising state mirrored from handler commands.
struct AdvShared {
    payload: Vec<u8, MAX_ADV_DATA_LEN>,
    /// Interval in 0.625 ms units.
    interval: u16,
    requested: bool,
    bondable: bool,
}

impl AdvShared {
    const fn new() -> Self {
        Self {
            payload: Vec::new(),
            interval: 160,
            requested: false,
            bondable: false,
        }
    }
}

static ADV_SHARED: Mutex<CriticalSectionRawMutex, RefCell<AdvShared>> =
    Mutex::new(RefCell::new(AdvShared::new()));

/// Feed a stack event into the application queue.
pub(crate) fn enqueue(event: StackEvent) {
    if EVENTS.try_send(event).is_err() {
        warn!("event queue full, dropping {}", event);
    }
}

/// `BleStack` port backed by the SoftDevice and the advertising loop.
pub struct SoftdeviceStack {
    bonder: &'static Bonder,
}

impl SoftdeviceStack {
    pub fn new(bonder: &'static Bonder) -> Self {
        Self { bonder }
    }
}

impl BleStack for SoftdeviceStack {
    fn create_advertising_set(&mut self) -> Result<u8, StackError> {
        // The SoftDevice is configured with a single advertising set
        Ok(ADV_SET)
    }

    fn set_advertiser_data(&mut self, _set: u8, data: &[u8]) -> Result<(), StackError> {
        ADV_SHARED.lock(|shared| {
            let mut shared = shared.borrow_mut();
            shared.payload.clear();
            shared
                .payload
                .extend_from_slice(data)
                .map_err(|_| StackError(raw::NRF_ERROR_DATA_SIZE))
        })
    }

    fn set_advertiser_timing(
        &mut self,
        _set: u8,
        interval_min: u16,
        _interval_max: u16,
        _duration: u16,
        _max_events: u8,
    ) -> Result<(), StackError> {
        ADV_SHARED.lock(|shared| shared.borrow_mut().interval = interval_min);
        Ok(())
    }

    fn start_advertising(&mut self, _set: u8, mode: AdvertiseMode) -> Result<(), StackError> {
        // Only connectable+scannable advertising is wired up
        debug!("start advertising: mode={}", mode);
        ADV_SHARED.lock(|shared| shared.borrow_mut().requested = true);
        ADV_KICK.signal(());
        Ok(())
    }

    fn configure_security(&mut self, flags: u8, io: IoCapability) -> Result<(), StackError> {
        // IO capability is reported to the SoftDevice by the security
        // handler; nothing further to program here.
        debug!("security manager configured: flags={} io={}", flags, io);
        Ok(())
    }

    fn set_bondable_mode(&mut self, bondable: bool) -> Result<(), StackError> {
        ADV_SHARED.lock(|shared| shared.borrow_mut().bondable = bondable);
        Ok(())
    }

    fn store_bonding_configuration(
        &mut self,
        max_bonds: u8,
        policy: BondEviction,
    ) -> Result<(), StackError> {
        debug!("bond store configured: max={} policy={}", max_bonds, policy);
        Ok(())
    }

    fn increase_security(&mut self, conn: u16) -> Result<(), StackError> {
        // Peripheral-initiated security request (slave security request)
        let mut params: raw::ble_gap_sec_params_t = unsafe { core::mem::zeroed() };
        params.set_bond(1);
        params.set_io_caps(raw::BLE_GAP_IO_CAPS_NONE as u8);
        params.min_key_size = 7;
        params.max_key_size = 16;

        let ret = unsafe { raw::sd_ble_gap_authenticate(conn, &params) };
        if ret == raw::NRF_SUCCESS {
            Ok(())
        } else {
            Err(StackError(ret))
        }
    }

    fn delete_all_bondings(&mut self) -> Result<(), StackError> {
        self.bonder.clear();
        Ok(())
    }

    fn confirm_bonding(&mut self, conn: u16, accept: bool) -> Result<(), StackError> {
        // Just-Works pairing proceeds without an explicit reply; the
        // security handler already reports no-input-no-output.
        debug!("confirm bonding: conn={} accept={}", conn, accept);
        Ok(())
    }

    fn confirm_passkey(&mut self, conn: u16, accept: bool) -> Result<(), StackError> {
        debug!("confirm passkey: conn={} accept={}", conn, accept);
        Ok(())
    }
}

/// Application task: owns the handler, drains the event queue, drives the
/// periodic tick. Any handler error is fatal.
#[embassy_executor::task]
pub async fn app_task(bonder: &'static Bonder, config: AppConfig) {
    let stack = SoftdeviceStack::new(bonder);
    let mut app = App::new(stack, RamBondValidity::default(), config);

    // The SoftDevice is up once this task runs
    enqueue(StackEvent::Boot);

    let mut ticker = Ticker::every(TICK_PERIOD);
    loop {
        match select(EVENTS.receive(), ticker.next()).await {
            Either::First(event) => unwrap!(app.handle_event(event, Instant::now())),
            Either::Second(()) => unwrap!(app.tick(Instant::now())),
        }
    }
}

/// Minimal GATT server. This firmware exposes no application services; the
/// server exists so the connection's event loop can be awaited until
/// disconnect.
pub struct Server;

impl gatt_server::Server for Server {
    type Event = ();

    fn on_write(
        &self,
        _conn: &Connection,
        _handle: u16,
        _op: WriteOp,
        _offset: usize,
        _data: &[u8],
    ) -> Option<Self::Event> {
        None
    }
}

/// Advertising loop: advertises whenever the handler has requested it,
/// reports connection open/close back into the event queue.
#[embassy_executor::task]
pub async fn advertising_task(sd: &'static Softdevice, bonder: &'static Bonder) {
    info!("starting advertising task");
    let server = Server;

    loop {
        ADV_KICK.wait().await;

        loop {
            let (payload, interval, bondable, requested) = ADV_SHARED.lock(|shared| {
                let shared = shared.borrow();
                (
                    shared.payload.clone(),
                    shared.interval,
                    shared.bondable,
                    shared.requested,
                )
            });
            if !requested {
                break;
            }

            let mut config = PeripheralConfig::default();
            config.interval = interval as u32;

            let adv = ConnectableAdvertisement::ScannableUndirected {
                adv_data: &payload,
                scan_data: &[],
            };

            let result = if bondable {
                peripheral::advertise_pairable(sd, adv, &config, bonder).await
            } else {
                peripheral::advertise_connectable(sd, adv, &config).await
            };

            match result {
                Ok(conn) => {
                    ADV_SHARED.lock(|shared| shared.borrow_mut().requested = false);

                    let handle = conn.handle().unwrap_or(0);
                    enqueue(StackEvent::ConnectionOpened {
                        conn: handle,
                        bonding: 0xFF,
                    });

                    // Returns when the connection is gone
                    let _ = gatt_server::run(&conn, &server, |_| {}).await;
                    debug!("gatt loop ended, connection closed");

                    enqueue(StackEvent::ConnectionClosed {
                        reason: REASON_REMOTE_USER_TERMINATED,
                    });

                    // The handler restarts advertising via start_advertising
                    break;
                }
                Err(e) => {
                    warn!("advertising failed: {:?}", defmt::Debug2Format(&e));
                    Timer::after(Duration::from_secs(1)).await;
                }
            }
        }
    }
}
