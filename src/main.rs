#![no_std]
#![no_main]

use defmt::*;
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::{config::Config, interrupt};
use embassy_time::{Duration, Timer};
use nrf_softdevice::{raw, Config as SdConfig, Softdevice};
use panic_probe as _;
use static_cell::StaticCell;

use fanband_firmware::ble::runner::{advertising_task, app_task};
use fanband_firmware::ble::security::Bonder;
use fanband_firmware::config::{AppConfig, DEVICE_NAME};

static BONDER: StaticCell<Bonder> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("starting fanband firmware");

    // Configure nRF peripherals
    let mut nrf_config = Config::default();
    // Interrupt priorities must avoid SoftDevice reserved levels (0, 1, 4)
    nrf_config.gpiote_interrupt_priority = interrupt::Priority::P2;
    nrf_config.time_interrupt_priority = interrupt::Priority::P2;

    let _peripherals = embassy_nrf::init(nrf_config);

    info!("Embassy initialized, configuring SoftDevice...");

    let sd_config = SdConfig {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: Default::default(),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&sd_config);
    info!("SoftDevice enabled");

    let bonder = BONDER.init(Bonder::new());
    let config = AppConfig::default();

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(app_task(bonder, config)));
    unwrap!(spawner.spawn(advertising_task(sd, bonder)));

    info!("system initialized, entering main loop");

    loop {
        Timer::after(Duration::from_secs(10)).await;
        info!("heartbeat - system running");
    }
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}
