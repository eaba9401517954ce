//! Connection & Bonding Event Handler
//!
//! Owns all application state (advertising set, current connection, bonding
//! schedule) and reacts to stack events one at a time. Every outbound
//! command goes through the `BleStack` port; any command failure propagates
//! out and is fatal to the firmware.

use defmt::{debug, info, warn, Format};
use embassy_time::Instant;

use crate::ble::advertising::{AdvDataError, AdvPayload, StatusFlag};
use crate::ble::bonding::{is_unrecoverable, BondValidityStore, BondingSchedule};
use crate::ble::events::StackEvent;
use crate::ble::stack::{AdvertiseMode, BleStack, BondEviction, IoCapability, StackError};
use crate::config::AppConfig;

/// Handler errors. All of them halt the firmware; there is no retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum AppError {
    Stack(StackError),
    AdvData(AdvDataError),
}

impl From<StackError> for AppError {
    fn from(e: StackError) -> Self {
        AppError::Stack(e)
    }
}

impl From<AdvDataError> for AppError {
    fn from(e: AdvDataError) -> Self {
        AppError::AdvData(e)
    }
}

/// The application event handler.
///
/// Driven by exactly one task: `handle_event` for each stack event, `tick`
/// at the periodic cadence. Neither entry point blocks.
pub struct App<S, B> {
    stack: S,
    bonds: B,
    config: AppConfig,
    /// Advertising set handle, allocated on boot.
    adv_set: Option<u8>,
    /// Most recent connection handle. Stale after connection-closed.
    conn: Option<u16>,
    schedule: BondingSchedule,
}

impl<S: BleStack, B: BondValidityStore> App<S, B> {
    pub fn new(stack: S, bonds: B, config: AppConfig) -> Self {
        Self {
            stack,
            bonds,
            config,
            adv_set: None,
            conn: None,
            schedule: BondingSchedule::new(),
        }
    }

    /// Dispatch one stack event. Events arrive in order and are handled to
    /// completion.
    pub fn handle_event(&mut self, event: StackEvent, now: Instant) -> Result<(), AppError> {
        if event.is_security_event() && !self.config.bonding_enabled {
            debug!("bonding disabled, ignoring {}", event);
            return Ok(());
        }

        match event {
            StackEvent::Boot => self.on_boot(),
            StackEvent::ConnectionOpened { conn, bonding } => {
                self.on_connection_opened(conn, bonding, now)
            }
            StackEvent::ConnectionClosed { reason } => self.on_connection_closed(reason),
            StackEvent::BondingFailed { conn, reason } => self.on_bonding_failed(conn, reason),
            StackEvent::Bonded {
                conn,
                bonding,
                security_mode,
            } => self.on_bonded(conn, bonding, security_mode),
            StackEvent::ConfirmBonding { conn, bonding } => self.on_confirm_bonding(conn, bonding),
            StackEvent::ConfirmPasskey { conn, passkey } => self.on_confirm_passkey(conn, passkey),
        }
    }

    /// Periodic entry point, nominal 10 ms cadence. Fires the deferred
    /// security request once its deadline passes. Never blocks.
    pub fn tick(&mut self, now: Instant) -> Result<(), AppError> {
        if !self.schedule.poll(now) {
            return Ok(());
        }

        if let Some(conn) = self.conn {
            info!("bonding: requesting security increase on conn {}", conn);
            self.stack.increase_security(conn)?;
        }
        Ok(())
    }

    fn on_boot(&mut self) -> Result<(), AppError> {
        let set = self.stack.create_advertising_set()?;
        self.adv_set = Some(set);

        self.install_adv_data(set, StatusFlag::Normal)?;

        // 100ms min/max, indefinite duration, unlimited events
        self.stack.set_advertiser_timing(
            set,
            self.config.adv_interval,
            self.config.adv_interval,
            0,
            0,
        )?;

        if self.config.bonding_enabled {
            info!("bonding: configuring security manager");
            self.stack
                .configure_security(0x00, IoCapability::NoInputNoOutput)?;
            self.stack.set_bondable_mode(true)?;
            self.stack
                .store_bonding_configuration(self.config.max_bonds, BondEviction::OverwriteOldest)?;
            info!("bonding: SM configured, bondable mode enabled");
        }

        self.stack
            .start_advertising(set, AdvertiseMode::ConnectableScannable)?;
        Ok(())
    }

    fn on_connection_opened(
        &mut self,
        conn: u16,
        bonding: u8,
        now: Instant,
    ) -> Result<(), AppError> {
        info!("connection opened: handle={} bonding={}", conn, bonding);
        self.conn = Some(conn);

        if self.config.bonding_enabled {
            self.schedule.arm(now, self.config.bonding_delay);
            debug!("bonding: security request deferred");
        }
        Ok(())
    }

    fn on_connection_closed(&mut self, reason: u16) -> Result<(), AppError> {
        info!("connection closed: reason={=u16:#x}", reason);

        // The connection the deadline was armed for no longer exists.
        if self.schedule.cancel() {
            debug!("bonding: pending security request cancelled");
        }

        self.restart_advertising(StatusFlag::Normal)
    }

    fn on_bonding_failed(&mut self, conn: u16, reason: u16) -> Result<(), AppError> {
        warn!("bonding failed: conn={} reason={=u16:#x}", conn, reason);

        if is_unrecoverable(reason) {
            warn!("bonding: deleting all bondings after reason {=u16:#x}", reason);
            self.stack.delete_all_bondings()?;
            self.bonds.invalidate();
        }

        // Signal observers that the device wants a fresh pairing attempt
        self.restart_advertising(StatusFlag::NeedsPairing)
    }

    fn on_bonded(&mut self, conn: u16, bonding: u8, security_mode: u8) -> Result<(), AppError> {
        info!(
            "bonded: conn={} bonding={} security_mode={}",
            conn, bonding, security_mode
        );
        self.bonds.mark_valid();
        Ok(())
    }

    fn on_confirm_bonding(&mut self, conn: u16, bonding: u8) -> Result<(), AppError> {
        info!("bonding: confirm requested on conn={} bonding={}", conn, bonding);
        self.stack.confirm_bonding(conn, true)?;
        Ok(())
    }

    fn on_confirm_passkey(&mut self, conn: u16, passkey: u32) -> Result<(), AppError> {
        // Just-Works only: the comparison value is accepted unconditionally
        info!("bonding: passkey confirm on conn={} passkey={}", conn, passkey);
        self.stack.confirm_passkey(conn, true)?;
        Ok(())
    }

    /// Reinstall the payload with the given status and go discoverable again.
    fn restart_advertising(&mut self, status: StatusFlag) -> Result<(), AppError> {
        let set = match self.adv_set {
            Some(set) => set,
            None => {
                warn!("advertising restart requested before boot");
                return Ok(());
            }
        };

        self.install_adv_data(set, status)?;
        self.stack
            .start_advertising(set, AdvertiseMode::ConnectableScannable)?;
        Ok(())
    }

    fn install_adv_data(&mut self, set: u8, status: StatusFlag) -> Result<(), AppError> {
        let payload = AdvPayload::build(self.config.device_name, self.config.company_id, status)?;
        self.stack.set_advertiser_data(set, payload.as_bytes())?;
        Ok(())
    }

    /// Whether a deferred security request is currently pending.
    pub fn is_bonding_pending(&self) -> bool {
        self.schedule.is_armed()
    }

    /// Most recent connection handle.
    pub fn connection(&self) -> Option<u16> {
        self.conn
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn bonds(&self) -> &B {
        &self.bonds
    }
}
