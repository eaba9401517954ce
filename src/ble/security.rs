//! Just-Works Security Handler
//!
//! SoftDevice-facing side of the bonding subsystem: reports no-input
//! no-output capability, accepts bonding, keeps the peer's keys and cached
//! system attributes so a bonded peer can re-encrypt on reconnect, and
//! reports bonding outcomes into the application event queue.

use core::cell::{Cell, RefCell};

use defmt::{debug, info, warn};
use heapless::Vec;
use nrf_softdevice::ble::gatt_server::{get_sys_attrs, set_sys_attrs};
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};

use crate::ble::events::StackEvent;
use crate::ble::runner;

/// Maximum cached system-attribute blob (CCCD states).
const MAX_SYS_ATTR_SIZE: usize = 62;

#[derive(Debug, Clone, Copy)]
struct Peer {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

/// Single-peer bond storage. The event handler owns the policy decisions;
/// this type only holds key material for the SoftDevice's callbacks.
pub struct Bonder {
    peer: Cell<Option<Peer>>,
    sys_attrs: RefCell<Vec<u8, MAX_SYS_ATTR_SIZE>>,
}

impl Bonder {
    pub const fn new() -> Self {
        Self {
            peer: Cell::new(None),
            sys_attrs: RefCell::new(Vec::new()),
        }
    }

    /// Drop stored keys and cached system attributes.
    pub fn clear(&self) {
        debug!("bond store: clearing stored keys");
        self.peer.set(None);
        self.sys_attrs.borrow_mut().clear();
    }

    pub fn has_bond(&self) -> bool {
        self.peer.get().is_some()
    }
}

impl Default for Bonder {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        // Just-Works pairing only
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        // Not reachable with IoCapabilities::None; logged for diagnostics
        info!("display passkey: {}", passkey);
    }

    fn on_security_update(&self, _conn: &Connection, security_mode: SecurityMode) {
        debug!("security update: {}", security_mode);
    }

    fn on_bonded(
        &self,
        conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        info!("bonded: storing keys");
        self.sys_attrs.borrow_mut().clear();
        self.peer.set(Some(Peer {
            master_id,
            key,
            peer_id,
        }));

        runner::enqueue(StackEvent::Bonded {
            conn: conn.handle().unwrap_or(0),
            bonding: 0,
            security_mode: 1,
        });
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        debug!("getting bond for master id");
        self.peer
            .get()
            .filter(|peer| peer.master_id == master_id)
            .map(|peer| peer.key)
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        let mut sys_attrs = self.sys_attrs.borrow_mut();
        let capacity = sys_attrs.capacity();
        if sys_attrs.resize(capacity, 0).is_err() {
            return;
        }
        match get_sys_attrs(conn, &mut sys_attrs) {
            Ok(len) => sys_attrs.truncate(len),
            Err(e) => {
                warn!("get_sys_attrs failed: {:?}", defmt::Debug2Format(&e));
                sys_attrs.clear();
            }
        }
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        let attrs = self.sys_attrs.borrow();
        let attrs = if attrs.is_empty() {
            None
        } else {
            Some(attrs.as_slice())
        };
        if let Err(e) = set_sys_attrs(conn, attrs) {
            warn!("set_sys_attrs failed: {:?}", defmt::Debug2Format(&e));
        }
    }
}
