//! Pairing and bonding for the peripheral link.
//!
//! Display-only IO capability: the SoftDevice generates a passkey, we log
//! it, and the central types it in. Bonds live in RAM only, oldest evicted
//! first.

use core::cell::RefCell;

use defmt::{info, warn};
use heapless::Vec;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};
use static_cell::StaticCell;

use crate::config::MAX_BONDS;

struct PeerBond {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

pub struct Bonder {
    peers: RefCell<Vec<PeerBond, MAX_BONDS>>,
}

impl Bonder {
    fn new() -> Self {
        Self {
            peers: RefCell::new(Vec::new()),
        }
    }

    /// True when the peer on `conn` has a bond with us.
    pub fn is_bonded(&self, conn: &Connection) -> bool {
        let addr = conn.peer_address();
        self.peers.borrow().iter().any(|p| p.peer_id.is_match(addr))
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::DisplayOnly
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn display_passkey(&self, passkey: &[u8; 6]) {
        info!("Passkey: {=[u8]:a}", passkey);
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        let mut peers = self.peers.borrow_mut();
        if let Some(existing) = peers.iter_mut().find(|p| p.master_id == master_id) {
            existing.key = key;
            existing.peer_id = peer_id;
            info!("Bond refreshed");
            return;
        }

        if peers.is_full() {
            warn!("Bond table full - evicting oldest entry");
            peers.remove(0);
        }

        let _ = peers.push(PeerBond {
            master_id,
            key,
            peer_id,
        });
        info!("Bonded - now holding {} bonds", peers.len());
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peers
            .borrow()
            .iter()
            .find_map(|p| (p.master_id == master_id).then_some(p.key))
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("Security changed: {}", mode);
    }
}

pub fn bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new())
}
