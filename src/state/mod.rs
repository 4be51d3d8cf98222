//! Hub state: sessions, the roster, accounts, and punishment maps.

pub mod events;
pub mod hub;
pub mod session;

pub use events::{EventMaps, EventStatus, PunishKind};
pub use hub::{Account, Hub, HubState, RuntimeOptions, Torrent, HUB_SECURITY};
pub use session::{LoginStage, Session, SessionId};

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
