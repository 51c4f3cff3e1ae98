//! In-memory 802.11 protocol-state model for wireless monitoring.
//!
//! For every physical wireless entity observed over the air this crate
//! maintains one [`device::Dot11Device`] aggregate: the SSIDs the entity
//! has advertised, probed for, or responded to; the BSSIDs it has behaved
//! as a client toward; and its captured WPA/EAPOL key-exchange history.
//! [`watchlist::SsidWatchlist`] provides the configured SSID pattern
//! matching used by alerting (SSID spoofing / evil-twin detection).
//!
//! Capture, frame/IE parsing, transport encoding, and the scheduler that
//! drives mutation all live outside this crate; the model consumes decoded
//! frame content and exposes a presence-aware, serde-walkable record tree
//! with per-record schema signatures.
//!
//! Mutation of one device's tree is expected to be serialized by the
//! external device tracker; this crate takes no locks of its own except
//! inside the watchlist matcher.

pub mod client;
pub mod device;
pub mod eapol;
pub mod error;
pub mod ie;
pub mod mac;
pub mod schema;
pub mod ssid;
pub mod watchlist;

pub use client::{ClientRecord, GeoPoint};
pub use device::{DeviceTypeSet, Dot11Device};
pub use eapol::{CapturedFrame, EapolDirection, EapolKeyRecord, HandshakeMask, NonceRecord};
pub use error::{Result, TrackerError};
pub use ie::{Dot11dRange, IeTag};
pub use mac::{DeviceKey, MacAddr, SsidHash};
pub use schema::{check_signature, TrackedComponent, SCHEMA_VERSION};
pub use ssid::{AdvertisedSsid, CryptSet, OweInfo, ProbedSsid, QbssLoad, WpsInfo};
pub use watchlist::{SsidWatchlist, WatchlistConfig};
