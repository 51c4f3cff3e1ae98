//! WPA/EAPOL key-exchange capture records.
//!
//! Every observed key message is retained, retransmissions included;
//! reconstructing a handshake later requires pairing the specific
//! retransmitted nonces, so nothing here is deduplicated or evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::TrackedComponent;

/// Direction of one EAPOL key message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EapolDirection {
    /// Authenticator to supplicant (M1 / M3).
    ApToClient,
    /// Supplicant to authenticator (M2 / M4).
    ClientToAp,
}

/// A raw frame snapshotted by the capture pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFrame {
    #[serde(rename = "dot11.packet.time")]
    pub time: DateTime<Utc>,
    /// Link type of the stored bytes.
    #[serde(rename = "dot11.packet.dlt")]
    pub dlt: u32,
    #[serde(rename = "dot11.packet.data")]
    pub data: Vec<u8>,
}

impl TrackedComponent for CapturedFrame {
    const RECORD_TYPE: &'static str = "dot11.packet";
    const FIELDS: &'static [&'static str] = &[
        "dot11.packet.time",
        "dot11.packet.dlt",
        "dot11.packet.data",
    ];
}

/// One observed WPA key-exchange message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EapolKeyRecord {
    #[serde(rename = "dot11.eapol.timestamp")]
    pub time: DateTime<Utc>,
    #[serde(rename = "dot11.eapol.direction")]
    pub direction: EapolDirection,
    /// Handshake message number, 1 through 4.
    #[serde(rename = "dot11.eapol.message_num")]
    pub message_num: u8,
    #[serde(rename = "dot11.eapol.replay_counter")]
    pub replay_counter: u64,
    #[serde(rename = "dot11.eapol.install")]
    pub install: bool,
    #[serde(rename = "dot11.eapol.nonce")]
    pub nonce: Vec<u8>,
    #[serde(rename = "dot11.eapol.rsn_pmkid", skip_serializing_if = "Option::is_none")]
    pub rsn_pmkid: Option<Vec<u8>>,
    /// Full captured key frame, when the capture pipeline provided one.
    #[serde(rename = "dot11.eapol.packet", skip_serializing_if = "Option::is_none")]
    pub frame: Option<CapturedFrame>,
}

impl TrackedComponent for EapolKeyRecord {
    const RECORD_TYPE: &'static str = "dot11.eapol.key";
    const FIELDS: &'static [&'static str] = &[
        "dot11.eapol.timestamp",
        "dot11.eapol.direction",
        "dot11.eapol.message_num",
        "dot11.eapol.replay_counter",
        "dot11.eapol.install",
        "dot11.eapol.nonce",
        "dot11.eapol.rsn_pmkid",
        "dot11.eapol.packet",
    ];
}

/// Condensed view of one key record, kept for historical nonce comparison
/// without the cost of the full frame. The PMKID and raw frame are dropped
/// deliberately.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonceRecord {
    #[serde(rename = "dot11.eapol.nonce.timestamp")]
    pub time: DateTime<Utc>,
    #[serde(rename = "dot11.eapol.nonce.message_num")]
    pub message_num: u8,
    #[serde(rename = "dot11.eapol.nonce.install")]
    pub install: bool,
    #[serde(rename = "dot11.eapol.nonce.nonce")]
    pub nonce: Vec<u8>,
    #[serde(rename = "dot11.eapol.nonce.replay_counter")]
    pub replay_counter: u64,
}

impl NonceRecord {
    /// Copies exactly the timestamp, message number, install flag, nonce
    /// bytes, and replay counter of `key`.
    pub fn from_key(key: &EapolKeyRecord) -> Self {
        NonceRecord {
            time: key.time,
            message_num: key.message_num,
            install: key.install,
            nonce: key.nonce.clone(),
            replay_counter: key.replay_counter,
        }
    }
}

impl TrackedComponent for NonceRecord {
    const RECORD_TYPE: &'static str = "dot11.eapol.nonce";
    const FIELDS: &'static [&'static str] = &[
        "dot11.eapol.nonce.timestamp",
        "dot11.eapol.nonce.message_num",
        "dot11.eapol.nonce.install",
        "dot11.eapol.nonce.nonce",
        "dot11.eapol.nonce.replay_counter",
    ];
}

/// Which handshake messages have been observed, one named bit per message.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandshakeMask(u8);

impl HandshakeMask {
    pub const M1: HandshakeMask = HandshakeMask(1 << 0);
    pub const M2: HandshakeMask = HandshakeMask(1 << 1);
    pub const M3: HandshakeMask = HandshakeMask(1 << 2);
    pub const M4: HandshakeMask = HandshakeMask(1 << 3);

    pub const fn empty() -> Self {
        HandshakeMask(0)
    }

    /// Bit for handshake message `message_num` (1-4); `None` outside that
    /// range.
    pub fn for_message(message_num: u8) -> Option<Self> {
        match message_num {
            1..=4 => Some(HandshakeMask(1 << (message_num - 1))),
            _ => None,
        }
    }

    pub fn insert(&mut self, other: HandshakeMask) {
        self.0 |= other.0;
    }

    pub fn contains(&self, other: HandshakeMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// All four messages observed.
    pub fn is_complete(&self) -> bool {
        self.0 == 0x0f
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Debug for HandshakeMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HandshakeMask({:04b})", self.0)
    }
}
