//! The per-entity 802.11 device aggregate.
//!
//! One `Dot11Device` rides along with each base device record the external
//! tracker maintains. The frame-processing path owns all mutation of one
//! aggregate; readers take a deep clone and must run [`Dot11Device::refresh_derived`]
//! first so the size-derived counters match the live collections.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ClientRecord;
use crate::eapol::{CapturedFrame, EapolDirection, EapolKeyRecord, HandshakeMask, NonceRecord};
use crate::mac::{DeviceKey, MacAddr, SsidHash};
use crate::schema::TrackedComponent;
use crate::ssid::{AdvertisedSsid, ProbedSsid};

/// Top-level classification of a device, one named bit per observed role.
/// Bits are only ever set, never cleared; a device that has beaconed once
/// stays classified as a beaconing AP.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceTypeSet(u64);

impl DeviceTypeSet {
    /// Has sent beacons.
    pub const BEACON_AP: DeviceTypeSet = DeviceTypeSet(1 << 0);
    /// Has acted as an ad-hoc (IBSS) peer.
    pub const ADHOC: DeviceTypeSet = DeviceTypeSet(1 << 1);
    /// Has acted as a client.
    pub const CLIENT: DeviceTypeSet = DeviceTypeSet(1 << 2);
    /// Appears to be a wired device bridged to wifi.
    pub const WIRED: DeviceTypeSet = DeviceTypeSet(1 << 3);
    /// WDS distribution network member.
    pub const WDS: DeviceTypeSet = DeviceTypeSet(1 << 4);
    /// Legacy Turbocell.
    pub const TURBOCELL: DeviceTypeSet = DeviceTypeSet(1 << 5);
    /// Never seen directly, inferred from wireless traffic addressed to it.
    pub const INFERRED_WIRELESS: DeviceTypeSet = DeviceTypeSet(1 << 6);
    /// Never seen directly, inferred from wired-side traffic.
    pub const INFERRED_WIRED: DeviceTypeSet = DeviceTypeSet(1 << 7);
    /// Has responded to probes like an AP.
    pub const PROBE_AP: DeviceTypeSet = DeviceTypeSet(1 << 8);

    pub const fn empty() -> Self {
        DeviceTypeSet(0)
    }

    pub fn insert(&mut self, other: DeviceTypeSet) {
        self.0 |= other.0;
    }

    pub fn contains(&self, other: DeviceTypeSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Debug for DeviceTypeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeviceTypeSet({:#x})", self.0)
    }
}

/// Per-entity protocol state. Owns its sub-record tree exclusively; the
/// only non-owning references are the `last_*_ssid` hash keys, which
/// resolve through the owned maps and simply stop resolving if the record
/// they named is removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dot11Device {
    #[serde(rename = "dot11.device.typeset")]
    pub type_set: DeviceTypeSet,

    /// APs this device has behaved as a client toward, keyed by BSSID.
    /// Materialized on first use; a device that never associates carries no
    /// empty map.
    #[serde(rename = "dot11.device.client_map", skip_serializing_if = "Option::is_none")]
    pub client_map: Option<BTreeMap<MacAddr, ClientRecord>>,
    #[serde(rename = "dot11.device.num_client_aps")]
    pub num_client_aps: u64,

    #[serde(
        rename = "dot11.device.advertised_ssid_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub advertised_ssid_map: Option<BTreeMap<SsidHash, AdvertisedSsid>>,
    #[serde(rename = "dot11.device.num_advertised_ssids")]
    pub num_advertised_ssids: u64,

    #[serde(
        rename = "dot11.device.responded_ssid_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub responded_ssid_map: Option<BTreeMap<SsidHash, AdvertisedSsid>>,
    #[serde(rename = "dot11.device.num_responded_ssids")]
    pub num_responded_ssids: u64,

    #[serde(
        rename = "dot11.device.probed_ssid_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub probed_ssid_map: Option<BTreeMap<SsidHash, ProbedSsid>>,
    #[serde(rename = "dot11.device.num_probed_ssids")]
    pub num_probed_ssids: u64,

    /// Clients associated to this device when it acts as an AP, mapped to
    /// their keys in the external device tracker.
    #[serde(
        rename = "dot11.device.associated_client_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub associated_client_map: Option<BTreeMap<MacAddr, DeviceKey>>,
    #[serde(rename = "dot11.device.num_associated_clients")]
    pub num_associated_clients: u64,

    #[serde(rename = "dot11.device.client_disconnects")]
    pub client_disconnects: u64,
    #[serde(
        rename = "dot11.device.client_disconnects_last",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_disconnects_last: Option<DateTime<Utc>>,

    /// Last observed 802.11 sequence number; overwritten on every frame,
    /// replay/out-of-order policy is the caller's.
    #[serde(rename = "dot11.device.last_sequence")]
    pub last_sequence: u64,
    /// Last BSS TSF timestamp, same overwrite semantics.
    #[serde(rename = "dot11.device.bss_timestamp")]
    pub bss_timestamp: u64,

    #[serde(rename = "dot11.device.num_fragments")]
    pub num_fragments: u64,
    #[serde(rename = "dot11.device.num_retries")]
    pub num_retries: u64,
    #[serde(rename = "dot11.device.datasize")]
    pub datasize: u64,
    #[serde(rename = "dot11.device.datasize_retry")]
    pub datasize_retry: u64,

    #[serde(rename = "dot11.device.last_bssid", skip_serializing_if = "Option::is_none")]
    pub last_bssid: Option<MacAddr>,
    #[serde(
        rename = "dot11.device.last_beacon_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_beacon_timestamp: Option<DateTime<Utc>>,

    /// EAPOL message-3 sightings, retransmissions included. Excessive M3
    /// retransmission is a deauth-attack indicator surfaced to alerting.
    #[serde(rename = "dot11.device.eapol_m3_count")]
    pub eapol_m3_count: u64,
    #[serde(
        rename = "dot11.device.eapol_m3_last",
        skip_serializing_if = "Option::is_none"
    )]
    pub eapol_m3_last: Option<DateTime<Utc>>,

    /// Complete observed key-exchange history, append-only and unbounded;
    /// bounding it over long sessions is a configuration concern above this
    /// model.
    #[serde(
        rename = "dot11.device.wpa_handshake_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub wpa_key_vec: Option<Vec<EapolKeyRecord>>,
    #[serde(
        rename = "dot11.device.wpa_nonce_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub wpa_nonce_vec: Option<Vec<NonceRecord>>,
    #[serde(
        rename = "dot11.device.wpa_anonce_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub wpa_anonce_vec: Option<Vec<NonceRecord>>,

    /// Handshake messages seen, recomputed from the key history; kept in
    /// sync on append and by `refresh_derived`.
    #[serde(rename = "dot11.device.wpa_present_handshake")]
    pub wpa_present_handshake: HandshakeMask,

    #[serde(
        rename = "dot11.device.ssid_beacon_packet",
        skip_serializing_if = "Option::is_none"
    )]
    ssid_beacon_packet: Option<CapturedFrame>,
    #[serde(
        rename = "dot11.device.pmkid_packet",
        skip_serializing_if = "Option::is_none"
    )]
    pmkid_packet: Option<CapturedFrame>,

    #[serde(
        rename = "dot11.device.last_beaconed_ssid_record",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_beaconed_ssid: Option<SsidHash>,
    #[serde(
        rename = "dot11.device.last_probed_ssid_record",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_probed_ssid: Option<SsidHash>,

    #[serde(rename = "dot11.device.min_tx_power")]
    pub min_tx_power: u8,
    #[serde(rename = "dot11.device.max_tx_power")]
    pub max_tx_power: u8,
    #[serde(
        rename = "dot11.device.supported_channels",
        skip_serializing_if = "Option::is_none"
    )]
    pub supported_channels: Option<Vec<u32>>,

    #[serde(rename = "dot11.device.link_measurement_capable")]
    pub link_measurement_capable: bool,
    #[serde(rename = "dot11.device.neighbor_report_capable")]
    pub neighbor_report_capable: bool,
    #[serde(
        rename = "dot11.device.extended_capabilities",
        skip_serializing_if = "Option::is_none"
    )]
    pub extended_capabilities: Option<Vec<String>>,

    #[serde(rename = "dot11.device.beacon_fingerprint")]
    pub beacon_fingerprint: u32,
    #[serde(rename = "dot11.device.probe_fingerprint")]
    pub probe_fingerprint: u32,
    #[serde(rename = "dot11.device.response_fingerprint")]
    pub response_fingerprint: u32,

    // Internal coordination state, never serialized.
    #[serde(skip)]
    snapshot_next_beacon: bool,
    #[serde(skip)]
    base_key: Option<DeviceKey>,
    #[serde(skip)]
    last_adv_ie_csum: u32,
    #[serde(skip)]
    last_bss_invalid: Option<DateTime<Utc>>,
    #[serde(skip)]
    bss_invalid_count: u32,
}

impl Default for Dot11Device {
    fn default() -> Self {
        Self::new()
    }
}

impl Dot11Device {
    pub fn new() -> Self {
        Dot11Device {
            type_set: DeviceTypeSet::empty(),
            client_map: None,
            num_client_aps: 0,
            advertised_ssid_map: None,
            num_advertised_ssids: 0,
            responded_ssid_map: None,
            num_responded_ssids: 0,
            probed_ssid_map: None,
            num_probed_ssids: 0,
            associated_client_map: None,
            num_associated_clients: 0,
            client_disconnects: 0,
            client_disconnects_last: None,
            last_sequence: 0,
            bss_timestamp: 0,
            num_fragments: 0,
            num_retries: 0,
            datasize: 0,
            datasize_retry: 0,
            last_bssid: None,
            last_beacon_timestamp: None,
            eapol_m3_count: 0,
            eapol_m3_last: None,
            wpa_key_vec: None,
            wpa_nonce_vec: None,
            wpa_anonce_vec: None,
            wpa_present_handshake: HandshakeMask::empty(),
            ssid_beacon_packet: None,
            pmkid_packet: None,
            last_beaconed_ssid: None,
            last_probed_ssid: None,
            min_tx_power: 0,
            max_tx_power: 0,
            supported_channels: None,
            link_measurement_capable: false,
            neighbor_report_capable: false,
            extended_capabilities: None,
            beacon_fingerprint: 0,
            probe_fingerprint: 0,
            response_fingerprint: 0,
            snapshot_next_beacon: false,
            base_key: None,
            last_adv_ie_csum: 0,
            last_bss_invalid: None,
            bss_invalid_count: 0,
        }
    }

    /// One-time link to the base device record this aggregate rides on.
    /// Attaching twice is a caller bug; the tracker attaches exactly once
    /// when it first routes a dot11 frame to a device.
    pub fn attach_base(&mut self, key: DeviceKey) {
        debug_assert!(self.base_key.is_none(), "device aggregate attached twice");
        if self.base_key.is_some() {
            tracing::warn!(?key, "ignoring second base attach for device aggregate");
            return;
        }
        self.base_key = Some(key);
    }

    pub fn base_key(&self) -> Option<DeviceKey> {
        self.base_key
    }

    /// OR-merge a classification bit. Idempotent, monotonic.
    pub fn or_type_set(&mut self, bits: DeviceTypeSet) {
        self.type_set.insert(bits);
    }

    /// Client-of record for `bssid`, created on first access.
    pub fn client_mut(&mut self, bssid: MacAddr) -> &mut ClientRecord {
        self.client_map
            .get_or_insert_with(BTreeMap::new)
            .entry(bssid)
            .or_insert_with(|| ClientRecord::new(bssid))
    }

    pub fn client(&self, bssid: &MacAddr) -> Option<&ClientRecord> {
        self.client_map.as_ref().and_then(|m| m.get(bssid))
    }

    /// Advertised-SSID record for `hash`, created empty on first access;
    /// the frame path fills in content. Re-observation of identical content
    /// lands on the same record.
    pub fn advertised_ssid_mut(&mut self, hash: SsidHash) -> &mut AdvertisedSsid {
        self.advertised_ssid_map
            .get_or_insert_with(BTreeMap::new)
            .entry(hash)
            .or_insert_with(|| AdvertisedSsid::new(hash))
    }

    pub fn advertised_ssid(&self, hash: &SsidHash) -> Option<&AdvertisedSsid> {
        self.advertised_ssid_map.as_ref().and_then(|m| m.get(hash))
    }

    pub fn responded_ssid_mut(&mut self, hash: SsidHash) -> &mut AdvertisedSsid {
        self.responded_ssid_map
            .get_or_insert_with(BTreeMap::new)
            .entry(hash)
            .or_insert_with(|| AdvertisedSsid::new(hash))
    }

    pub fn responded_ssid(&self, hash: &SsidHash) -> Option<&AdvertisedSsid> {
        self.responded_ssid_map.as_ref().and_then(|m| m.get(hash))
    }

    pub fn probed_ssid_mut(&mut self, hash: SsidHash) -> &mut ProbedSsid {
        self.probed_ssid_map
            .get_or_insert_with(BTreeMap::new)
            .entry(hash)
            .or_insert_with(|| ProbedSsid::new(hash))
    }

    pub fn probed_ssid(&self, hash: &SsidHash) -> Option<&ProbedSsid> {
        self.probed_ssid_map.as_ref().and_then(|m| m.get(hash))
    }

    /// Record that `client` is associated to this device (acting as AP),
    /// keyed to the client's record in the external tracker.
    pub fn associate_client(&mut self, client: MacAddr, key: DeviceKey) {
        self.associated_client_map
            .get_or_insert_with(BTreeMap::new)
            .insert(client, key);
    }

    pub fn disassociate_client(&mut self, client: &MacAddr) {
        if let Some(map) = self.associated_client_map.as_mut() {
            map.remove(client);
        }
    }

    // Device-wide traffic accumulators; saturating, like the client-record
    // counters.

    pub fn add_datasize(&mut self, bytes: u64) {
        self.datasize = self.datasize.saturating_add(bytes);
    }

    pub fn add_datasize_retry(&mut self, bytes: u64) {
        self.datasize_retry = self.datasize_retry.saturating_add(bytes);
    }

    pub fn inc_fragments(&mut self) {
        self.num_fragments = self.num_fragments.saturating_add(1);
    }

    pub fn inc_retries(&mut self) {
        self.num_retries = self.num_retries.saturating_add(1);
    }

    pub fn inc_client_disconnects(&mut self, time: DateTime<Utc>) {
        self.client_disconnects = self.client_disconnects.saturating_add(1);
        self.client_disconnects_last = Some(time);
    }

    /// Overwrite the last observed 802.11 sequence number. No ordering
    /// check; replay and out-of-order policy is the caller's.
    pub fn record_sequence(&mut self, sequence: u64) {
        self.last_sequence = sequence;
    }

    /// Overwrite the last BSS TSF timestamp, same overwrite semantics as
    /// the sequence number.
    pub fn record_bss_timestamp(&mut self, timestamp: u64) {
        self.bss_timestamp = timestamp;
    }

    pub fn record_beacon_timestamp(&mut self, time: DateTime<Utc>) {
        self.last_beacon_timestamp = Some(time);
    }

    pub fn set_last_bssid(&mut self, bssid: MacAddr) {
        self.last_bssid = Some(bssid);
    }

    /// Capabilities pulled from an association request: advertised TX power
    /// range and supported channels. The channel list materializes only
    /// when a device has actually advertised one.
    pub fn record_assoc_capabilities(
        &mut self,
        min_tx_power: u8,
        max_tx_power: u8,
        channels: Vec<u32>,
    ) {
        self.min_tx_power = min_tx_power;
        self.max_tx_power = max_tx_power;
        self.supported_channels = Some(channels);
    }

    /// Note a BSS timestamp that went backwards or otherwise looked wrong.
    /// Kept internally for rate-limiting invalid-timestamp alerts; not part
    /// of the serialized tree.
    pub fn note_invalid_bss_timestamp(&mut self, time: DateTime<Utc>) {
        self.last_bss_invalid = Some(time);
        self.bss_invalid_count = self.bss_invalid_count.saturating_add(1);
    }

    pub fn bss_invalid_count(&self) -> u32 {
        self.bss_invalid_count
    }

    pub fn last_adv_ie_csum(&self) -> u32 {
        self.last_adv_ie_csum
    }

    /// Checksum of the most recent beacon's IE list; lets the frame path
    /// skip re-parsing a beacon whose tags haven't changed.
    pub fn set_last_adv_ie_csum(&mut self, csum: u32) {
        self.last_adv_ie_csum = csum;
    }

    /// Resolve the non-owning last-beaconed-SSID link through the owned
    /// map. Returns `None` once the record it named is gone.
    pub fn last_beaconed_ssid_record(&self) -> Option<&AdvertisedSsid> {
        let hash = self.last_beaconed_ssid.as_ref()?;
        self.advertised_ssid(hash)
    }

    pub fn last_probed_ssid_record(&self) -> Option<&ProbedSsid> {
        let hash = self.last_probed_ssid.as_ref()?;
        self.probed_ssid(hash)
    }

    /// Append one observed EAPOL key message. Every sighting is retained,
    /// retransmissions included; an M3 also bumps the retransmission
    /// counter and the present-handshake mask picks up the message bit.
    pub fn append_wpa_key(&mut self, key: EapolKeyRecord) {
        if key.message_num == 3 {
            self.eapol_m3_count = self.eapol_m3_count.saturating_add(1);
            self.eapol_m3_last = Some(key.time);
        }
        if let Some(bit) = HandshakeMask::for_message(key.message_num) {
            self.wpa_present_handshake.insert(bit);
        }
        tracing::trace!(message_num = key.message_num, "retaining EAPOL key message");
        self.wpa_key_vec.get_or_insert_with(Vec::new).push(key);
    }

    /// Handshake mask derived from the key history: bit *i* is set iff at
    /// least one record with message number *i*+1 exists.
    pub fn wpa_handshake_mask(&self) -> HandshakeMask {
        let mut mask = HandshakeMask::empty();
        if let Some(keys) = self.wpa_key_vec.as_ref() {
            for key in keys {
                if let Some(bit) = HandshakeMask::for_message(key.message_num) {
                    mask.insert(bit);
                }
            }
        }
        mask
    }

    /// Condense `key` into the direction-matched nonce history: client→AP
    /// messages carry the station SNonce, AP→client messages the ANonce.
    /// Callers with their own selection policy use the direct appenders.
    pub fn append_condensed_nonce(&mut self, key: &EapolKeyRecord) {
        let nonce = NonceRecord::from_key(key);
        match key.direction {
            EapolDirection::ClientToAp => self.append_station_nonce(nonce),
            EapolDirection::ApToClient => self.append_ap_nonce(nonce),
        }
    }

    pub fn append_station_nonce(&mut self, nonce: NonceRecord) {
        self.wpa_nonce_vec.get_or_insert_with(Vec::new).push(nonce);
    }

    pub fn append_ap_nonce(&mut self, nonce: NonceRecord) {
        self.wpa_anonce_vec.get_or_insert_with(Vec::new).push(nonce);
    }

    /// Ask for the next beacon to be snapshotted. Has no effect on the
    /// needed-query once a beacon has been captured; a device keeps at most
    /// one beacon frame over its lifetime.
    pub fn set_snapshot_next_beacon(&mut self, snapshot: bool) {
        self.snapshot_next_beacon = snapshot;
    }

    pub fn beacon_snapshot_needed(&self) -> bool {
        self.snapshot_next_beacon && self.ssid_beacon_packet.is_none()
    }

    pub fn beacon_packet_present(&self) -> bool {
        self.ssid_beacon_packet.is_some()
    }

    pub fn beacon_packet(&self) -> Option<&CapturedFrame> {
        self.ssid_beacon_packet.as_ref()
    }

    /// Store the one beacon snapshot for this device. First capture wins;
    /// later frames are dropped so the retained bytes stay the ones the
    /// snapshot request observed.
    pub fn capture_beacon_packet(&mut self, frame: CapturedFrame) {
        if self.ssid_beacon_packet.is_some() {
            return;
        }
        tracing::debug!(bytes = frame.data.len(), "captured beacon snapshot");
        self.ssid_beacon_packet = Some(frame);
    }

    /// PMKID capture is opportunistic: wanted until the first PMKID-bearing
    /// frame has been stored, with no request flag involved.
    pub fn pmkid_needed(&self) -> bool {
        self.pmkid_packet.is_none()
    }

    pub fn pmkid_present(&self) -> bool {
        self.pmkid_packet.is_some()
    }

    pub fn pmkid_packet(&self) -> Option<&CapturedFrame> {
        self.pmkid_packet.as_ref()
    }

    pub fn capture_pmkid_packet(&mut self, frame: CapturedFrame) {
        if self.pmkid_packet.is_some() {
            return;
        }
        tracing::debug!(bytes = frame.data.len(), "captured PMKID frame");
        self.pmkid_packet = Some(frame);
    }

    /// Recompute every size-derived counter from the live collections,
    /// treating a never-materialized collection as size 0, and re-derive
    /// the handshake mask from the key history. Mandatory immediately
    /// before the tree is cloned or handed to a reader; nothing else is
    /// allowed to be the source of truth for these counters.
    pub fn refresh_derived(&mut self) {
        self.num_client_aps = self.client_map.as_ref().map_or(0, |m| m.len() as u64);
        self.num_advertised_ssids = self
            .advertised_ssid_map
            .as_ref()
            .map_or(0, |m| m.len() as u64);
        self.num_responded_ssids = self
            .responded_ssid_map
            .as_ref()
            .map_or(0, |m| m.len() as u64);
        self.num_probed_ssids = self.probed_ssid_map.as_ref().map_or(0, |m| m.len() as u64);
        self.num_associated_clients = self
            .associated_client_map
            .as_ref()
            .map_or(0, |m| m.len() as u64);
        self.wpa_present_handshake = self.wpa_handshake_mask();
    }
}

impl TrackedComponent for Dot11Device {
    const RECORD_TYPE: &'static str = "dot11.device";
    const FIELDS: &'static [&'static str] = &[
        "dot11.device.typeset",
        "dot11.device.client_map",
        "dot11.device.num_client_aps",
        "dot11.device.advertised_ssid_map",
        "dot11.device.num_advertised_ssids",
        "dot11.device.responded_ssid_map",
        "dot11.device.num_responded_ssids",
        "dot11.device.probed_ssid_map",
        "dot11.device.num_probed_ssids",
        "dot11.device.associated_client_map",
        "dot11.device.num_associated_clients",
        "dot11.device.client_disconnects",
        "dot11.device.client_disconnects_last",
        "dot11.device.last_sequence",
        "dot11.device.bss_timestamp",
        "dot11.device.num_fragments",
        "dot11.device.num_retries",
        "dot11.device.datasize",
        "dot11.device.datasize_retry",
        "dot11.device.last_bssid",
        "dot11.device.last_beacon_timestamp",
        "dot11.device.eapol_m3_count",
        "dot11.device.eapol_m3_last",
        "dot11.device.wpa_handshake_list",
        "dot11.device.wpa_nonce_list",
        "dot11.device.wpa_anonce_list",
        "dot11.device.wpa_present_handshake",
        "dot11.device.ssid_beacon_packet",
        "dot11.device.pmkid_packet",
        "dot11.device.last_beaconed_ssid_record",
        "dot11.device.last_probed_ssid_record",
        "dot11.device.min_tx_power",
        "dot11.device.max_tx_power",
        "dot11.device.supported_channels",
        "dot11.device.link_measurement_capable",
        "dot11.device.neighbor_report_capable",
        "dot11.device.extended_capabilities",
        "dot11.device.beacon_fingerprint",
        "dot11.device.probe_fingerprint",
        "dot11.device.response_fingerprint",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eapol::EapolDirection;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn key(msg: u8, dir: EapolDirection, nonce: u8) -> EapolKeyRecord {
        EapolKeyRecord {
            time: ts(1_700_000_000 + msg as i64),
            direction: dir,
            message_num: msg,
            replay_counter: msg as u64,
            install: msg == 3,
            nonce: vec![nonce; 32],
            rsn_pmkid: None,
            frame: None,
        }
    }

    #[test]
    fn type_set_is_monotonic() {
        let mut dev = Dot11Device::new();
        dev.or_type_set(DeviceTypeSet::BEACON_AP);
        dev.or_type_set(DeviceTypeSet::CLIENT);
        dev.or_type_set(DeviceTypeSet::BEACON_AP);
        assert!(dev.type_set.contains(DeviceTypeSet::BEACON_AP));
        assert!(dev.type_set.contains(DeviceTypeSet::CLIENT));
        assert_eq!(
            dev.type_set.bits(),
            DeviceTypeSet::BEACON_AP.bits() | DeviceTypeSet::CLIENT.bits()
        );
    }

    #[test]
    fn derived_counters_track_live_collections() {
        let mut dev = Dot11Device::new();
        dev.refresh_derived();
        assert_eq!(dev.num_advertised_ssids, 0);
        assert_eq!(dev.num_client_aps, 0);

        dev.advertised_ssid_mut(SsidHash(1)).ssid = "one".into();
        dev.advertised_ssid_mut(SsidHash(2)).ssid = "two".into();
        dev.client_mut(MacAddr([2, 0, 0, 0, 0, 9]));
        dev.associate_client(MacAddr([2, 0, 0, 0, 0, 3]), DeviceKey(11));
        dev.refresh_derived();
        assert_eq!(dev.num_advertised_ssids, 2);
        assert_eq!(dev.num_client_aps, 1);
        assert_eq!(dev.num_associated_clients, 1);

        dev.advertised_ssid_map.as_mut().unwrap().remove(&SsidHash(1));
        dev.refresh_derived();
        assert_eq!(dev.num_advertised_ssids, 1);
    }

    #[test]
    fn identical_hash_updates_in_place() {
        let mut dev = Dot11Device::new();
        {
            let ssid = dev.advertised_ssid_mut(SsidHash(77));
            ssid.ssid = "Linksys".into();
            ssid.record_seen(ts(1_700_000_000));
        }
        {
            let ssid = dev.advertised_ssid_mut(SsidHash(77));
            ssid.record_seen(ts(1_700_000_100));
        }
        dev.refresh_derived();
        assert_eq!(dev.num_advertised_ssids, 1);
        let ssid = dev.advertised_ssid(&SsidHash(77)).unwrap();
        assert_eq!(ssid.first_time, ts(1_700_000_000));
        assert_eq!(ssid.last_time, ts(1_700_000_100));
    }

    #[test]
    fn handshake_mask_follows_history_and_m3_counts_retransmits() {
        let mut dev = Dot11Device::new();
        dev.append_wpa_key(key(1, EapolDirection::ApToClient, 0xa1));
        dev.append_wpa_key(key(2, EapolDirection::ClientToAp, 0xb2));
        assert!(dev.wpa_handshake_mask().contains(HandshakeMask::M1));
        assert!(dev.wpa_handshake_mask().contains(HandshakeMask::M2));
        assert!(!dev.wpa_handshake_mask().contains(HandshakeMask::M3));

        dev.append_wpa_key(key(3, EapolDirection::ApToClient, 0xc3));
        assert_eq!(dev.eapol_m3_count, 1);

        // Retransmitted M3: retained as its own record, counter +1, no
        // other bit disturbed.
        dev.append_wpa_key(key(3, EapolDirection::ApToClient, 0xc4));
        assert_eq!(dev.eapol_m3_count, 2);
        assert_eq!(dev.wpa_key_vec.as_ref().unwrap().len(), 4);
        let mask = dev.wpa_handshake_mask();
        assert!(mask.contains(HandshakeMask::M1));
        assert!(mask.contains(HandshakeMask::M2));
        assert!(mask.contains(HandshakeMask::M3));
        assert!(!mask.contains(HandshakeMask::M4));

        dev.append_wpa_key(key(4, EapolDirection::ClientToAp, 0xd4));
        assert!(dev.wpa_handshake_mask().is_complete());
    }

    #[test]
    fn condensed_nonces_route_by_direction() {
        let mut dev = Dot11Device::new();
        let m1 = key(1, EapolDirection::ApToClient, 0x01);
        let m2 = key(2, EapolDirection::ClientToAp, 0x02);
        dev.append_condensed_nonce(&m1);
        dev.append_condensed_nonce(&m2);
        assert_eq!(dev.wpa_anonce_vec.as_ref().unwrap().len(), 1);
        assert_eq!(dev.wpa_nonce_vec.as_ref().unwrap().len(), 1);
        assert_eq!(dev.wpa_anonce_vec.as_ref().unwrap()[0].nonce, vec![0x01; 32]);
        assert_eq!(dev.wpa_nonce_vec.as_ref().unwrap()[0].nonce, vec![0x02; 32]);
    }

    #[test]
    fn beacon_snapshot_is_once_per_lifetime() {
        let mut dev = Dot11Device::new();
        assert!(!dev.beacon_snapshot_needed());

        dev.set_snapshot_next_beacon(true);
        assert!(dev.beacon_snapshot_needed());

        dev.capture_beacon_packet(CapturedFrame {
            time: ts(1_700_000_000),
            dlt: 105,
            data: vec![0x80, 0x00, 0x01],
        });
        assert!(dev.beacon_packet_present());
        assert!(!dev.beacon_snapshot_needed());

        // Re-requesting can't make the query true again, and a second
        // capture doesn't replace the stored frame.
        dev.set_snapshot_next_beacon(true);
        assert!(!dev.beacon_snapshot_needed());
        dev.capture_beacon_packet(CapturedFrame {
            time: ts(1_700_000_500),
            dlt: 105,
            data: vec![0xff],
        });
        assert_eq!(dev.beacon_packet().unwrap().data, vec![0x80, 0x00, 0x01]);
    }

    #[test]
    fn pmkid_capture_is_opportunistic() {
        let mut dev = Dot11Device::new();
        assert!(dev.pmkid_needed());
        dev.capture_pmkid_packet(CapturedFrame {
            time: ts(1_700_000_000),
            dlt: 105,
            data: vec![1, 2, 3],
        });
        assert!(!dev.pmkid_needed());
        assert!(dev.pmkid_present());
    }

    #[test]
    fn weak_ssid_link_goes_stale_with_the_record() {
        let mut dev = Dot11Device::new();
        dev.advertised_ssid_mut(SsidHash(5)).ssid = "HomeNet".into();
        dev.last_beaconed_ssid = Some(SsidHash(5));
        assert_eq!(dev.last_beaconed_ssid_record().unwrap().ssid, "HomeNet");

        dev.advertised_ssid_map.as_mut().unwrap().remove(&SsidHash(5));
        assert!(dev.last_beaconed_ssid_record().is_none());
    }

    #[test]
    fn attach_base_links_once() {
        let mut dev = Dot11Device::new();
        assert!(dev.base_key().is_none());
        dev.attach_base(DeviceKey(99));
        assert_eq!(dev.base_key(), Some(DeviceKey(99)));
    }
}
