//! SSID identity records: one record per distinct SSID content observed
//! from a device, whether advertised, responded, or probed for.
//!
//! Identity is the externally computed content hash. A byte-identical SSID
//! seen again updates the existing record in place; it never duplicates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ie::{Dot11dRange, IeTag};
use crate::mac::{MacAddr, SsidHash};
use crate::schema::{fnv1a32, TrackedComponent};

/// Cryptographic capability bitset advertised for an SSID, one named bit
/// per cipher / key-management option.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CryptSet(u64);

impl CryptSet {
    pub const WEP: CryptSet = CryptSet(1 << 0);
    pub const TKIP: CryptSet = CryptSet(1 << 1);
    pub const CCMP: CryptSet = CryptSet(1 << 2);
    pub const GCMP: CryptSet = CryptSet(1 << 3);
    pub const WPA_V1: CryptSet = CryptSet(1 << 4);
    pub const WPA_V2: CryptSet = CryptSet(1 << 5);
    pub const WPA_V3: CryptSet = CryptSet(1 << 6);
    pub const PSK: CryptSet = CryptSet(1 << 7);
    pub const PSK_SHA256: CryptSet = CryptSet(1 << 8);
    pub const PSK_FT: CryptSet = CryptSet(1 << 9);
    pub const SAE: CryptSet = CryptSet(1 << 10);
    pub const EAP: CryptSet = CryptSet(1 << 11);
    pub const OWE: CryptSet = CryptSet(1 << 12);
    pub const WPS: CryptSet = CryptSet(1 << 13);

    pub const fn empty() -> Self {
        CryptSet(0)
    }

    pub fn insert(&mut self, other: CryptSet) {
        self.0 |= other.0;
    }

    pub fn contains(&self, other: CryptSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Debug for CryptSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CryptSet({:#x})", self.0)
    }
}

/// WPS metadata exposed by a device, materialized only once observed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WpsInfo {
    #[serde(rename = "dot11.wps.state")]
    pub setup_state: u32,
    #[serde(rename = "dot11.wps.manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "dot11.wps.device_name")]
    pub device_name: String,
    #[serde(rename = "dot11.wps.model_name")]
    pub model_name: String,
    #[serde(rename = "dot11.wps.model_number")]
    pub model_number: String,
    #[serde(rename = "dot11.wps.serial_number")]
    pub serial_number: String,
    #[serde(rename = "dot11.wps.uuid_e", skip_serializing_if = "Option::is_none")]
    pub uuid_e: Option<Vec<u8>>,
}

impl TrackedComponent for WpsInfo {
    const RECORD_TYPE: &'static str = "dot11.wps";
    const FIELDS: &'static [&'static str] = &[
        "dot11.wps.state",
        "dot11.wps.manufacturer",
        "dot11.wps.device_name",
        "dot11.wps.model_name",
        "dot11.wps.model_number",
        "dot11.wps.serial_number",
        "dot11.wps.uuid_e",
    ];
}

/// OWE transition-mode companion identity, present only on OWE networks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OweInfo {
    #[serde(rename = "dot11.advertisedssid.owe_ssid")]
    pub ssid: String,
    #[serde(rename = "dot11.advertisedssid.owe_ssid_len")]
    pub ssid_len: u32,
    #[serde(rename = "dot11.advertisedssid.owe_bssid")]
    pub bssid: MacAddr,
}

/// 802.11e QBSS channel-load report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QbssLoad {
    #[serde(rename = "dot11.advertisedssid.dot11e_qbss_stations")]
    pub stations: u16,
    #[serde(rename = "dot11.advertisedssid.dot11e_channel_utilization_perc")]
    pub channel_load: f64,
}

/// SSID advertised by a device via beacon or probe response. Responded
/// SSIDs reuse this record type, held in the device's responded map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvertisedSsid {
    #[serde(rename = "dot11.advertisedssid.ssid")]
    pub ssid: String,
    /// Declared length; can differ from the text for cloaked or truncated
    /// SSIDs.
    #[serde(rename = "dot11.advertisedssid.ssidlen")]
    pub ssid_len: u32,
    #[serde(rename = "dot11.advertisedssid.ssid_hash")]
    pub hash: SsidHash,
    #[serde(rename = "dot11.advertisedssid.cloaked")]
    pub cloaked: bool,
    /// Seen in a beacon.
    #[serde(rename = "dot11.advertisedssid.beacon")]
    pub beacon: bool,
    /// Seen in a probe response.
    #[serde(rename = "dot11.advertisedssid.probe_response")]
    pub probe_response: bool,

    #[serde(rename = "dot11.advertisedssid.channel")]
    pub channel: String,
    #[serde(rename = "dot11.advertisedssid.ht_mode")]
    pub ht_mode: String,
    #[serde(rename = "dot11.advertisedssid.ht_center_1")]
    pub ht_center_1: u64,
    #[serde(rename = "dot11.advertisedssid.ht_center_2")]
    pub ht_center_2: u64,

    #[serde(rename = "dot11.advertisedssid.first_time")]
    pub first_time: DateTime<Utc>,
    #[serde(rename = "dot11.advertisedssid.last_time")]
    pub last_time: DateTime<Utc>,

    #[serde(
        rename = "dot11.advertisedssid.beacon_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub beacon_info: Option<String>,

    #[serde(rename = "dot11.advertisedssid.crypt_set")]
    pub crypt_set: CryptSet,
    #[serde(rename = "dot11.advertisedssid.wpa_mfp_required")]
    pub wpa_mfp_required: bool,
    #[serde(rename = "dot11.advertisedssid.wpa_mfp_supported")]
    pub wpa_mfp_supported: bool,

    #[serde(rename = "dot11.advertisedssid.maxrate")]
    pub maxrate: f64,
    #[serde(rename = "dot11.advertisedssid.beaconrate")]
    pub beaconrate: u32,
    #[serde(rename = "dot11.advertisedssid.beacons_sec")]
    pub beacons_sec: u32,
    #[serde(rename = "dot11.advertisedssid.ietag_checksum")]
    pub ietag_checksum: u32,

    #[serde(
        rename = "dot11.advertisedssid.owe",
        skip_serializing_if = "Option::is_none"
    )]
    pub owe: Option<OweInfo>,

    #[serde(
        rename = "dot11.advertisedssid.dot11d_country",
        skip_serializing_if = "Option::is_none"
    )]
    pub dot11d_country: Option<String>,
    #[serde(
        rename = "dot11.advertisedssid.dot11d_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub dot11d_ranges: Option<Vec<Dot11dRange>>,

    #[serde(
        rename = "dot11.advertisedssid.wps",
        skip_serializing_if = "Option::is_none"
    )]
    pub wps: Option<WpsInfo>,

    #[serde(rename = "dot11.advertisedssid.dot11r_mobility")]
    pub dot11r_mobility: bool,
    #[serde(rename = "dot11.advertisedssid.dot11r_mobility_domain_id")]
    pub dot11r_mobility_domain: u16,

    #[serde(
        rename = "dot11.advertisedssid.dot11e_qbss",
        skip_serializing_if = "Option::is_none"
    )]
    pub qbss: Option<QbssLoad>,

    #[serde(
        rename = "dot11.advertisedssid.ccx_txpower",
        skip_serializing_if = "Option::is_none"
    )]
    pub ccx_txpower: Option<u8>,
    #[serde(rename = "dot11.advertisedssid.cisco_client_mfp")]
    pub cisco_client_mfp: bool,

    /// Tag type codes in the order they appeared in the most recent frame.
    #[serde(rename = "dot11.advertisedssid.ie_tag_list")]
    pub ie_tag_list: Vec<u32>,
    /// Tag contents keyed by unique tag id, enough to reconstruct the frame
    /// composition without retaining the raw frame.
    #[serde(rename = "dot11.advertisedssid.ie_tag_content")]
    pub ie_tag_content: BTreeMap<u32, IeTag>,
}

impl AdvertisedSsid {
    /// Fresh record for `hash`; the frame path fills in content and times.
    pub fn new(hash: SsidHash) -> Self {
        AdvertisedSsid {
            ssid: String::new(),
            ssid_len: 0,
            hash,
            cloaked: false,
            beacon: false,
            probe_response: false,
            channel: String::new(),
            ht_mode: String::new(),
            ht_center_1: 0,
            ht_center_2: 0,
            first_time: DateTime::UNIX_EPOCH,
            last_time: DateTime::UNIX_EPOCH,
            beacon_info: None,
            crypt_set: CryptSet::empty(),
            wpa_mfp_required: false,
            wpa_mfp_supported: false,
            maxrate: 0.0,
            beaconrate: 0,
            beacons_sec: 0,
            ietag_checksum: 0,
            owe: None,
            dot11d_country: None,
            dot11d_ranges: None,
            wps: None,
            dot11r_mobility: false,
            dot11r_mobility_domain: 0,
            qbss: None,
            ccx_txpower: None,
            cisco_client_mfp: false,
            ie_tag_list: Vec::new(),
            ie_tag_content: BTreeMap::new(),
        }
    }

    /// Update the sighting window. The first observation pins `first_time`;
    /// every observation advances `last_time`.
    pub fn record_seen(&mut self, time: DateTime<Utc>) {
        if self.first_time == DateTime::UNIX_EPOCH {
            self.first_time = time;
        }
        self.last_time = time;
    }

    pub fn inc_beacons_sec(&mut self) {
        self.beacons_sec = self.beacons_sec.saturating_add(1);
    }

    /// Replace the stored tag order and content with the tag stream of the
    /// most recently parsed frame. This is a wholesale replacement, not a
    /// merge; the record always reflects the latest frame composition.
    pub fn set_ie_tags(&mut self, tags: &[IeTag]) {
        self.ie_tag_list.clear();
        self.ie_tag_content.clear();
        let mut csum = 0x811c_9dc5;
        for tag in tags {
            let id = tag.unique_id();
            self.ie_tag_list.push(id);
            self.ie_tag_content.insert(id, tag.clone());
            csum = fnv1a32(csum, &[tag.tag_number]);
            csum = fnv1a32(csum, &tag.data);
        }
        self.ietag_checksum = csum;
    }

    /// 802.11d country information from the most recent beacon.
    pub fn set_dot11d(&mut self, country: &str, ranges: Vec<Dot11dRange>) {
        self.dot11d_country = Some(country.to_owned());
        self.dot11d_ranges = Some(ranges);
    }
}

impl TrackedComponent for AdvertisedSsid {
    const RECORD_TYPE: &'static str = "dot11.advertisedssid";
    const FIELDS: &'static [&'static str] = &[
        "dot11.advertisedssid.ssid",
        "dot11.advertisedssid.ssidlen",
        "dot11.advertisedssid.ssid_hash",
        "dot11.advertisedssid.cloaked",
        "dot11.advertisedssid.beacon",
        "dot11.advertisedssid.probe_response",
        "dot11.advertisedssid.channel",
        "dot11.advertisedssid.ht_mode",
        "dot11.advertisedssid.ht_center_1",
        "dot11.advertisedssid.ht_center_2",
        "dot11.advertisedssid.first_time",
        "dot11.advertisedssid.last_time",
        "dot11.advertisedssid.beacon_info",
        "dot11.advertisedssid.crypt_set",
        "dot11.advertisedssid.wpa_mfp_required",
        "dot11.advertisedssid.wpa_mfp_supported",
        "dot11.advertisedssid.maxrate",
        "dot11.advertisedssid.beaconrate",
        "dot11.advertisedssid.beacons_sec",
        "dot11.advertisedssid.ietag_checksum",
        "dot11.advertisedssid.owe",
        "dot11.advertisedssid.dot11d_country",
        "dot11.advertisedssid.dot11d_list",
        "dot11.advertisedssid.wps",
        "dot11.advertisedssid.dot11r_mobility",
        "dot11.advertisedssid.dot11r_mobility_domain_id",
        "dot11.advertisedssid.dot11e_qbss",
        "dot11.advertisedssid.ccx_txpower",
        "dot11.advertisedssid.cisco_client_mfp",
        "dot11.advertisedssid.ie_tag_list",
        "dot11.advertisedssid.ie_tag_content",
    ];
}

/// SSID a device has probed for as a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbedSsid {
    #[serde(rename = "dot11.probedssid.ssid")]
    pub ssid: String,
    #[serde(rename = "dot11.probedssid.ssidlen")]
    pub ssid_len: u32,
    #[serde(rename = "dot11.probedssid.ssid_hash")]
    pub hash: SsidHash,
    /// Target of a directed probe; zero for wildcard probes.
    #[serde(rename = "dot11.probedssid.bssid")]
    pub bssid: MacAddr,

    #[serde(rename = "dot11.probedssid.first_time")]
    pub first_time: DateTime<Utc>,
    #[serde(rename = "dot11.probedssid.last_time")]
    pub last_time: DateTime<Utc>,

    #[serde(rename = "dot11.probedssid.crypt_set")]
    pub crypt_set: CryptSet,
    #[serde(rename = "dot11.probedssid.wpa_mfp_required")]
    pub wpa_mfp_required: bool,
    #[serde(rename = "dot11.probedssid.wpa_mfp_supported")]
    pub wpa_mfp_supported: bool,

    #[serde(rename = "dot11.probedssid.dot11r_mobility")]
    pub dot11r_mobility: bool,
    #[serde(rename = "dot11.probedssid.dot11r_mobility_domain_id")]
    pub dot11r_mobility_domain: u16,

    #[serde(rename = "dot11.probedssid.ie_tag_list")]
    pub ie_tag_list: Vec<u32>,

    #[serde(
        rename = "dot11.probedssid.wps",
        skip_serializing_if = "Option::is_none"
    )]
    pub wps: Option<WpsInfo>,
}

impl ProbedSsid {
    pub fn new(hash: SsidHash) -> Self {
        ProbedSsid {
            ssid: String::new(),
            ssid_len: 0,
            hash,
            bssid: MacAddr::ZERO,
            first_time: DateTime::UNIX_EPOCH,
            last_time: DateTime::UNIX_EPOCH,
            crypt_set: CryptSet::empty(),
            wpa_mfp_required: false,
            wpa_mfp_supported: false,
            dot11r_mobility: false,
            dot11r_mobility_domain: 0,
            ie_tag_list: Vec::new(),
            wps: None,
        }
    }

    pub fn record_seen(&mut self, time: DateTime<Utc>) {
        if self.first_time == DateTime::UNIX_EPOCH {
            self.first_time = time;
        }
        self.last_time = time;
    }

    pub fn set_ie_tags(&mut self, tags: &[IeTag]) {
        self.ie_tag_list.clear();
        for tag in tags {
            self.ie_tag_list.push(tag.unique_id());
        }
    }
}

impl TrackedComponent for ProbedSsid {
    const RECORD_TYPE: &'static str = "dot11.probedssid";
    const FIELDS: &'static [&'static str] = &[
        "dot11.probedssid.ssid",
        "dot11.probedssid.ssidlen",
        "dot11.probedssid.ssid_hash",
        "dot11.probedssid.bssid",
        "dot11.probedssid.first_time",
        "dot11.probedssid.last_time",
        "dot11.probedssid.crypt_set",
        "dot11.probedssid.wpa_mfp_required",
        "dot11.probedssid.wpa_mfp_supported",
        "dot11.probedssid.dot11r_mobility",
        "dot11.probedssid.dot11r_mobility_domain_id",
        "dot11.probedssid.ie_tag_list",
        "dot11.probedssid.wps",
    ];
}
