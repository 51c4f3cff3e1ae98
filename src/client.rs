//! Client association records: one device's observed behavior as a client
//! of one BSSID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mac::{DeviceKey, MacAddr};
use crate::schema::TrackedComponent;
use crate::ssid::CryptSet;

/// Geographic position attached opportunistically to a client record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "dot11.location.lat")]
    pub lat: f64,
    #[serde(rename = "dot11.location.lon")]
    pub lon: f64,
    #[serde(rename = "dot11.location.alt", skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

/// Observed client-of-BSSID behavior. A device accumulates one of these per
/// BSSID it has acted as a client toward; counters only ever go up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(rename = "dot11.client.bssid")]
    pub bssid: MacAddr,
    /// Key of the BSSID's own record in the external device tracker, once
    /// the tracker has resolved it.
    #[serde(rename = "dot11.client.bssid_key", skip_serializing_if = "Option::is_none")]
    pub bssid_key: Option<DeviceKey>,

    #[serde(rename = "dot11.client.first_time")]
    pub first_time: DateTime<Utc>,
    #[serde(rename = "dot11.client.last_time")]
    pub last_time: DateTime<Utc>,

    #[serde(rename = "dot11.client.tx_cryptset")]
    pub tx_crypt_set: CryptSet,
    #[serde(rename = "dot11.client.rx_cryptset")]
    pub rx_crypt_set: CryptSet,

    #[serde(rename = "dot11.client.dhcp_host", skip_serializing_if = "Option::is_none")]
    pub dhcp_host: Option<String>,
    #[serde(rename = "dot11.client.dhcp_vendor", skip_serializing_if = "Option::is_none")]
    pub dhcp_vendor: Option<String>,
    #[serde(rename = "dot11.client.eap_identity", skip_serializing_if = "Option::is_none")]
    pub eap_identity: Option<String>,
    #[serde(rename = "dot11.client.cdp_device", skip_serializing_if = "Option::is_none")]
    pub cdp_device: Option<String>,
    #[serde(rename = "dot11.client.cdp_port", skip_serializing_if = "Option::is_none")]
    pub cdp_port: Option<String>,

    #[serde(rename = "dot11.client.decrypted")]
    pub decrypted: bool,

    #[serde(rename = "dot11.client.datasize")]
    pub datasize: u64,
    #[serde(rename = "dot11.client.datasize_retry")]
    pub datasize_retry: u64,
    #[serde(rename = "dot11.client.num_fragments")]
    pub num_fragments: u64,
    #[serde(rename = "dot11.client.num_retries")]
    pub num_retries: u64,

    #[serde(rename = "dot11.client.location", skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl ClientRecord {
    pub fn new(bssid: MacAddr) -> Self {
        ClientRecord {
            bssid,
            bssid_key: None,
            first_time: DateTime::UNIX_EPOCH,
            last_time: DateTime::UNIX_EPOCH,
            tx_crypt_set: CryptSet::empty(),
            rx_crypt_set: CryptSet::empty(),
            dhcp_host: None,
            dhcp_vendor: None,
            eap_identity: None,
            cdp_device: None,
            cdp_port: None,
            decrypted: false,
            datasize: 0,
            datasize_retry: 0,
            num_fragments: 0,
            num_retries: 0,
            location: None,
        }
    }

    pub fn record_seen(&mut self, time: DateTime<Utc>) {
        if self.first_time == DateTime::UNIX_EPOCH {
            self.first_time = time;
        }
        self.last_time = time;
    }

    // Accumulators saturate; they never wrap back toward zero.

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
}

impl TrackedComponent for ClientRecord {
    const RECORD_TYPE: &'static str = "dot11.client";
    const FIELDS: &'static [&'static str] = &[
        "dot11.client.bssid",
        "dot11.client.bssid_key",
        "dot11.client.first_time",
        "dot11.client.last_time",
        "dot11.client.tx_cryptset",
        "dot11.client.rx_cryptset",
        "dot11.client.dhcp_host",
        "dot11.client.dhcp_vendor",
        "dot11.client.eap_identity",
        "dot11.client.cdp_device",
        "dot11.client.cdp_port",
        "dot11.client.decrypted",
        "dot11.client.datasize",
        "dot11.client.datasize_retry",
        "dot11.client.num_fragments",
        "dot11.client.num_retries",
        "dot11.client.location",
    ];
}
