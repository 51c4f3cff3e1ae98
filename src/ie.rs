//! Information-element inputs handed over by the external frame decoder.
//!
//! The decoder parses management frames; this model only stores the decoded
//! tag stream so an SSID record can be reconstructed exactly without
//! retaining the raw frame.

use serde::{Deserialize, Serialize};

use crate::schema::{fnv1a32, TrackedComponent};

/// One decoded information-element tag. Vendor tags (221) and extended tags
/// (255) carry the OUI / subtype that disambiguates them from each other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IeTag {
    #[serde(rename = "dot11.ietag.number")]
    pub tag_number: u8,
    #[serde(rename = "dot11.ietag.oui", skip_serializing_if = "Option::is_none")]
    pub tag_oui: Option<u32>,
    #[serde(rename = "dot11.ietag.oui_manuf", skip_serializing_if = "Option::is_none")]
    pub tag_oui_manuf: Option<String>,
    #[serde(
        rename = "dot11.ietag.vendor_or_sub",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag_vendor_or_sub: Option<i16>,
    /// Complete tag payload as it appeared on the air.
    #[serde(rename = "dot11.ietag.data")]
    pub data: Vec<u8>,
}

impl IeTag {
    pub fn new(tag_number: u8, data: Vec<u8>) -> Self {
        IeTag {
            tag_number,
            tag_oui: None,
            tag_oui_manuf: None,
            tag_vendor_or_sub: None,
            data,
        }
    }

    pub fn new_vendor(tag_number: u8, oui: u32, vendor_or_sub: i16, data: Vec<u8>) -> Self {
        IeTag {
            tag_number,
            tag_oui: Some(oui),
            tag_oui_manuf: None,
            tag_vendor_or_sub: Some(vendor_or_sub),
            data,
        }
    }

    /// Identity of this tag within a frame's tag set. Plain tags collapse to
    /// their tag number; vendor and extended tags fold in the OUI and
    /// subtype so distinct vendor elements don't alias.
    pub fn unique_id(&self) -> u32 {
        match (self.tag_oui, self.tag_vendor_or_sub) {
            (None, None) => self.tag_number as u32,
            (oui, sub) => {
                let mut hash = fnv1a32(0x811c_9dc5, &[self.tag_number]);
                hash = fnv1a32(hash, &oui.unwrap_or(0).to_be_bytes());
                fnv1a32(hash, &sub.unwrap_or(0).to_be_bytes())
            }
        }
    }
}

impl TrackedComponent for IeTag {
    const RECORD_TYPE: &'static str = "dot11.ietag";
    const FIELDS: &'static [&'static str] = &[
        "dot11.ietag.number",
        "dot11.ietag.oui",
        "dot11.ietag.oui_manuf",
        "dot11.ietag.vendor_or_sub",
        "dot11.ietag.data",
    ];
}

/// One 802.11d country-code power restriction range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot11dRange {
    #[serde(rename = "dot11.11d.start_channel")]
    pub start_channel: u32,
    #[serde(rename = "dot11.11d.num_channels")]
    pub num_channels: u32,
    #[serde(rename = "dot11.11d.tx_power")]
    pub max_power: i32,
}

impl TrackedComponent for Dot11dRange {
    const RECORD_TYPE: &'static str = "dot11.11d.range";
    const FIELDS: &'static [&'static str] = &[
        "dot11.11d.start_channel",
        "dot11.11d.num_channels",
        "dot11.11d.tx_power",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tags_use_the_tag_number() {
        let ssid = IeTag::new(0, b"CoffeeNet".to_vec());
        assert_eq!(ssid.unique_id(), 0);
        let ds = IeTag::new(3, vec![11]);
        assert_eq!(ds.unique_id(), 3);
    }

    #[test]
    fn vendor_tags_do_not_alias() {
        let wps = IeTag::new_vendor(221, 0x0050f2, 4, vec![0x10, 0x4a]);
        let wpa = IeTag::new_vendor(221, 0x0050f2, 1, vec![0x01, 0x00]);
        assert_ne!(wps.unique_id(), wpa.unique_id());
        assert_ne!(wps.unique_id(), 221);
    }
}
