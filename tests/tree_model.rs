//! End-to-end exercises of the device tree: build a realistic aggregate,
//! refresh the derived counters, clone it for a reader, and verify the
//! clone is structurally isolated and the serialized form presence-aware.

use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, SeedableRng};

use dot11_tracker::{
    check_signature, AdvertisedSsid, CapturedFrame, ClientRecord, CryptSet, DeviceKey,
    DeviceTypeSet, Dot11Device, Dot11dRange, EapolDirection, EapolKeyRecord, IeTag, MacAddr,
    SsidHash, TrackedComponent, WpsInfo,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn nonce(rng: &mut impl Rng) -> Vec<u8> {
    let mut bytes = vec![0u8; 32];
    rng.fill(&mut bytes[..]);
    bytes
}

/// A device that has beaconed one SSID, answered one probe, been probed
/// for, served one client, and shown a partial handshake.
fn populated_device() -> Dot11Device {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let mut dev = Dot11Device::new();
    dev.attach_base(DeviceKey(4242));
    dev.or_type_set(DeviceTypeSet::BEACON_AP);
    dev.or_type_set(DeviceTypeSet::PROBE_AP);

    let ssid = dev.advertised_ssid_mut(SsidHash(0xabc1));
    ssid.ssid = "CoffeeNet".into();
    ssid.ssid_len = 9;
    ssid.beacon = true;
    ssid.channel = "6".into();
    ssid.crypt_set.insert(CryptSet::WPA_V2);
    ssid.crypt_set.insert(CryptSet::CCMP);
    ssid.crypt_set.insert(CryptSet::PSK);
    ssid.record_seen(ts(1_700_000_000));
    ssid.set_ie_tags(&[
        IeTag::new(0, b"CoffeeNet".to_vec()),
        IeTag::new(3, vec![6]),
        IeTag::new_vendor(221, 0x0050f2, 4, vec![0x10, 0x4a, 0x00, 0x01]),
    ]);
    ssid.wps = Some(WpsInfo {
        setup_state: 2,
        manufacturer: "Acme".into(),
        device_name: "acme-ap".into(),
        ..WpsInfo::default()
    });
    ssid.set_dot11d(
        "US",
        vec![Dot11dRange {
            start_channel: 1,
            num_channels: 11,
            max_power: 30,
        }],
    );
    dev.last_beaconed_ssid = Some(SsidHash(0xabc1));

    let responded = dev.responded_ssid_mut(SsidHash(0xabc2));
    responded.ssid = "CoffeeNet-Guest".into();
    responded.probe_response = true;
    responded.record_seen(ts(1_700_000_010));

    let probed = dev.probed_ssid_mut(SsidHash(0xabc3));
    probed.ssid = "HomeNet".into();
    probed.record_seen(ts(1_700_000_020));

    let client = dev.client_mut(MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
    client.record_seen(ts(1_700_000_030));
    client.add_datasize(1500);
    client.dhcp_host = Some("laptop-7".into());

    dev.associate_client(MacAddr([0x00, 0xaa, 0xbb, 0xcc, 0xdd, 0xee]), DeviceKey(7));

    for (msg, dir) in [
        (1u8, EapolDirection::ApToClient),
        (2, EapolDirection::ClientToAp),
    ] {
        let key = EapolKeyRecord {
            time: ts(1_700_000_040 + msg as i64),
            direction: dir,
            message_num: msg,
            replay_counter: msg as u64,
            install: false,
            nonce: nonce(&mut rng),
            rsn_pmkid: None,
            frame: None,
        };
        dev.append_condensed_nonce(&key);
        dev.append_wpa_key(key);
    }

    dev.set_snapshot_next_beacon(true);
    dev.capture_beacon_packet(CapturedFrame {
        time: ts(1_700_000_050),
        dlt: 105,
        data: vec![0x80, 0x00, 0x3a, 0x01],
    });

    dev.record_sequence(3111);
    dev.record_bss_timestamp(882_211_993);
    dev.set_last_bssid(MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
    dev.record_beacon_timestamp(ts(1_700_000_050));
    dev.record_assoc_capabilities(8, 17, vec![1, 6, 11, 36, 40]);
    dev.add_datasize(9000);
    dev.inc_retries();

    dev.refresh_derived();
    dev
}

#[test]
fn derived_counters_match_collection_sizes() {
    let dev = populated_device();
    assert_eq!(dev.num_advertised_ssids, 1);
    assert_eq!(dev.num_responded_ssids, 1);
    assert_eq!(dev.num_probed_ssids, 1);
    assert_eq!(dev.num_client_aps, 1);
    assert_eq!(dev.num_associated_clients, 1);
}

#[test]
fn clone_is_structurally_isolated() {
    let original = populated_device();
    let mut reader_copy = original.clone();

    // Mutate every collection on the clone.
    reader_copy.advertised_ssid_mut(SsidHash(0xffff)).ssid = "Injected".into();
    reader_copy
        .advertised_ssid_map
        .as_mut()
        .unwrap()
        .get_mut(&SsidHash(0xabc1))
        .unwrap()
        .ssid = "Tampered".into();
    reader_copy.probed_ssid_map.as_mut().unwrap().clear();
    reader_copy
        .client_mut(MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
        .add_datasize(1);
    reader_copy.append_wpa_key(EapolKeyRecord {
        time: ts(1_700_001_000),
        direction: EapolDirection::ApToClient,
        message_num: 3,
        replay_counter: 3,
        install: true,
        nonce: vec![9; 32],
        rsn_pmkid: None,
        frame: None,
    });
    reader_copy.refresh_derived();

    // The original tree and its contents are untouched.
    assert_eq!(original.num_advertised_ssids, 1);
    assert_eq!(
        original
            .advertised_ssid(&SsidHash(0xabc1))
            .unwrap()
            .ssid,
        "CoffeeNet"
    );
    assert_eq!(original.probed_ssid_map.as_ref().unwrap().len(), 1);
    assert_eq!(
        original
            .client(&MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
            .unwrap()
            .datasize,
        1500
    );
    assert_eq!(original.wpa_key_vec.as_ref().unwrap().len(), 2);
    assert!(!original.wpa_handshake_mask().contains(dot11_tracker::HandshakeMask::M3));
}

#[test]
fn clone_keeps_absent_collections_absent() {
    let mut dev = Dot11Device::new();
    dev.or_type_set(DeviceTypeSet::CLIENT);
    let copy = dev.clone();
    assert!(copy.client_map.is_none());
    assert!(copy.advertised_ssid_map.is_none());
    assert!(copy.wpa_key_vec.is_none());
    assert!(copy.beacon_packet().is_none());
}

#[test]
fn serialized_tree_is_presence_aware() {
    let mut empty = Dot11Device::new();
    empty.refresh_derived();
    let json = serde_json::to_value(&empty).unwrap();
    let obj = json.as_object().unwrap();
    // Never-materialized collections are absent, not empty.
    assert!(!obj.contains_key("dot11.device.client_map"));
    assert!(!obj.contains_key("dot11.device.wpa_handshake_list"));
    assert!(!obj.contains_key("dot11.device.supported_channels"));
    assert_eq!(obj["dot11.device.num_client_aps"], 0);

    let full = populated_device();
    let json = serde_json::to_value(&full).unwrap();
    let obj = json.as_object().unwrap();
    assert!(obj.contains_key("dot11.device.advertised_ssid_map"));
    assert!(obj.contains_key("dot11.device.ssid_beacon_packet"));
    assert_eq!(obj["dot11.device.num_advertised_ssids"], 1);
    assert_eq!(obj["dot11.device.wpa_present_handshake"], 0b0011);
}

#[test]
fn records_round_trip_through_their_wire_form() {
    let full = populated_device();
    let json = serde_json::to_string(&full).unwrap();
    let rebuilt: Dot11Device = serde_json::from_str(&json).unwrap();
    assert_eq!(rebuilt.num_advertised_ssids, 1);
    assert_eq!(
        rebuilt.advertised_ssid(&SsidHash(0xabc1)).unwrap().ssid,
        "CoffeeNet"
    );
    assert_eq!(rebuilt.wpa_key_vec.as_ref().unwrap().len(), 2);
    // Internal coordination state doesn't travel.
    assert!(rebuilt.base_key().is_none());
    assert!(!rebuilt.beacon_snapshot_needed());
}

#[test]
fn schema_signatures_gate_reconstruction() {
    assert!(check_signature::<Dot11Device>(Dot11Device::SIGNATURE).is_ok());
    assert!(check_signature::<AdvertisedSsid>(AdvertisedSsid::SIGNATURE).is_ok());
    assert!(check_signature::<ClientRecord>(Dot11Device::SIGNATURE).is_err());

    // Signatures are per-type; the two SSID record kinds don't alias.
    assert_ne!(AdvertisedSsid::SIGNATURE, dot11_tracker::ProbedSsid::SIGNATURE);
}
