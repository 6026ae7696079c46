// [tests/mirror/libs/domain_models/wire_contracts.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONTRATOS DE CABLE
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L2-MIRROR)
 * RESPONSABILIDAD: NOMBRES JSON BIT-ESTABLES DE LAS TRAMAS PÚBLICAS
 * =================================================================
 */

use netronome_domain_models::{
    AgentIdentity, MonitorLiveData, SpeedUpdate, SpeedUpdateKind, TestOptions,
};

/// Trama real de `vnstat --live --json` (campos recortados a los usados).
const VNSTAT_LIVE_FIXTURE: &str = r#"{
    "index": 42,
    "seconds": 43,
    "rx": {
        "ratestring": "1.21 Mbit/s",
        "bytespersecond": 151250,
        "packetspersecond": 118,
        "bytes": 151250,
        "packets": 118,
        "totalbytes": 987654321,
        "totalpackets": 1234567
    },
    "tx": {
        "ratestring": "240 kbit/s",
        "bytespersecond": 30000,
        "packetspersecond": 45,
        "bytes": 30000,
        "packets": 45,
        "totalbytes": 123456789,
        "totalpackets": 654321
    }
}"#;

#[test]
fn live_data_frame_decodes_the_vnstat_field_names() {
    let frame: MonitorLiveData = serde_json::from_str(VNSTAT_LIVE_FIXTURE).expect("fixture");

    assert_eq!(frame.index, 42);
    assert_eq!(frame.seconds, 43);
    assert_eq!(frame.rx.bytespersecond, 151_250);
    assert_eq!(frame.rx.ratestring, "1.21 Mbit/s");
    assert_eq!(frame.tx.packetspersecond, 45);
    assert_eq!(frame.tx.totalbytes, 123_456_789);
}

#[test]
fn live_data_frame_round_trips_bit_stable() {
    let frame: MonitorLiveData = serde_json::from_str(VNSTAT_LIVE_FIXTURE).expect("fixture");
    let rendered = serde_json::to_value(&frame).expect("render");

    assert_eq!(rendered["rx"]["bytespersecond"], 151_250);
    assert_eq!(rendered["tx"]["ratestring"], "240 kbit/s");
}

#[test]
fn test_options_speak_camel_case() {
    let options: TestOptions = serde_json::from_str(
        r#"{
            "enableDownload": true,
            "enableUpload": false,
            "enableJitter": true,
            "multiServer": false,
            "useIperf": true,
            "useLibrespeed": false,
            "serverIds": ["1234"],
            "serverHost": "iperf.example.net:5201"
        }"#,
    )
    .expect("camelCase contract");

    assert!(options.use_iperf);
    assert!(!options.enable_upload);
    assert_eq!(options.server_ids, vec!["1234".to_string()]);
    assert_eq!(options.runner_label(), "iperf3");

    let rendered = serde_json::to_value(&options).expect("render");
    assert!(rendered.get("enableDownload").is_some());
    assert!(rendered.get("useLibrespeed").is_some());
    assert!(rendered.get("serverHost").is_some());
}

#[test]
fn speed_update_exposes_type_and_camel_case_flags() {
    let update = SpeedUpdate {
        kind: SpeedUpdateKind::Download,
        server_name: "Example ISP".to_string(),
        speed: 512.5,
        progress: 40.0,
        is_complete: false,
        latency: Some(12.3),
        is_scheduled: true,
    };

    let rendered = serde_json::to_value(&update).expect("render");
    assert_eq!(rendered["type"], "download");
    assert_eq!(rendered["isComplete"], false);
    assert_eq!(rendered["isScheduled"], true);
    assert_eq!(rendered["serverName"], "Example ISP");
}

#[test]
fn agent_identity_uses_the_discovery_discriminator() {
    let identity: AgentIdentity = serde_json::from_str(
        r#"{"type": "netronome-agent", "version": "0.1.0", "hostname": "edge-01"}"#,
    )
    .expect("identity contract");

    assert!(identity.is_netronome_agent());

    let rendered = serde_json::to_value(&identity).expect("render");
    assert_eq!(rendered["type"], "netronome-agent");
}

#[test]
fn foreign_identity_documents_are_not_agents() {
    let identity: AgentIdentity = serde_json::from_str(
        r#"{"type": "prometheus-exporter", "version": "2.0", "hostname": "edge-02"}"#,
    )
    .expect("decodable");

    assert!(!identity.is_netronome_agent());
}
