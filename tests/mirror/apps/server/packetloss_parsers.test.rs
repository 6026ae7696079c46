// [tests/mirror/apps/server/packetloss_parsers.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE PARSERS DE SONDEO
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: DIALECTOS iputils, ALPINE, WINDOWS Y REPORTE MTR
 * =================================================================
 */

use netronome_server::services::packetloss::parsers;

const IPUTILS_FIXTURE: &str = "\
PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=11.4 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=12.1 ms
64 bytes from 8.8.8.8: icmp_seq=4 ttl=117 time=10.9 ms

--- 8.8.8.8 ping statistics ---
4 packets transmitted, 3 received, 25% packet loss, time 3004ms
rtt min/avg/max/mdev = 10.913/11.466/12.105/0.494 ms
";

const ALPINE_FIXTURE: &str = "\
PING example.net (93.184.216.34): 56 data bytes
64 bytes from 93.184.216.34: seq=0 ttl=56 time=1.2 ms

--- example.net ping statistics ---
3 packets transmitted, 3 packets received, 0% packet loss
round-trip min/avg/max = 1.2/3.4/5.6 ms
";

const WINDOWS_FIXTURE: &str = "\
Pinging 8.8.8.8 with 32 bytes of data:
Reply from 8.8.8.8: bytes=32 time=11ms TTL=117
Reply from 8.8.8.8: bytes=32 time=13ms TTL=117

Ping statistics for 8.8.8.8:
    Packets: Sent = 4, Received = 2, Lost = 2 (50% loss),
Approximate round trip times in milli-seconds:
    Minimum = 11ms, Maximum = 13ms, Average = 12ms
";

const MTR_FIXTURE: &str = r#"{
    "report": {
        "mtr": {"src": "command-center", "dst": "8.8.8.8", "tests": 10},
        "hubs": [
            {"count": 1, "host": "192.168.1.1", "Loss%": 0.0, "Snt": 10, "Last": 0.4, "Avg": 0.5, "Best": 0.3, "Wrst": 0.9, "StDev": 0.1},
            {"count": 2, "host": "10.0.0.1", "Loss%": 10.0, "Snt": 10, "Last": 4.1, "Avg": 4.4, "Best": 3.8, "Wrst": 5.2, "StDev": 0.4},
            {"count": 3, "host": "8.8.8.8", "Loss%": 20.0, "Snt": 10, "Last": 11.0, "Avg": 11.5, "Best": 10.9, "Wrst": 12.1, "StDev": 0.5}
        ]
    }
}"#;

#[test]
fn iputils_summary_and_rtt_decode() {
    let counts = parsers::parse_unix_counts(IPUTILS_FIXTURE).expect("counts");
    assert_eq!(counts.transmitted, 4);
    assert_eq!(counts.received, 3);
    assert_eq!(counts.loss_pct, 25.0);

    let rtt = parsers::parse_unix_rtt(IPUTILS_FIXTURE).expect("rtt");
    assert_eq!(rtt.min_ms, 10.913);
    assert_eq!(rtt.avg_ms, 11.466);
    assert_eq!(rtt.max_ms, 12.105);
    assert_eq!(rtt.stddev_ms, 0.494);
}

#[test]
fn alpine_round_trip_without_stddev_decodes_with_zero() {
    // Dialecto BusyBox: tres campos; stddev reportado como 0.
    let counts = parsers::parse_unix_counts(ALPINE_FIXTURE).expect("counts");
    assert_eq!(counts.transmitted, 3);
    assert_eq!(counts.received, 3);
    assert_eq!(counts.loss_pct, 0.0);

    let rtt = parsers::parse_unix_rtt(ALPINE_FIXTURE).expect("rtt");
    assert_eq!(rtt.min_ms, 1.2);
    assert_eq!(rtt.avg_ms, 3.4);
    assert_eq!(rtt.max_ms, 5.6);
    assert_eq!(rtt.stddev_ms, 0.0);
}

#[test]
fn windows_summary_and_rtt_decode() {
    let counts = parsers::parse_windows_counts(WINDOWS_FIXTURE).expect("counts");
    assert_eq!(counts.transmitted, 4);
    assert_eq!(counts.received, 2);
    assert_eq!(counts.loss_pct, 50.0);

    let rtt = parsers::parse_windows_rtt(WINDOWS_FIXTURE).expect("rtt");
    assert_eq!(rtt.min_ms, 11.0);
    assert_eq!(rtt.avg_ms, 12.0);
    assert_eq!(rtt.max_ms, 13.0);
    assert_eq!(rtt.stddev_ms, 0.0);
}

#[test]
fn mtr_report_yields_last_hop_figures_and_hop_count() {
    let summary = parsers::parse_mtr_report(MTR_FIXTURE).expect("mtr");

    assert_eq!(summary.hop_count, 3);
    assert_eq!(summary.counts.transmitted, 10);
    assert_eq!(summary.counts.received, 8);
    assert_eq!(summary.counts.loss_pct, 20.0);
    assert_eq!(summary.rtt.min_ms, 10.9);
    assert_eq!(summary.rtt.max_ms, 12.1);
}

#[test]
fn garbage_output_is_rejected_not_fabricated() {
    assert!(parsers::parse_unix_counts("segmentation fault").is_none());
    assert!(parsers::parse_unix_rtt("no statistics today").is_none());
    assert!(parsers::parse_mtr_report("{\"not\":\"a report\"}").is_none());
}

#[test]
fn reply_lines_are_detected_for_live_progress() {
    assert!(parsers::is_reply_line("64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=11.4 ms"));
    assert!(parsers::is_reply_line("Reply from 8.8.8.8: bytes=32 time=11ms TTL=117"));
    assert!(!parsers::is_reply_line("--- 8.8.8.8 ping statistics ---"));
    assert!(!parsers::is_reply_line("Request timed out."));
}
