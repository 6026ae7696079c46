// [tests/mirror/apps/agent/peak_tracker.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL RASTREADOR DE PICOS
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: MONOTONÍA DE MÁXIMOS Y MARCAS DE TIEMPO
 * =================================================================
 */

use netronome_agent::peaks::PeakTracker;
use netronome_domain_models::{MonitorLiveData, TrafficEyeball};

fn frame(rx_bps: u64, tx_bps: u64) -> MonitorLiveData {
    MonitorLiveData {
        index: 0,
        seconds: 1,
        rx: TrafficEyeball {
            bytespersecond: rx_bps,
            ..TrafficEyeball::default()
        },
        tx: TrafficEyeball {
            bytespersecond: tx_bps,
            ..TrafficEyeball::default()
        },
    }
}

#[test]
fn peaks_rise_with_new_highs() {
    let tracker = PeakTracker::new();

    tracker.observe(&frame(1_000, 500));
    tracker.observe(&frame(9_000, 200));

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.peak_rx_bps, 9_000);
    assert_eq!(snapshot.peak_tx_bps, 500);
}

#[test]
fn lower_readings_never_regress_the_peaks() {
    let tracker = PeakTracker::new();

    tracker.observe(&frame(50_000, 70_000));
    tracker.observe(&frame(10, 10));
    tracker.observe(&frame(0, 0));

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.peak_rx_bps, 50_000);
    assert_eq!(snapshot.peak_tx_bps, 70_000);
}

#[test]
fn a_new_peak_advances_only_its_own_timestamp() {
    let tracker = PeakTracker::new();

    tracker.observe(&frame(1_000, 1_000));
    let first = tracker.snapshot();

    std::thread::sleep(std::time::Duration::from_millis(10));
    tracker.observe(&frame(2_000, 500));
    let second = tracker.snapshot();

    assert!(second.peak_rx_at > first.peak_rx_at, "rx timestamp must advance");
    assert_eq!(second.peak_tx_at, first.peak_tx_at, "tx timestamp must hold");
}
