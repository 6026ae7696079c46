// [tests/mirror/apps/server/live_cache.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CACHE VIVO DE AGENTES
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: FRESCURA DE CONEXIÓN Y CONSERVACIÓN DE LA TRAMA
 * =================================================================
 */

use netronome_domain_models::{MonitorLiveData, TrafficEyeball};
use netronome_server::state::live_cache::LiveCacheManager;

fn sample_frame(index: u64) -> MonitorLiveData {
    MonitorLiveData {
        index,
        seconds: index,
        rx: TrafficEyeball {
            ratestring: "1 Mbit/s".to_string(),
            bytespersecond: 125_000,
            ..TrafficEyeball::default()
        },
        tx: TrafficEyeball::default(),
    }
}

#[test]
fn unknown_agents_read_as_offline() {
    let cache = LiveCacheManager::new();
    let state = cache.snapshot(404);

    assert!(!state.connected);
    assert!(state.last_frame.is_none());
    assert!(state.updated_at.is_none());
}

#[test]
fn a_fresh_frame_reads_as_connected() {
    let cache = LiveCacheManager::new();
    cache.record_frame(1, sample_frame(10));

    let state = cache.snapshot(1);
    assert!(state.connected, "fresh frame within the liveness window");
    assert_eq!(state.last_frame.as_ref().map(|f| f.index), Some(10));
    assert!(state.updated_at.is_some());
}

#[test]
fn leaving_streaming_keeps_the_last_frame_for_fallback() {
    let cache = LiveCacheManager::new();
    cache.record_frame(2, sample_frame(33));

    // La sesión entra en Backoff: conectado cae, la trama permanece.
    cache.mark_streaming(2, false);

    let state = cache.snapshot(2);
    assert!(!state.connected);
    assert_eq!(state.last_frame.as_ref().map(|f| f.index), Some(33));
}

#[test]
fn newer_frames_overwrite_older_ones() {
    let cache = LiveCacheManager::new();
    cache.record_frame(3, sample_frame(1));
    cache.record_frame(3, sample_frame(2));

    let state = cache.snapshot(3);
    assert_eq!(state.last_frame.as_ref().map(|f| f.index), Some(2));
}

#[test]
fn removal_purges_every_trace_of_the_agent() {
    let cache = LiveCacheManager::new();
    cache.record_frame(4, sample_frame(7));
    cache.remove(4);

    let state = cache.snapshot(4);
    assert!(!state.connected);
    assert!(state.last_frame.is_none());
}
