// [tests/mirror/apps/agent/broadcaster_drop.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE DIFUSIÓN SIN BLOQUEO
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: SUSCRIPTOR LENTO PIERDE TRAMAS; EL RÁPIDO, NINGUNA
 * =================================================================
 */

use netronome_agent::broadcaster::LiveBroadcaster;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

const PRODUCED_FRAMES: usize = 200;
const SUBSCRIBER_BUFFER: usize = 100;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_blocked_subscriber_never_stalls_the_producer() {
    let broadcaster = Arc::new(LiveBroadcaster::new());

    // Suscriptor bloqueado: jamás drena su canal.
    let (_blocked_guard, mut blocked_receiver) = broadcaster.subscribe();
    // Suscriptor atento: drena concurrentemente.
    let (_responsive_guard, mut responsive_receiver) = broadcaster.subscribe();

    let (ingress_sender, ingress_receiver) = mpsc::channel::<String>(SUBSCRIBER_BUFFER);
    let (_shutdown_sender, shutdown_receiver) = watch::channel(false);

    let broadcaster_task =
        tokio::spawn(Arc::clone(&broadcaster).run(ingress_receiver, shutdown_receiver));

    let drain_task = tokio::spawn(async move {
        let mut collected = Vec::new();
        while let Some(frame) = responsive_receiver.recv().await {
            collected.push(frame);
        }
        collected
    });

    // Productor: 200 tramas completas, numeradas. El yield por trama deja
    // drenar al suscriptor atento; el bloqueado nunca lee.
    for sequence in 0..PRODUCED_FRAMES {
        ingress_sender
            .send(format!("frame-{:04}", sequence))
            .await
            .expect("broadcaster must keep draining");
        tokio::task::yield_now().await;
    }
    drop(ingress_sender); // cierra el ingreso; el bucle de fan-out termina

    broadcaster_task.await.expect("broadcaster task");
    let responsive_frames = drain_task.await.expect("drain task");

    // El suscriptor atento recibió TODO, en orden de producción.
    assert_eq!(responsive_frames.len(), PRODUCED_FRAMES);
    for (sequence, frame) in responsive_frames.iter().enumerate() {
        assert_eq!(frame, &format!("frame-{:04}", sequence), "order drift at {}", sequence);
    }

    // El bloqueado conserva como máximo su buffer; el resto se descartó.
    let mut blocked_frames = Vec::new();
    while let Ok(frame) = blocked_receiver.try_recv() {
        blocked_frames.push(frame);
    }
    assert!(
        blocked_frames.len() <= SUBSCRIBER_BUFFER,
        "blocked subscriber overflowed its bound: {}",
        blocked_frames.len()
    );
    assert!(!blocked_frames.is_empty(), "the first frames fit in the buffer");

    // Lo recibido es un prefijo con huecos: subsecuencia estricta del
    // productor, siempre en orden.
    let mut previous_sequence: i64 = -1;
    for frame in &blocked_frames {
        let sequence: i64 = frame.trim_start_matches("frame-").parse().expect("frame tag");
        assert!(sequence > previous_sequence, "reordering detected at {}", frame);
        previous_sequence = sequence;
    }
}

#[tokio::test]
async fn dropped_receivers_are_purged_from_the_registry() {
    let broadcaster = Arc::new(LiveBroadcaster::new());

    let (guard_one, receiver_one) = broadcaster.subscribe();
    let (_guard_two, _receiver_two) = broadcaster.subscribe();
    assert_eq!(broadcaster.subscriber_count(), 2);

    // La baja explícita ocurre al soltar el resguardo (desconexión SSE).
    drop(receiver_one);
    drop(guard_one);
    assert_eq!(broadcaster.subscriber_count(), 1);
}
