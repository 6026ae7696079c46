// [tests/mirror/libs/core_schedule/jitter_dispersion.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE DISPERSIÓN DE JITTER
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L1-MIRROR)
 * RESPONSABILIDAD: RANGOS UNIFORMES Y AISLAMIENTO ANTI-ESTAMPIDA
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use netronome_core_schedule::{JitterSource, ScheduleExpression, ThreadRngJitter};

#[test]
fn duration_jitter_stays_within_one_to_three_hundred_seconds() {
    let source = ThreadRngJitter;
    for _ in 0..2000 {
        let sample = source.duration_jitter().num_seconds();
        assert!((1..=300).contains(&sample), "duration jitter escaped range: {}", sample);
    }
}

#[test]
fn exact_jitter_stays_within_one_to_sixty_seconds() {
    let source = ThreadRngJitter;
    for _ in 0..2000 {
        let sample = source.exact_jitter().num_seconds();
        assert!((1..=60).contains(&sample), "exact jitter escaped range: {}", sample);
    }
}

#[test]
fn twin_monitors_with_identical_expressions_disperse() {
    // Cinco monitores gemelos habilitados en el mismo instante: el jitter
    // separa sus próximos disparos con probabilidad abrumadora.
    let source = ThreadRngJitter;
    let reference = Utc.with_ymd_and_hms(2025, 6, 16, 10, 0, 0).unwrap();
    let expression = ScheduleExpression::parse("60s").unwrap();

    let mut computed_fires: Vec<i64> = (0..5)
        .map(|_| expression.next_after(reference, &source).timestamp())
        .collect();

    computed_fires.sort_unstable();
    computed_fires.dedup();

    assert!(
        computed_fires.len() >= 2,
        "all five twins collided on the same second"
    );
}
