// [tests/mirror/libs/core_schedule/expression_grammar.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE GRAMÁTICA DE EXPRESIONES
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L1-MIRROR)
 * RESPONSABILIDAD: LEYES PARSE/RENDER Y FRONTERAS DE HORA EXACTA
 * =================================================================
 */

use chrono::{DateTime, Duration, Local, TimeZone, Timelike, Utc};
use netronome_core_schedule::{JitterSource, ScheduleExpression};

/// Jitter determinista para fronteras reproducibles.
struct FrozenJitter {
    duration_seconds: i64,
    exact_seconds: i64,
}

impl JitterSource for FrozenJitter {
    fn duration_jitter(&self) -> Duration {
        Duration::seconds(self.duration_seconds)
    }

    fn exact_jitter(&self) -> Duration {
        Duration::seconds(self.exact_seconds)
    }
}

fn local_instant(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2025, 6, 16, hour, minute, second)
        .earliest()
        .expect("fixture instant must exist")
        .with_timezone(&Utc)
}

#[test]
fn parse_then_render_is_identity_on_well_formed_expressions() {
    for expression_text in ["60s", "1m", "1h", "90m", "exact:23:59", "exact:00:00,12:30"] {
        let parsed = ScheduleExpression::parse(expression_text).expect("well-formed");
        assert_eq!(parsed.render(), expression_text, "round-trip drift on {}", expression_text);
    }
}

#[test]
fn malformed_expressions_are_rejected_as_invalid_schedule() {
    for expression_text in [
        "", "60", "60x", "0s", "-5m", "s", "exact:", "exact:24:00", "exact:12:60",
        "exact:1260", "every hour",
    ] {
        let fault = ScheduleExpression::parse(expression_text).expect_err("must reject");
        assert!(
            fault.to_string().starts_with("invalid schedule"),
            "error label drifted for {}: {}",
            expression_text,
            fault
        );
    }
}

#[test]
fn duration_next_after_adds_interval_plus_jitter() {
    let jitter = FrozenJitter { duration_seconds: 7, exact_seconds: 1 };
    let reference = Utc.with_ymd_and_hms(2025, 6, 16, 10, 0, 0).unwrap();

    let parsed = ScheduleExpression::parse("1m").unwrap();
    let next = parsed.next_after(reference, &jitter);

    assert_eq!(next, reference + Duration::seconds(60 + 7));
    assert!(next > reference);
}

#[test]
fn exact_just_before_the_listed_time_fires_within_the_next_minute() {
    // 23:58:59 local con exact:23:59 => disparo en [23:59:01, 24:00:00].
    let jitter = FrozenJitter { duration_seconds: 1, exact_seconds: 1 };
    let reference = local_instant(23, 58, 59);

    let parsed = ScheduleExpression::parse("exact:23:59").unwrap();
    let next = parsed.next_after(reference, &jitter);

    assert!(next > reference);
    let elapsed = next - reference;
    assert!(
        elapsed >= Duration::seconds(2) && elapsed <= Duration::seconds(61),
        "unexpected gap: {}s",
        elapsed.num_seconds()
    );

    let next_local = next.with_timezone(&Local);
    assert_eq!((next_local.hour(), next_local.minute()), (23, 59));
}

#[test]
fn exact_just_after_midnight_rolls_to_tomorrow() {
    // 00:00:01 local con exact:00:00 => mañana, no un disparo inmediato.
    let jitter = FrozenJitter { duration_seconds: 1, exact_seconds: 5 };
    let reference = local_instant(0, 0, 1);

    let parsed = ScheduleExpression::parse("exact:00:00").unwrap();
    let next = parsed.next_after(reference, &jitter);

    let elapsed = next - reference;
    assert!(
        elapsed > Duration::hours(23),
        "must roll to tomorrow; got {}s",
        elapsed.num_seconds()
    );
}

#[test]
fn exact_picks_the_smallest_future_candidate_from_the_list() {
    let jitter = FrozenJitter { duration_seconds: 1, exact_seconds: 3 };
    let reference = local_instant(11, 0, 0);

    let parsed = ScheduleExpression::parse("exact:09:00,12:30,18:00").unwrap();
    let next = parsed.next_after(reference, &jitter).with_timezone(&Local);

    assert_eq!((next.hour(), next.minute()), (12, 30));
}

#[test]
fn next_after_is_always_strictly_greater_than_the_reference() {
    let jitter = FrozenJitter { duration_seconds: 1, exact_seconds: 1 };

    for expression_text in ["1s", "1h", "exact:00:00", "exact:23:59"] {
        let parsed = ScheduleExpression::parse(expression_text).unwrap();
        for second in [0, 1, 30, 59] {
            let reference = local_instant(23, 59, second);
            assert!(
                parsed.next_after(reference, &jitter) > reference,
                "invariant broken for {} at :{:02}",
                expression_text,
                second
            );
        }
    }
}
