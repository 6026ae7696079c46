// [libs/core/schedule/src/expression.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULE EXPRESSION GRAMMAR
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: PARSE/RENDER DE EXPRESIONES Y CÁLCULO DE PRÓXIMO DISPARO
 *
 * Gramática:
 *   expr     := duration | exact
 *   duration := <entero><unidad>          ; unidad ∈ {s, m, h}
 *   exact    := "exact:" HH:MM ("," HH:MM)*
 *
 * Invariante: `next_after(e, t) > t` siempre.
 * =================================================================
 */

use crate::clock::JitterSource;
use chrono::{DateTime, Days, Duration, Local, TimeZone, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Expresión fuera de la gramática o con magnitudes fuera de rango.
    #[error("invalid schedule: {0}")]
    InvalidExpression(String),
}

/// Unidad declarada de una expresión de duración. Se conserva para que
/// `render` sea la identidad sobre entradas bien formadas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
}

impl DurationUnit {
    fn suffix(&self) -> char {
        match self {
            DurationUnit::Seconds => 's',
            DurationUnit::Minutes => 'm',
            DurationUnit::Hours => 'h',
        }
    }

    fn seconds_factor(&self) -> i64 {
        match self {
            DurationUnit::Seconds => 1,
            DurationUnit::Minutes => 60,
            DurationUnit::Hours => 3600,
        }
    }
}

/// Expresión de planificación evaluable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleExpression {
    /// Intervalo relativo: `t + d + duration_jitter`.
    Every { magnitude: i64, unit: DurationUnit },
    /// Horas de pared locales: el menor candidato `> t`, más `exact_jitter`.
    Exact { times: Vec<(u32, u32)> },
}

impl ScheduleExpression {
    /// Analiza una expresión. El mensaje de error siempre comienza con
    /// "invalid schedule" para su traducción directa a validación 400.
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScheduleError::InvalidExpression("empty expression".into()));
        }

        if let Some(times_segment) = trimmed.strip_prefix("exact:") {
            return Self::parse_exact(times_segment);
        }

        Self::parse_duration(trimmed)
    }

    fn parse_duration(segment: &str) -> Result<Self, ScheduleError> {
        let unit = match segment.chars().last() {
            Some('s') => DurationUnit::Seconds,
            Some('m') => DurationUnit::Minutes,
            Some('h') => DurationUnit::Hours,
            _ => {
                return Err(ScheduleError::InvalidExpression(format!(
                    "unknown duration unit in '{}'",
                    segment
                )))
            }
        };

        let magnitude_segment = &segment[..segment.len() - 1];
        let magnitude: i64 = magnitude_segment.parse().map_err(|_| {
            ScheduleError::InvalidExpression(format!("non-numeric magnitude in '{}'", segment))
        })?;

        if magnitude <= 0 {
            return Err(ScheduleError::InvalidExpression(format!(
                "magnitude must be positive in '{}'",
                segment
            )));
        }

        Ok(ScheduleExpression::Every { magnitude, unit })
    }

    fn parse_exact(segment: &str) -> Result<Self, ScheduleError> {
        let mut times = Vec::new();

        for token in segment.split(',') {
            let token = token.trim();
            let (hour_segment, minute_segment) = token.split_once(':').ok_or_else(|| {
                ScheduleError::InvalidExpression(format!("malformed wall-clock time '{}'", token))
            })?;

            let hour: u32 = hour_segment.parse().map_err(|_| {
                ScheduleError::InvalidExpression(format!("malformed hour '{}'", token))
            })?;
            let minute: u32 = minute_segment.parse().map_err(|_| {
                ScheduleError::InvalidExpression(format!("malformed minute '{}'", token))
            })?;

            if hour > 23 || minute > 59 {
                return Err(ScheduleError::InvalidExpression(format!(
                    "wall-clock time out of range '{}'",
                    token
                )));
            }

            times.push((hour, minute));
        }

        if times.is_empty() {
            return Err(ScheduleError::InvalidExpression("empty exact list".into()));
        }

        Ok(ScheduleExpression::Exact { times })
    }

    /// Inversa de `parse` sobre expresiones bien formadas.
    pub fn render(&self) -> String {
        match self {
            ScheduleExpression::Every { magnitude, unit } => {
                format!("{}{}", magnitude, unit.suffix())
            }
            ScheduleExpression::Exact { times } => {
                let rendered: Vec<String> = times
                    .iter()
                    .map(|(hour, minute)| format!("{:02}:{:02}", hour, minute))
                    .collect();
                format!("exact:{}", rendered.join(","))
            }
        }
    }

    /// Próximo instante de disparo estrictamente posterior a `reference`.
    ///
    /// - Duración `d`: `reference + d + duration_jitter`.
    /// - Exacta: el menor candidato local `> reference` de la lista; si todos
    ///   los horarios de hoy ya pasaron, rueda a mañana. Usa la zona horaria
    ///   local del proceso. Se añade `exact_jitter`.
    pub fn next_after(
        &self,
        reference: DateTime<Utc>,
        jitter: &dyn JitterSource,
    ) -> DateTime<Utc> {
        match self {
            ScheduleExpression::Every { magnitude, unit } => {
                reference
                    + Duration::seconds(magnitude * unit.seconds_factor())
                    + jitter.duration_jitter()
            }
            ScheduleExpression::Exact { times } => {
                let local_reference = reference.with_timezone(&Local);
                let reference_date = local_reference.date_naive();

                let mut best_candidate: Option<DateTime<Local>> = None;

                // Horizonte de 3 días: cubre listas cuyo único horario cae en
                // un hueco de DST el día siguiente.
                for day_offset in 0..3u64 {
                    let day = reference_date + Days::new(day_offset);

                    for (hour, minute) in times {
                        let Some(naive_candidate) = day.and_hms_opt(*hour, *minute, 0) else {
                            continue;
                        };
                        let Some(candidate) =
                            Local.from_local_datetime(&naive_candidate).earliest()
                        else {
                            continue;
                        };

                        if candidate > local_reference
                            && best_candidate.map_or(true, |best| candidate < best)
                        {
                            best_candidate = Some(candidate);
                        }
                    }

                    if best_candidate.is_some() {
                        break;
                    }
                }

                match best_candidate {
                    Some(candidate) => candidate.with_timezone(&Utc) + jitter.exact_jitter(),
                    // Inalcanzable con listas validadas; se preserva el
                    // invariante next_after > reference de todos modos.
                    None => reference + Duration::days(1) + jitter.exact_jitter(),
                }
            }
        }
    }
}
