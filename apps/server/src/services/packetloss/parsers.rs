// [apps/server/src/services/packetloss/parsers.rs]
/*!
 * =================================================================
 * APARATO: PING & MTR OUTPUT PARSERS
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EXTRACCIÓN TOLERANTE DE MÉTRICAS DE SONDEO
 *
 * Dialectos soportados: ping de iputils, BusyBox/Alpine (round-trip
 * sin stddev), ping de Windows y el reporte JSON de `mtr --json`.
 * Un fallo de parseo descarta la ejecución; jamás inventa métricas.
 * =================================================================
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Resumen de conteos del sondeo.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeCounts {
    pub transmitted: i64,
    pub received: i64,
    pub loss_pct: f64,
}

/// Resumen de latencias. `stddev` queda en 0 en dialectos sin mdev.
#[derive(Debug, Clone, PartialEq)]
pub struct RttSummary {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub stddev_ms: f64,
}

/// Resumen extremo-a-extremo de un reporte MTR.
#[derive(Debug, Clone)]
pub struct MtrSummary {
    pub counts: ProbeCounts,
    pub rtt: RttSummary,
    pub hop_count: i64,
}

static UNIX_COUNTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d+)\s+packets transmitted,\s*(\d+)(?:\s+packets)?\s+received,.*?([\d.]+)%\s+packet loss",
    )
    .expect("static regex")
});

static UNIX_RTT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:rtt|round-trip)\s+min/avg/max(?:/(?:mdev|stddev|sdev))?\s*=\s*([\d.]+)/([\d.]+)/([\d.]+)(?:/([\d.]+))?\s*ms",
    )
    .expect("static regex")
});

static WINDOWS_COUNTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Sent\s*=\s*(\d+),\s*Received\s*=\s*(\d+),\s*Lost\s*=\s*(\d+)\s*\((\d+)%\s*loss\)")
        .expect("static regex")
});

static WINDOWS_RTT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Minimum\s*=\s*(\d+)ms,\s*Maximum\s*=\s*(\d+)ms,\s*Average\s*=\s*(\d+)ms")
        .expect("static regex")
});

/// Línea de respuesta viva (progreso durante la ejecución).
static REPLY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(bytes from|Reply from .*time[=<])").expect("static regex")
});

/// Conteos del resumen de ping Unix (iputils y BusyBox).
pub fn parse_unix_counts(output: &str) -> Option<ProbeCounts> {
    let captures = UNIX_COUNTS.captures(output)?;
    Some(ProbeCounts {
        transmitted: captures[1].parse().ok()?,
        received: captures[2].parse().ok()?,
        loss_pct: captures[3].parse().ok()?,
    })
}

/// Latencias del resumen de ping Unix. Alpine omite el cuarto campo.
pub fn parse_unix_rtt(output: &str) -> Option<RttSummary> {
    let captures = UNIX_RTT.captures(output)?;
    Some(RttSummary {
        min_ms: captures[1].parse().ok()?,
        avg_ms: captures[2].parse().ok()?,
        max_ms: captures[3].parse().ok()?,
        stddev_ms: captures
            .get(4)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0.0),
    })
}

/// Conteos del resumen de ping de Windows.
pub fn parse_windows_counts(output: &str) -> Option<ProbeCounts> {
    let captures = WINDOWS_COUNTS.captures(output)?;
    Some(ProbeCounts {
        transmitted: captures[1].parse().ok()?,
        received: captures[2].parse().ok()?,
        loss_pct: captures[4].parse().ok()?,
    })
}

/// Latencias del resumen de ping de Windows (enteros, sin stddev).
pub fn parse_windows_rtt(output: &str) -> Option<RttSummary> {
    let captures = WINDOWS_RTT.captures(output)?;
    Some(RttSummary {
        min_ms: captures[1].parse().ok()?,
        avg_ms: captures[3].parse().ok()?,
        max_ms: captures[2].parse().ok()?,
        stddev_ms: 0.0,
    })
}

/// Conteos en el dialecto del sistema operativo anfitrión.
pub fn parse_counts(output: &str) -> Option<ProbeCounts> {
    if cfg!(target_os = "windows") {
        parse_windows_counts(output).or_else(|| parse_unix_counts(output))
    } else {
        parse_unix_counts(output).or_else(|| parse_windows_counts(output))
    }
}

/// Latencias en el dialecto del sistema operativo anfitrión.
pub fn parse_rtt(output: &str) -> Option<RttSummary> {
    if cfg!(target_os = "windows") {
        parse_windows_rtt(output).or_else(|| parse_unix_rtt(output))
    } else {
        parse_unix_rtt(output).or_else(|| parse_windows_rtt(output))
    }
}

/// Detecta una línea de eco individual (para el progreso en vivo).
pub fn is_reply_line(line: &str) -> bool {
    REPLY_LINE.is_match(line)
}

// --- ESTRATO MTR ---

#[derive(Debug, Deserialize)]
struct MtrDocument {
    report: MtrReportBody,
}

#[derive(Debug, Deserialize)]
struct MtrReportBody {
    #[serde(default)]
    hubs: Vec<MtrHub>,
}

/// Un salto del reporte. Los nombres replican las claves de mtr.
#[derive(Debug, Deserialize)]
struct MtrHub {
    #[serde(rename = "Loss%", default)]
    loss_pct: f64,
    #[serde(rename = "Snt", default)]
    sent: i64,
    #[serde(rename = "Best", default)]
    best: f64,
    #[serde(rename = "Avg", default)]
    avg: f64,
    #[serde(rename = "Wrst", default)]
    worst: f64,
    #[serde(rename = "StDev", default)]
    stddev: f64,
}

/// Resumen extremo-a-extremo de `mtr --json`: la pérdida reportada es la
/// del último salto; las pérdidas por salto viven solo en el blob crudo.
pub fn parse_mtr_report(raw_json: &str) -> Option<MtrSummary> {
    let document: MtrDocument = serde_json::from_str(raw_json).ok()?;
    let hop_count = document.report.hubs.len() as i64;
    let last_hop = document.report.hubs.last()?;

    let received = ((last_hop.sent as f64) * (100.0 - last_hop.loss_pct) / 100.0).round() as i64;

    Some(MtrSummary {
        counts: ProbeCounts {
            transmitted: last_hop.sent,
            received,
            loss_pct: last_hop.loss_pct,
        },
        rtt: RttSummary {
            min_ms: last_hop.best,
            avg_ms: last_hop.avg,
            max_ms: last_hop.worst,
            stddev_ms: last_hop.stddev,
        },
        hop_count,
    })
}
