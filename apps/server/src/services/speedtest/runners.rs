// [apps/server/src/services/speedtest/runners.rs]
/*!
 * =================================================================
 * APARATO: SPEED TEST RUNNERS
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: INVOCACIÓN DE speedtest / iperf3 / librespeed-cli
 *
 * Contrato común: `run(opciones) -> RunnerOutcome | fallo`. Cada hijo
 * corre bajo el plazo del servicio y se cosecha al cancelar.
 * =================================================================
 */

use netronome_domain_models::TestOptions;
use serde::Deserialize;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum RunnerFault {
    #[error("runner requires a server host")]
    MissingServerHost,
    #[error("runner subprocess fault: {0}")]
    Subprocess(String),
    #[error("runner output unparseable: {0}")]
    Parse(String),
}

/// Resultado normalizado de cualquier runner.
#[derive(Debug, Clone)]
pub struct RunnerOutcome {
    pub server_name: String,
    pub server_host: Option<String>,
    pub ping_ms: f64,
    pub jitter_ms: Option<f64>,
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

/// Despacho por las banderas de las opciones (`iperf` gana a `librespeed`).
#[instrument(skip(options))]
pub async fn run_for_options(options: &TestOptions) -> Result<RunnerOutcome, RunnerFault> {
    if options.use_iperf {
        run_iperf3(options).await
    } else if options.use_librespeed {
        run_librespeed(options).await
    } else {
        run_ookla(options).await
    }
}

async fn capture_json_output(mut command: Command) -> Result<Vec<u8>, RunnerFault> {
    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|fault| RunnerFault::Subprocess(fault.to_string()))?;

    if !output.status.success() {
        return Err(RunnerFault::Subprocess(format!(
            "exit {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(output.stdout)
}

// --- RUNNER NATIVO (CLI speedtest, JSON Ookla) ---

#[derive(Deserialize)]
struct OoklaDocument {
    ping: OoklaPing,
    download: OoklaTransfer,
    upload: OoklaTransfer,
    server: OoklaServer,
}

#[derive(Deserialize)]
struct OoklaPing {
    latency: f64,
    #[serde(default)]
    jitter: Option<f64>,
}

#[derive(Deserialize)]
struct OoklaTransfer {
    /// Bytes por segundo.
    bandwidth: f64,
}

#[derive(Deserialize)]
struct OoklaServer {
    name: String,
    #[serde(default)]
    host: Option<String>,
}

async fn run_ookla(options: &TestOptions) -> Result<RunnerOutcome, RunnerFault> {
    let mut command = Command::new("speedtest");
    command
        .arg("--accept-license")
        .arg("--accept-gdpr")
        .arg("--format=json");

    if let Some(server_id) = options.server_ids.first() {
        command.arg("--server-id").arg(server_id);
    }

    let raw = capture_json_output(command).await?;
    let document: OoklaDocument =
        serde_json::from_slice(&raw).map_err(|fault| RunnerFault::Parse(fault.to_string()))?;

    debug!("🏁 [SPEEDTEST]: Ookla run against [{}] decoded.", document.server.name);

    Ok(RunnerOutcome {
        server_name: document.server.name,
        server_host: document.server.host,
        ping_ms: document.ping.latency,
        jitter_ms: if options.enable_jitter {
            document.ping.jitter
        } else {
            None
        },
        download_mbps: if options.enable_download {
            document.download.bandwidth * 8.0 / 1_000_000.0
        } else {
            0.0
        },
        upload_mbps: if options.enable_upload {
            document.upload.bandwidth * 8.0 / 1_000_000.0
        } else {
            0.0
        },
    })
}

// --- RUNNER IPERF3 ---

#[derive(Deserialize)]
struct IperfDocument {
    end: IperfEnd,
}

#[derive(Deserialize)]
struct IperfEnd {
    #[serde(default)]
    sum_sent: Option<IperfSum>,
    #[serde(default)]
    sum_received: Option<IperfSum>,
}

#[derive(Deserialize)]
struct IperfSum {
    bits_per_second: f64,
}

async fn run_iperf3(options: &TestOptions) -> Result<RunnerOutcome, RunnerFault> {
    let server_host = options
        .server_host
        .as_deref()
        .ok_or(RunnerFault::MissingServerHost)?;

    // host[:puerto] — iperf3 separa el puerto en su propia bandera.
    let (bare_host, port) = match server_host.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => (host, Some(port)),
        _ => (server_host, None),
    };

    let mut command = Command::new("iperf3");
    command.arg("-c").arg(bare_host).arg("-J");
    if let Some(port) = port {
        command.arg("-p").arg(port);
    }

    let raw = capture_json_output(command).await?;
    let document: IperfDocument =
        serde_json::from_slice(&raw).map_err(|fault| RunnerFault::Parse(fault.to_string()))?;

    let upload_mbps = document
        .end
        .sum_sent
        .map(|sum| sum.bits_per_second / 1_000_000.0)
        .unwrap_or(0.0);
    let download_mbps = document
        .end
        .sum_received
        .map(|sum| sum.bits_per_second / 1_000_000.0)
        .unwrap_or(0.0);

    Ok(RunnerOutcome {
        server_name: options
            .server_name
            .clone()
            .unwrap_or_else(|| server_host.to_string()),
        server_host: Some(server_host.to_string()),
        // iperf3 no mide eco ICMP; la latencia queda fuera de este runner.
        ping_ms: 0.0,
        jitter_ms: None,
        download_mbps,
        upload_mbps,
    })
}

// --- RUNNER LIBRESPEED ---

#[derive(Deserialize)]
struct LibrespeedEntry {
    server: LibrespeedServer,
    ping: f64,
    #[serde(default)]
    jitter: Option<f64>,
    /// Mbps directos.
    download: f64,
    upload: f64,
}

#[derive(Deserialize)]
struct LibrespeedServer {
    name: String,
    #[serde(default)]
    url: Option<String>,
}

async fn run_librespeed(options: &TestOptions) -> Result<RunnerOutcome, RunnerFault> {
    let mut command = Command::new("librespeed-cli");
    command.arg("--json");

    if let Some(server_id) = options.server_ids.first() {
        command.arg("--server").arg(server_id);
    }

    let raw = capture_json_output(command).await?;
    let entries: Vec<LibrespeedEntry> =
        serde_json::from_slice(&raw).map_err(|fault| RunnerFault::Parse(fault.to_string()))?;

    let entry = entries
        .into_iter()
        .next()
        .ok_or_else(|| RunnerFault::Parse("empty librespeed result set".into()))?;

    Ok(RunnerOutcome {
        server_name: entry.server.name,
        server_host: entry.server.url,
        ping_ms: entry.ping,
        jitter_ms: if options.enable_jitter { entry.jitter } else { None },
        download_mbps: if options.enable_download { entry.download } else { 0.0 },
        upload_mbps: if options.enable_upload { entry.upload } else { 0.0 },
    })
}
