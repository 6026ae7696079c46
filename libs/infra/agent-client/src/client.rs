// [libs/infra/agent-client/src/client.rs]
/*!
 * =================================================================
 * APARATO: AGENT HTTP CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SESIONES SSE, SONDAS DE IDENTIDAD E INSTANTÁNEAS
 * =================================================================
 */

use crate::errors::AgentClientError;
use chrono::{DateTime, Utc};
use netronome_domain_models::{AgentIdentity, HardwareStats, SystemInfo};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Timeout de las capturas de instantánea (no aplica al stream SSE).
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout de la sonda de identidad del descubrimiento.
const IDENTITY_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const API_KEY_HEADER: &str = "X-API-Key";

/// Picos de tasa publicados por `GET /stats/peaks` del agente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakRatesDocument {
    pub peak_rx_bps: i64,
    pub peak_tx_bps: i64,
    pub peak_rx_at: DateTime<Utc>,
    pub peak_tx_at: DateTime<Utc>,
}

/// Cliente por agente. Una instancia por supervisor; la sesión de red
/// subyacente reutiliza conexiones entre capturas.
pub struct AgentHttpClient {
    network_session_client: Client,
    agent_base_endpoint: String,
}

impl AgentHttpClient {
    /// Construye el cliente con la API key como cabecera por defecto.
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, AgentClientError> {
        let mut header_map = HeaderMap::new();

        if let Some(key) = api_key {
            let header_value = HeaderValue::from_str(key)
                .map_err(|_| AgentClientError::Decode("API_KEY_NOT_HEADER_SAFE".into()))?;
            header_map.insert(API_KEY_HEADER, header_value);
        }

        let network_session_client = Client::builder()
            .default_headers(header_map)
            .user_agent("netronome-server/agent-supervisor")
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            network_session_client,
            agent_base_endpoint: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Abre la sesión SSE de larga vida. El llamante consume
    /// `Response::bytes_stream` a través del `SseFrameDecoder`.
    #[instrument(skip(self))]
    pub async fn open_live_stream(&self) -> Result<Response, AgentClientError> {
        let target_url = format!("{}/events?stream=live-data", self.agent_base_endpoint);

        let response = self
            .network_session_client
            .get(&target_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(AgentClientError::RemoteRejection(response.status().as_u16()));
        }

        debug!("📡 [AGENT_LINK]: Live stream negotiated with {}.", self.agent_base_endpoint);
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn fetch_system_info(&self) -> Result<SystemInfo, AgentClientError> {
        self.fetch_json("/system/info").await
    }

    #[instrument(skip(self))]
    pub async fn fetch_hardware(&self) -> Result<HardwareStats, AgentClientError> {
        self.fetch_json("/system/hardware").await
    }

    #[instrument(skip(self))]
    pub async fn fetch_peaks(&self) -> Result<PeakRatesDocument, AgentClientError> {
        self.fetch_json("/stats/peaks").await
    }

    /// Volcado histórico crudo de vnstat, opcionalmente por interfaz.
    #[instrument(skip(self))]
    pub async fn fetch_historical(
        &self,
        interface: Option<&str>,
    ) -> Result<serde_json::Value, AgentClientError> {
        let path = match interface {
            Some(name) => format!("/export/historical?interface={}", name),
            None => "/export/historical".to_string(),
        };
        self.fetch_json(&path).await
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, AgentClientError> {
        let target_url = format!("{}{}", self.agent_base_endpoint, path);

        let response = self
            .network_session_client
            .get(&target_url)
            .timeout(SNAPSHOT_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(AgentClientError::RemoteRejection(response.status().as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|fault| AgentClientError::Decode(fault.to_string()))
    }

    /// Sonda de identidad del descubrimiento: `GET /netronome/info` con
    /// timeout corto. Exige content-type JSON y `type == "netronome-agent"`.
    #[instrument(skip(probe_client))]
    pub async fn probe_identity(
        probe_client: &Client,
        host: &str,
        port: u16,
    ) -> Result<AgentIdentity, AgentClientError> {
        let target_url = format!("http://{}:{}/netronome/info", host, port);

        let response = probe_client
            .get(&target_url)
            .timeout(IDENTITY_PROBE_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(AgentClientError::RemoteRejection(response.status().as_u16()));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        if !is_json {
            return Err(AgentClientError::NotAnAgent);
        }

        let identity: AgentIdentity = response
            .json()
            .await
            .map_err(|fault| AgentClientError::Decode(fault.to_string()))?;

        if !identity.is_netronome_agent() {
            return Err(AgentClientError::NotAnAgent);
        }

        Ok(identity)
    }
}
