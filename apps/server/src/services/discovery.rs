// [apps/server/src/services/discovery.rs]
/*!
 * =================================================================
 * APARATO: TAILSCALE DISCOVERY SERVICE
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ENUMERACIÓN DE PEERS, SONDA DE IDENTIDAD Y UPSERT
 *
 * Idempotente por diseño: el upsert es por URL canónica y una nueva
 * pasada sobre el mismo conjunto de peers no crea filas nuevas.
 * =================================================================
 */

use crate::config::DiscoverySettings;
use crate::services::supervisor::AgentFleetManager;
use netronome_domain_models::MonitorAgent;
use netronome_infra_agent_client::AgentHttpClient;
use netronome_infra_db::repositories::AgentRepository;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Peer visible en la malla.
#[derive(Debug, Clone)]
pub struct MeshPeer {
    pub hostname: String,
    pub address: String,
    pub online: bool,
}

#[derive(Debug, Deserialize)]
struct TailscaleStatusDocument {
    #[serde(rename = "Peer", default)]
    peers: HashMap<String, TailscalePeerNode>,
}

#[derive(Debug, Deserialize)]
struct TailscalePeerNode {
    #[serde(rename = "HostName", default)]
    host_name: String,
    #[serde(rename = "TailscaleIPs", default)]
    tailscale_ips: Vec<String>,
    #[serde(rename = "Online", default)]
    online: bool,
}

/// Peers de la malla según el tailscaled del sistema.
pub async fn enumerate_mesh_peers() -> Result<Vec<MeshPeer>, String> {
    let output = Command::new("tailscale")
        .arg("status")
        .arg("--json")
        .output()
        .await
        .map_err(|fault| format!("tailscale binary unavailable: {}", fault))?;

    if !output.status.success() {
        return Err(format!("tailscale status exited with {}", output.status));
    }

    let document: TailscaleStatusDocument = serde_json::from_slice(&output.stdout)
        .map_err(|fault| format!("tailscale status undecodable: {}", fault))?;

    Ok(document
        .peers
        .into_values()
        .filter_map(|peer| {
            let address = peer.tailscale_ips.into_iter().next()?;
            Some(MeshPeer {
                hostname: peer.host_name,
                address,
                online: peer.online,
            })
        })
        .collect())
}

pub struct DiscoveryService {
    agents: Arc<AgentRepository>,
    fleet: Arc<AgentFleetManager>,
    settings: DiscoverySettings,
    probe_client: reqwest::Client,
}

impl DiscoveryService {
    pub fn new(
        agents: Arc<AgentRepository>,
        fleet: Arc<AgentFleetManager>,
        settings: DiscoverySettings,
    ) -> Self {
        let probe_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .user_agent("netronome-server/discovery")
            .build()
            .unwrap_or_default();

        Self {
            agents,
            fleet,
            settings,
            probe_client,
        }
    }

    /// Ticker de descubrimiento; una pasada por intervalo.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.settings.enabled {
            info!("🛰️  [DISCOVERY]: Disabled by configuration.");
            return;
        }

        let cadence = Duration::from_secs(self.settings.interval_seconds.max(30));
        info!("🛰️  [DISCOVERY]: Ticker online (every {}s).", cadence.as_secs());

        loop {
            self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(cadence) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("🛰️  [DISCOVERY]: Ticker closed.");
    }

    /// Una pasada completa: enumerar, filtrar, sondear, upsert.
    #[instrument(skip(self))]
    pub async fn run_once(&self) {
        let peers = match enumerate_mesh_peers().await {
            Ok(peers) => peers,
            Err(fault) => {
                warn!("🛰️  [DISCOVERY]: Peer enumeration failed: {}.", fault);
                return;
            }
        };

        let mut upserted = 0usize;

        for peer in peers {
            if !peer.online {
                continue;
            }

            if let Some(prefix) = &self.settings.prefix {
                if !peer.hostname.starts_with(prefix.as_str()) {
                    continue;
                }
            }

            match AgentHttpClient::probe_identity(&self.probe_client, &peer.address, self.settings.port)
                .await
            {
                Ok(identity) => {
                    let canonical_url =
                        MonitorAgent::canonical_url(&peer.address, self.settings.port);

                    match self
                        .agents
                        .upsert_discovered(&identity.hostname, &canonical_url, &peer.hostname)
                        .await
                    {
                        Ok(agent) => {
                            upserted += 1;
                            if agent.enabled {
                                // Idempotente: si ya hay supervisor, no-op.
                                self.fleet.start_agent(agent).await;
                            }
                        }
                        Err(fault) => {
                            warn!("🛰️  [DISCOVERY]: Upsert failed for {}: {}.", peer.hostname, fault);
                        }
                    }
                }
                Err(fault) => {
                    debug!("🛰️  [DISCOVERY]: Peer {} is not an agent: {}.", peer.hostname, fault);
                }
            }
        }

        debug!("🛰️  [DISCOVERY]: Pass complete ({} agents upserted).", upserted);
    }
}
