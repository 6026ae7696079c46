// [libs/infra/agent-client/src/errors.rs]
/*!
 * =================================================================
 * APARATO: AGENT CLIENT ERROR CATALOG
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN DE FALLOS DE ENLACE CON AGENTES
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentClientError {
    /// Fallo de transporte: DNS, TCP, TLS o timeout del enlace.
    #[error("[AGENT_LINK_FAULT]: TRANSPORT_SEVERED -> {0}")]
    Transport(#[from] reqwest::Error),

    /// El agente respondió con un estado HTTP no exitoso.
    #[error("[AGENT_LINK_FAULT]: REMOTE_REJECTION -> HTTP_{0}")]
    RemoteRejection(u16),

    /// Cuerpo ilegible o contrato JSON violado.
    #[error("[AGENT_DECODE_FAULT]: PAYLOAD_DRIFT -> {0}")]
    Decode(String),

    /// El peer respondió pero no es un agente Netronome.
    #[error("[AGENT_IDENTITY_FAULT]: NOT_A_NETRONOME_AGENT")]
    NotAnAgent,
}
