// [apps/agent/src/lib.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME AGENT LIBRARY
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: RUNTIME DEL AGENTE REMOTO (C5)
 * =================================================================
 */

pub mod broadcaster;
pub mod config;
pub mod disks;
pub mod hardware;
pub mod http;
pub mod peaks;
pub mod runtime;
pub mod tailscale;
pub mod vnstat;

pub use config::{AgentConfig, TailscaleMethod, TailscaleSettings};
pub use runtime::AgentRuntime;

/// Versión publicada en el documento de identidad del descubrimiento.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");
