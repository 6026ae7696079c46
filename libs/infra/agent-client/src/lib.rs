// [libs/infra/agent-client/src/lib.rs]
/*!
 * =================================================================
 * APARATO: AGENT CLIENT LIBRARY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ENLACE HTTP/SSE HACIA LA FLOTA DE AGENTES
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod sse;

pub use client::{AgentHttpClient, PeakRatesDocument};
pub use errors::AgentClientError;
pub use sse::SseFrameDecoder;
