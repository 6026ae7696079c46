// [apps/server/src/handlers/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVER HANDLER REGISTRY
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO DE HANDLERS DE LA API HTTP
 * =================================================================
 */

pub mod agents;
pub mod packetloss;
pub mod schedules;
pub mod speedtest;
