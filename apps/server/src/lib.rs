// [apps/server/src/lib.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME SERVER LIBRARY
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: CENTRO DE MANDO (C3, C4, C6, C7 + API HTTP)
 * =================================================================
 */

pub mod config;
pub mod errors;
pub mod handlers;
pub mod kernel;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use kernel::ServerKernel;

pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
