// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME PERSISTENCE ADAPTER
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CLIENTE LIBSQL, ESQUEMA Y REPOSITORIOS
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::StorageClient;
pub use errors::DbError;
