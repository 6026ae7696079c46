// [apps/server/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVER SERVICES REGISTRY
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO DE SERVICIOS Y DAEMONS DEL SERVIDOR
 * =================================================================
 */

pub mod discovery;
pub mod event_bus;
pub mod notifier;
pub mod packetloss;
pub mod scheduler;
pub mod speedtest;
pub mod supervisor;

pub use discovery::DiscoveryService;
pub use event_bus::{EventBus, MonitorEvent};
pub use notifier::NotificationDispatcher;
pub use packetloss::PacketLossEngine;
pub use scheduler::SchedulerService;
pub use speedtest::SpeedTestService;
pub use supervisor::AgentFleetManager;
