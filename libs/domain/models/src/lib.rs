// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE CABLE Y ENTIDADES PERSISTIDAS
 * =================================================================
 */

pub mod agent;
pub mod hardware;
pub mod livedata;
pub mod packetloss;
pub mod schedule;
pub mod speedtest;

pub use agent::{
    AgentHistoricalSnapshot, AgentInterface, AgentPeakStats, AgentResourceSnapshot,
    AgentSystemInfo, LiveAgentState, MonitorAgent, MonitorAgentDraft, SnapshotPeriod,
};
pub use hardware::{CpuStats, DiskStats, HardwareStats, MemoryStats, SystemInfo, TempReading};
pub use livedata::{AgentIdentity, MonitorLiveData, ServiceDescriptor, TrafficEyeball, AGENT_IDENTITY_TYPE, LIVE_DATA_PATH};
pub use packetloss::{
    PacketLossMonitor, PacketLossMonitorDraft, PacketLossProgress, PacketLossResult, RunPhase,
};
pub use schedule::{MonitorKind, Schedule, ScheduleDraft};
pub use speedtest::{
    PaginatedResponse, SpeedTestResult, SpeedUpdate, SpeedUpdateKind, TestOptions, TimeRange,
};
