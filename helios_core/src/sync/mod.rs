//! Synchronization engine: per-phase services and the cross-vendor
//! orchestrator.

pub mod alerts;
pub mod orchestrator;
pub mod plants;

pub use alerts::AlertSyncService;
pub use orchestrator::SyncOrchestrator;
pub use plants::PlantSyncService;
