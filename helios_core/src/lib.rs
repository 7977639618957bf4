//! Helios core: vendor-integration and synchronization engine.
//!
//! Ingests operational data (plant inventory, alerts, telemetry) from
//! heterogeneous solar-monitoring vendor APIs, normalizes it into a common
//! schema and persists it idempotently, on manual request and on a
//! timezone-aware recurring schedule. Storage is an opaque trait surface;
//! concrete vendor adapters live in `helios_integrations`.

pub mod adapter;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod sync;

pub use adapter::{
    AdapterRegistry, FetchedAlerts, FetchedPlants, SkippedRecord, VendorAdapter, VendorLogin,
};
pub use auth::AuthManager;
pub use config::HeliosConfig;
pub use error::{Error, Result};
pub use models::{
    Alert, AlertFilter, AlertSeverity, AlertStatus, Location, NetworkStatus, NewAlert, NewPlant,
    OrgId, Plant, ProductionSnapshot, RealtimeReading, SyncOutcomeStatus, SyncResult, SyncSettings,
    SyncSummary, SyncTrigger, TelemetryPoint, TelemetryQuery, TelemetrySeries, TelemetrySpan,
    VendorConfig, VendorId, VendorKind, VendorSyncOutcome, VendorSyncStatus, VendorToken,
};
pub use scheduler::{RestrictedWindow, SchedulerConfig, SyncScheduler};
pub use store::{
    AlertStore, PlantStore, SyncSettingsStore, TokenStore, UpsertOutcome, VendorStore,
};
pub use sync::{AlertSyncService, PlantSyncService, SyncOrchestrator};
