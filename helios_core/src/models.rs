use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Margin before actual token expiry at which a cached token is considered
/// unusable.
pub const TOKEN_SAFETY_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Vendor identifier (stable, assigned by the admin surface).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub i64);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for VendorId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Owning-organization identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(pub Uuid);

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for OrgId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Vendor family implemented by a shipped adapter.
///
/// Adding a vendor means adding a variant here, implementing `VendorAdapter`
/// for it and registering the implementation in the startup registry; the
/// orchestrator, scheduler and sync services are untouched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorKind {
    Solarman,
    Growatt,
}

impl VendorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorKind::Solarman => "solarman",
            VendorKind::Growatt => "growatt",
        }
    }
}

impl fmt::Display for VendorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "solarman" => Ok(VendorKind::Solarman),
            "growatt" => Ok(VendorKind::Growatt),
            other => Err(Error::Configuration(format!(
                "unknown vendor kind '{other}'"
            ))),
        }
    }
}

/// A configured vendor integration.
///
/// Created by admin action (out of scope); this core only reads it and
/// refreshes its cached token via `TokenStore`. Never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorConfig {
    pub id: VendorId,
    pub display_name: String,
    pub kind: VendorKind,
    pub org_id: OrgId,
    /// Opaque vendor-specific secrets ("app_id", "app_secret", "email", ...).
    pub credentials: HashMap<String, String>,
    pub active: bool,
    /// Overrides the adapter's default API base URL when set.
    pub api_base: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VendorConfig {
    #[tracing::instrument(level = "debug", skip(credentials))]
    pub fn new(
        id: VendorId,
        display_name: impl Into<String> + fmt::Debug,
        kind: VendorKind,
        org_id: OrgId,
        credentials: HashMap<String, String>,
        now: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "vendor display_name is empty".to_string(),
            ));
        }
        let now = now.unwrap_or_else(Utc::now);
        Ok(Self {
            id,
            display_name,
            kind,
            org_id,
            credentials,
            active: true,
            api_base: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch a required credential, failing as `Configuration` when absent.
    pub fn credential(&self, key: &str) -> Result<&str> {
        self.credentials
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "vendor '{}' is missing credential '{key}'",
                    self.display_name
                ))
            })
    }
}

/// Cached bearer token for one vendor, with expiry tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl VendorToken {
    pub fn new(
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        refresh_token: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::InvalidInput("access_token is empty".to_string()));
        }
        Ok(Self {
            access_token,
            expires_at,
            refresh_token,
            updated_at: now,
        })
    }

    /// A token is usable only while `now < expires_at - safety_buffer`.
    pub fn is_usable(&self, now: DateTime<Utc>, safety_buffer: Duration) -> bool {
        let buffer = chrono::Duration::from_std(safety_buffer).unwrap_or(chrono::Duration::zero());
        now < self.expires_at - buffer
    }
}

/// Plant network/connectivity status as reported by the vendor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Online,
    Offline,
    Alerting,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

/// Snapshot of production metrics, all optional (vendor-dependent).
///
/// Power in kilowatts, energy in kilowatt-hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProductionSnapshot {
    pub current_power_kw: Option<f64>,
    pub energy_today_kwh: Option<f64>,
    pub energy_month_kwh: Option<f64>,
    pub energy_year_kwh: Option<f64>,
    pub energy_total_kwh: Option<f64>,
    pub performance_ratio: Option<f64>,
}

/// A normalized plant record as produced by an adapter, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlant {
    /// Vendor-native plant identifier ("station id").
    pub vendor_plant_id: String,
    pub name: String,
    pub capacity_kw: Option<f64>,
    pub location: Location,
    pub production: ProductionSnapshot,
    pub network_status: NetworkStatus,
}

impl NewPlant {
    pub fn new(
        vendor_plant_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let vendor_plant_id = vendor_plant_id.into();
        if vendor_plant_id.trim().is_empty() {
            return Err(Error::Normalization(
                "plant record has empty vendor_plant_id".to_string(),
            ));
        }
        let name = name.into();
        Ok(Self {
            vendor_plant_id,
            name,
            capacity_kw: None,
            location: Location::default(),
            production: ProductionSnapshot::default(),
            network_status: NetworkStatus::Unknown,
        })
    }
}

/// A persisted plant. `(vendor_id, vendor_plant_id)` is the only uniqueness
/// key; mutable fields are overwritten on every sync, identity never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub vendor_id: VendorId,
    pub vendor_plant_id: String,
    pub name: String,
    pub capacity_kw: Option<f64>,
    pub location: Location,
    pub production: ProductionSnapshot,
    pub network_status: NetworkStatus,
    pub last_synced_at: DateTime<Utc>,
}

impl Plant {
    pub fn from_new(vendor_id: VendorId, new: NewPlant, now: DateTime<Utc>) -> Self {
        Self {
            vendor_id,
            vendor_plant_id: new.vendor_plant_id,
            name: new.name,
            capacity_kw: new.capacity_kw,
            location: new.location,
            production: new.production,
            network_status: new.network_status,
            last_synced_at: now,
        }
    }

    /// Overwrite mutable fields from a fresh sync, preserving identity.
    pub fn apply(&mut self, new: NewPlant, now: DateTime<Utc>) {
        debug_assert_eq!(self.vendor_plant_id, new.vendor_plant_id);
        self.name = new.name;
        self.capacity_kw = new.capacity_kw;
        self.location = new.location;
        self.production = new.production;
        self.network_status = new.network_status;
        self.last_synced_at = now;
    }

    /// Whether `new` would change anything beyond the sync timestamp.
    pub fn differs_from(&self, new: &NewPlant) -> bool {
        self.name != new.name
            || self.capacity_kw != new.capacity_kw
            || self.location != new.location
            || self.production != new.production
            || self.network_status != new.network_status
    }
}

/// Four-level alert severity, ordered LOW < MEDIUM < HIGH < CRITICAL.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

/// A normalized alert record as produced by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    /// Vendor-native alert identifier.
    pub vendor_alert_id: String,
    /// Vendor-native id of the plant the alert belongs to, if reported.
    pub vendor_plant_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Free-form vendor metadata kept for downstream consumers.
    pub metadata: serde_json::Value,
}

impl NewAlert {
    pub fn downtime(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }
}

/// A persisted alert. Keyed by `(vendor_id, vendor_alert_id)`; created on
/// first sighting, updated on resync, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub vendor_id: VendorId,
    pub vendor_alert_id: String,
    pub vendor_plant_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Derived from start/end when the alert is closed, in whole seconds.
    pub downtime_secs: Option<i64>,
    pub metadata: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
}

impl Alert {
    pub fn from_new(vendor_id: VendorId, new: NewAlert, now: DateTime<Utc>) -> Self {
        let downtime_secs = new.downtime().map(|d| d.num_seconds());
        Self {
            vendor_id,
            vendor_alert_id: new.vendor_alert_id,
            vendor_plant_id: new.vendor_plant_id,
            title: new.title,
            description: new.description,
            severity: new.severity,
            status: new.status,
            started_at: new.started_at,
            ended_at: new.ended_at,
            downtime_secs,
            metadata: new.metadata,
            last_synced_at: now,
        }
    }

    /// Update status/severity/metadata/end-time from a resync.
    pub fn apply(&mut self, new: NewAlert, now: DateTime<Utc>) {
        debug_assert_eq!(self.vendor_alert_id, new.vendor_alert_id);
        self.downtime_secs = new.downtime().map(|d| d.num_seconds());
        self.title = new.title;
        self.description = new.description;
        self.severity = new.severity;
        self.status = new.status;
        self.ended_at = new.ended_at;
        self.metadata = new.metadata;
        self.last_synced_at = now;
    }

    pub fn differs_from(&self, new: &NewAlert) -> bool {
        self.title != new.title
            || self.description != new.description
            || self.severity != new.severity
            || self.status != new.status
            || self.ended_at != new.ended_at
            || self.metadata != new.metadata
    }
}

/// Per-organization automatic sync settings, read by the scheduler each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub org_id: OrgId,
    pub auto_sync_enabled: bool,
    /// Interval in minutes, bounded 1..=1440.
    pub interval_minutes: u32,
    /// Alerts older than this are not pulled.
    pub alert_sync_start: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SyncSettings {
    pub fn new(
        org_id: OrgId,
        auto_sync_enabled: bool,
        interval_minutes: u32,
        now: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if !(1..=1440).contains(&interval_minutes) {
            return Err(Error::InvalidInput(format!(
                "interval_minutes must be within 1..=1440, got {interval_minutes}"
            )));
        }
        Ok(Self {
            org_id,
            auto_sync_enabled,
            interval_minutes,
            alert_sync_start: None,
            updated_at: now.unwrap_or_else(Utc::now),
        })
    }
}

/// Optional filters for bulk alert retrieval.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    /// Substring match against the vendor's fault-type field.
    pub fault_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// What caused a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// Explicit request; bypasses the restricted window.
    Manual,
    /// Scheduler tick; gated by the restricted window.
    Scheduled,
}

/// Per-phase outcome for one vendor. Ephemeral: returned to the caller and
/// logged, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SyncResult {
    /// Records processed (created + updated + unchanged).
    pub synced: u64,
    pub created: u64,
    pub updated: u64,
    /// Records dropped by per-record normalization failures.
    pub skipped: u64,
    /// Total reported by the vendor, when it reports one.
    pub total: Option<u64>,
    pub error: Option<String>,
    /// Collected per-record errors (normalization skips).
    pub record_errors: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcomeStatus {
    /// Both phases completed.
    Full,
    /// One phase completed, the other failed.
    Partial,
    /// Authentication or both phases failed; nothing committed this run.
    Failed,
    /// A run for this vendor was already in flight.
    Skipped,
}

/// Aggregated outcome of one vendor's run (plant phase then alert phase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSyncOutcome {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub status: SyncOutcomeStatus,
    pub plants: Option<SyncResult>,
    pub alerts: Option<SyncResult>,
    pub error: Option<String>,
}

/// Cross-vendor summary of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub trigger: SyncTrigger,
    pub attempted: u64,
    pub succeeded: u64,
    pub partial: u64,
    pub failed: u64,
    pub plants_synced: u64,
    pub outcomes: Vec<VendorSyncOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Per-vendor view returned by the "sync status" surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSyncStatus {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub plants_last_synced_at: Option<DateTime<Utc>>,
    pub alerts_last_synced_at: Option<DateTime<Utc>>,
    pub settings: Option<SyncSettings>,
}

/// Granularity of a telemetry request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySpan {
    Day,
    Month,
    Year,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryQuery {
    pub vendor_plant_id: String,
    pub span: TelemetrySpan,
    /// Reference instant inside the requested day/month/year.
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub at: DateTime<Utc>,
    pub power_kw: Option<f64>,
    pub energy_kwh: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySeries {
    pub vendor_plant_id: String,
    pub span: TelemetrySpan,
    pub points: Vec<TelemetryPoint>,
}

/// Instantaneous reading for one plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeReading {
    pub vendor_plant_id: String,
    pub at: DateTime<Utc>,
    pub power_kw: Option<f64>,
    pub energy_today_kwh: Option<f64>,
    pub network_status: NetworkStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
    }

    #[test]
    fn vendor_kind_round_trips() {
        assert_eq!("solarman".parse::<VendorKind>().unwrap(), VendorKind::Solarman);
        assert_eq!("growatt".parse::<VendorKind>().unwrap(), VendorKind::Growatt);
        assert!(matches!(
            "acme".parse::<VendorKind>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn sync_settings_interval_is_bounded() {
        let org = OrgId(Uuid::new_v4());
        assert!(SyncSettings::new(org, true, 0, None).is_err());
        assert!(SyncSettings::new(org, true, 1441, None).is_err());
        assert!(SyncSettings::new(org, true, 15, None).is_ok());
        assert!(SyncSettings::new(org, true, 1440, None).is_ok());
    }

    #[test]
    fn token_usability_respects_safety_buffer() {
        let now = Utc::now();
        let token = VendorToken::new("t", now + chrono::Duration::minutes(4), None, now).unwrap();
        assert!(!token.is_usable(now, TOKEN_SAFETY_BUFFER));
        let token = VendorToken::new("t", now + chrono::Duration::minutes(6), None, now).unwrap();
        assert!(token.is_usable(now, TOKEN_SAFETY_BUFFER));
    }
}
