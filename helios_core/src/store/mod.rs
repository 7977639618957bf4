//! Opaque persistence surface consumed by the sync core.
//!
//! Backends implement these traits; the engine never talks to a database
//! directly. `memory` ships reference implementations used by tests and by
//! embedders without a durable store.

pub mod memory;

use crate::models::{
    Alert, NewAlert, NewPlant, OrgId, Plant, SyncSettings, VendorConfig, VendorId, VendorToken,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of an upsert keyed by a stable identity tuple.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// Row existed and no mutable field changed; only the sync timestamp moved.
    Unchanged,
}

/// Read access to configured vendors.
#[async_trait]
pub trait VendorStore: Send + Sync {
    async fn list_active_vendors(&self) -> Result<Vec<VendorConfig>>;

    async fn get_vendor(&self, id: VendorId) -> Result<Option<VendorConfig>>;
}

/// Single source of truth for cached vendor tokens.
///
/// Writes go through compare-and-swap so concurrent re-authentications for
/// the same vendor cannot silently overwrite each other: the loser observes
/// the mismatch and re-reads the winner's token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, vendor_id: VendorId) -> Result<Option<VendorToken>>;

    /// Store `next` only if the currently-persisted token still equals
    /// `previous`. Returns `true` when the swap happened.
    async fn compare_and_swap_token(
        &self,
        vendor_id: VendorId,
        previous: Option<&VendorToken>,
        next: &VendorToken,
    ) -> Result<bool>;
}

/// Plant persistence. `(vendor_id, vendor_plant_id)` is the only key;
/// sync never deletes.
#[async_trait]
pub trait PlantStore: Send + Sync {
    async fn get_plant(&self, vendor_id: VendorId, vendor_plant_id: &str)
        -> Result<Option<Plant>>;

    async fn list_plants(&self, vendor_id: VendorId) -> Result<Vec<Plant>>;

    /// Insert if absent, else overwrite mutable fields in place.
    async fn upsert_plant(
        &self,
        vendor_id: VendorId,
        plant: NewPlant,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome>;

    /// Most recent plant sync instant for the vendor, if any.
    async fn plants_last_synced_at(&self, vendor_id: VendorId) -> Result<Option<DateTime<Utc>>>;
}

/// Alert persistence. `(vendor_id, vendor_alert_id)` is the only key;
/// resync updates status/severity/metadata/end-time, never deletes.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get_alert(&self, vendor_id: VendorId, vendor_alert_id: &str)
        -> Result<Option<Alert>>;

    async fn list_alerts(&self, vendor_id: VendorId) -> Result<Vec<Alert>>;

    async fn upsert_alert(
        &self,
        vendor_id: VendorId,
        alert: NewAlert,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome>;

    async fn alerts_last_synced_at(&self, vendor_id: VendorId) -> Result<Option<DateTime<Utc>>>;
}

/// Per-organization scheduler settings.
#[async_trait]
pub trait SyncSettingsStore: Send + Sync {
    async fn get_settings(&self, org_id: OrgId) -> Result<Option<SyncSettings>>;

    async fn put_settings(&self, settings: SyncSettings) -> Result<()>;

    /// All stored settings rows; the scheduler filters for enabled orgs.
    async fn list_settings(&self) -> Result<Vec<SyncSettings>>;
}
