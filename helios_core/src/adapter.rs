//! Vendor adapter capability set and the startup registry.
//!
//! An adapter bridges one vendor family's API to the common schema. The
//! engine only ever sees this trait; concrete implementations live in
//! `helios_integrations` (or embedder code) and are registered once at
//! startup. Resolution of an unregistered kind fails as `Configuration`
//! before any network call.

use crate::models::{
    AlertFilter, NewAlert, NewPlant, RealtimeReading, TelemetryQuery, TelemetrySeries,
    VendorConfig, VendorKind,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Successful vendor login response, in vendor-neutral terms.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorLogin {
    pub access_token: String,
    /// Vendor-stated validity; used when the token itself carries no expiry.
    pub expires_in: Option<std::time::Duration>,
    pub refresh_token: Option<String>,
}

/// A record the adapter fetched but could not normalize. The batch goes on;
/// the caller records the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// Vendor-native identifier, when one could be recovered.
    pub native_id: Option<String>,
    pub reason: String,
}

/// Outcome of an all-or-nothing plant listing: the fetch either completed
/// across all pages or failed as a whole, but individual records may have
/// been skipped during normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedPlants {
    pub plants: Vec<NewPlant>,
    pub skipped: Vec<SkippedRecord>,
    /// Total the vendor reported for the listing, when it reports one.
    pub total_reported: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedAlerts {
    pub alerts: Vec<NewAlert>,
    pub skipped: Vec<SkippedRecord>,
    pub total_reported: Option<u64>,
}

/// Capability set implemented once per vendor family.
///
/// All operations are read-only against the vendor. Network calls go through
/// the shared pooled client the adapter was constructed with.
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    fn kind(&self) -> VendorKind;

    /// Exchange the vendor's credential map for a bearer token. Called by
    /// the auth manager on cache miss or expiry only.
    async fn login(&self, vendor: &VendorConfig) -> Result<VendorLogin>;

    /// List every plant the vendor reports, paging until the reported total
    /// is reached or a page comes back empty. A failing page aborts the
    /// whole listing.
    async fn list_plants(&self, vendor: &VendorConfig, token: &str) -> Result<FetchedPlants>;

    /// Bulk alert retrieval, optionally filtered.
    async fn get_alerts(
        &self,
        vendor: &VendorConfig,
        token: &str,
        filter: &AlertFilter,
    ) -> Result<FetchedAlerts>;

    /// Vendor time-series retrieval. Shares authentication and pooling with
    /// the sync phases but is not part of their correctness guarantees.
    async fn get_telemetry(
        &self,
        vendor: &VendorConfig,
        token: &str,
        query: &TelemetryQuery,
    ) -> Result<TelemetrySeries>;

    /// Instantaneous reading for one plant.
    async fn get_realtime(
        &self,
        vendor: &VendorConfig,
        token: &str,
        vendor_plant_id: &str,
    ) -> Result<RealtimeReading>;
}

/// Explicit adapter table built at startup.
///
/// Replaces a stringly-typed runtime factory: kinds are enum variants, the
/// table is populated once, and `resolve` is the only lookup path.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<VendorKind, Arc<dyn VendorAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn VendorAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn resolve(&self, kind: VendorKind) -> Result<Arc<dyn VendorAdapter>> {
        self.adapters.get(&kind).cloned().ok_or_else(|| {
            Error::Configuration(format!("no adapter registered for vendor kind '{kind}'"))
        })
    }

    pub fn registered_kinds(&self) -> Vec<VendorKind> {
        self.adapters.keys().copied().collect()
    }
}

/// Number of pages to request for a paged listing.
///
/// Vendors occasionally report `pages = 0` alongside a non-zero total; the
/// recomputation is explicit here and the result is capped so a persistently
/// malformed response cannot drive an unbounded loop.
pub fn plan_pages(total: u64, reported_pages: u64, page_size: u64, max_pages: u64) -> u64 {
    if total == 0 || page_size == 0 {
        return 0;
    }
    let pages = if reported_pages == 0 {
        total.div_ceil(page_size)
    } else {
        reported_pages
    };
    pages.min(max_pages)
}

/// Helper for adapters normalizing epoch-seconds vendor timestamps.
pub fn parse_epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_pages_recomputes_zero_page_anomaly() {
        // 45 records, page size 20, vendor claims zero pages.
        assert_eq!(plan_pages(45, 0, 20, 1000), 3);
        // Vendor-reported page count wins when present.
        assert_eq!(plan_pages(45, 5, 20, 1000), 5);
        assert_eq!(plan_pages(0, 0, 20, 1000), 0);
        assert_eq!(plan_pages(40, 0, 20, 1000), 2);
    }

    #[test]
    fn plan_pages_is_bounded() {
        assert_eq!(plan_pages(u64::MAX, 0, 1, 500), 500);
        assert_eq!(plan_pages(100, 9999, 20, 500), 500);
    }

    #[test]
    fn resolve_unregistered_kind_is_a_configuration_error() {
        let registry = AdapterRegistry::new();
        assert!(matches!(
            registry.resolve(VendorKind::Solarman),
            Err(Error::Configuration(_))
        ));
    }
}
