//! Cross-vendor sync orchestration.
//!
//! Per vendor the plant phase runs to completion (success or failure)
//! before the alert phase starts; across vendors everything fans out
//! concurrently with no cap and no ordering guarantee. One vendor's failure
//! is recorded in its own outcome and never affects another vendor.

use crate::models::{
    AlertFilter, OrgId, SyncOutcomeStatus, SyncSummary, SyncTrigger, VendorConfig, VendorId,
    VendorSyncOutcome, VendorSyncStatus,
};
use crate::store::{AlertStore, PlantStore, SyncSettingsStore, VendorStore};
use crate::sync::{AlertSyncService, PlantSyncService};
use crate::{Error, Result};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct SyncOrchestrator {
    plants: Arc<PlantSyncService>,
    alerts: Arc<AlertSyncService>,
    vendors: Arc<dyn VendorStore>,
    plant_store: Arc<dyn PlantStore>,
    alert_store: Arc<dyn AlertStore>,
    settings: Arc<dyn SyncSettingsStore>,
    /// Per-vendor single-flight guards: a run holds the vendor's lock for
    /// its full duration, and an overlapping trigger is reported as skipped
    /// instead of executing concurrently against the same vendor.
    in_flight: Mutex<HashMap<VendorId, Arc<Mutex<()>>>>,
}

impl SyncOrchestrator {
    pub fn new(
        plants: Arc<PlantSyncService>,
        alerts: Arc<AlertSyncService>,
        vendors: Arc<dyn VendorStore>,
        plant_store: Arc<dyn PlantStore>,
        alert_store: Arc<dyn AlertStore>,
        settings: Arc<dyn SyncSettingsStore>,
    ) -> Self {
        Self {
            plants,
            alerts,
            vendors,
            plant_store,
            alert_store,
            settings,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run plant sync then alert sync for a single vendor.
    #[tracing::instrument(level = "info", skip(self, vendor), fields(vendor = %vendor.display_name))]
    pub async fn sync_vendor(
        &self,
        vendor: &VendorConfig,
        trigger: &SyncTrigger,
    ) -> VendorSyncOutcome {
        let guard = {
            let mut map = self.in_flight.lock().await;
            map.entry(vendor.id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let Ok(_held) = guard.try_lock_owned() else {
            tracing::warn!(vendor_id = %vendor.id, "sync already in flight, skipping");
            return VendorSyncOutcome {
                vendor_id: vendor.id,
                vendor_name: vendor.display_name.clone(),
                status: SyncOutcomeStatus::Skipped,
                plants: None,
                alerts: None,
                error: Some("a sync for this vendor is already running".to_string()),
            };
        };

        let mut outcome = VendorSyncOutcome {
            vendor_id: vendor.id,
            vendor_name: vendor.display_name.clone(),
            status: SyncOutcomeStatus::Full,
            plants: None,
            alerts: None,
            error: None,
        };

        let plant_result = self.plants.sync_vendor(vendor.id).await;
        let plants_failed = match plant_result {
            Ok(result) => {
                outcome.plants = Some(result);
                false
            }
            Err(e) if e.aborts_vendor_run() => {
                tracing::warn!(vendor_id = %vendor.id, error = %e, "vendor sync aborted");
                outcome.status = SyncOutcomeStatus::Failed;
                outcome.error = Some(e.to_string());
                return outcome;
            }
            Err(e) => {
                tracing::warn!(vendor_id = %vendor.id, error = %e, "plant phase failed");
                outcome.error = Some(e.to_string());
                true
            }
        };

        // Alert phase runs even when the plant phase failed on a vendor API
        // error; the phases are independent at the persistence layer.
        let filter = self.alert_filter_for(vendor).await;
        let alerts_failed = match self.alerts.sync_vendor(vendor.id, &filter).await {
            Ok(result) => {
                outcome.alerts = Some(result);
                false
            }
            Err(e) => {
                tracing::warn!(vendor_id = %vendor.id, error = %e, "alert phase failed");
                let msg = e.to_string();
                outcome.error = Some(match outcome.error.take() {
                    Some(prev) => format!("{prev}; {msg}"),
                    None => msg,
                });
                true
            }
        };

        outcome.status = match (plants_failed, alerts_failed) {
            (false, false) => SyncOutcomeStatus::Full,
            (true, true) => SyncOutcomeStatus::Failed,
            _ => SyncOutcomeStatus::Partial,
        };
        outcome
    }

    /// Sync every active vendor concurrently and aggregate a summary.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn sync_all(&self, trigger: SyncTrigger) -> Result<SyncSummary> {
        let vendors = self.vendors.list_active_vendors().await?;
        self.run_batch(vendors, trigger).await
    }

    /// Sync the active vendors belonging to one organization. This is the
    /// scheduler's entry point; the semantics are identical to `sync_all`.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn sync_org(&self, org_id: OrgId, trigger: SyncTrigger) -> Result<SyncSummary> {
        let vendors = self
            .vendors
            .list_active_vendors()
            .await?
            .into_iter()
            .filter(|v| v.org_id == org_id)
            .collect();
        self.run_batch(vendors, trigger).await
    }

    async fn run_batch(
        &self,
        vendors: Vec<VendorConfig>,
        trigger: SyncTrigger,
    ) -> Result<SyncSummary> {
        let started_at = Utc::now();
        let attempted = vendors.len() as u64;

        let outcomes = join_all(
            vendors
                .iter()
                .map(|vendor| self.sync_vendor(vendor, &trigger)),
        )
        .await;

        let mut summary = SyncSummary {
            run_id: Uuid::new_v4(),
            trigger,
            attempted,
            succeeded: 0,
            partial: 0,
            failed: 0,
            plants_synced: 0,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        for outcome in &summary.outcomes {
            match outcome.status {
                SyncOutcomeStatus::Full => summary.succeeded += 1,
                SyncOutcomeStatus::Partial => summary.partial += 1,
                SyncOutcomeStatus::Failed => summary.failed += 1,
                SyncOutcomeStatus::Skipped => {}
            }
            if let Some(plants) = &outcome.plants {
                summary.plants_synced += plants.synced;
            }
        }

        tracing::info!(
            run_id = %summary.run_id,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            partial = summary.partial,
            failed = summary.failed,
            plants_synced = summary.plants_synced,
            "sync run finished"
        );
        Ok(summary)
    }

    /// Per-vendor status view: last-synced instants plus the owning
    /// organization's scheduler settings.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn sync_status(&self) -> Result<Vec<VendorSyncStatus>> {
        let vendors = self.vendors.list_active_vendors().await?;
        let mut out = Vec::with_capacity(vendors.len());
        for vendor in vendors {
            out.push(VendorSyncStatus {
                vendor_id: vendor.id,
                vendor_name: vendor.display_name.clone(),
                plants_last_synced_at: self.plant_store.plants_last_synced_at(vendor.id).await?,
                alerts_last_synced_at: self.alert_store.alerts_last_synced_at(vendor.id).await?,
                settings: self.settings.get_settings(vendor.org_id).await?,
            });
        }
        Ok(out)
    }

    /// Resolve the vendor by id and run a single-vendor sync. Convenience
    /// for the manual trigger surface.
    pub async fn sync_vendor_by_id(
        &self,
        vendor_id: VendorId,
        trigger: SyncTrigger,
    ) -> Result<VendorSyncOutcome> {
        let vendor = self
            .vendors
            .get_vendor(vendor_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vendor '{vendor_id}' not found")))?;
        Ok(self.sync_vendor(&vendor, &trigger).await)
    }

    async fn alert_filter_for(&self, vendor: &VendorConfig) -> AlertFilter {
        let since = match self.settings.get_settings(vendor.org_id).await {
            Ok(settings) => settings.and_then(|s| s.alert_sync_start),
            Err(e) => {
                tracing::debug!(org_id = %vendor.org_id, error = %e, "no sync settings, unscoped alert pull");
                None
            }
        };
        AlertFilter {
            since,
            ..AlertFilter::default()
        }
    }
}
