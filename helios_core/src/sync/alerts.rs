//! Alert synchronization.
//!
//! Designed to run after the plant phase for the same vendor so alert
//! plant references resolve against freshly-synced rows; a failure here
//! never rolls back an already-committed plant sync.

use crate::adapter::AdapterRegistry;
use crate::auth::AuthManager;
use crate::models::{AlertFilter, SyncResult, VendorConfig, VendorId};
use crate::store::{AlertStore, UpsertOutcome, VendorStore};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;

pub struct AlertSyncService {
    registry: Arc<AdapterRegistry>,
    auth: Arc<AuthManager>,
    vendors: Arc<dyn VendorStore>,
    alerts: Arc<dyn AlertStore>,
}

impl AlertSyncService {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        auth: Arc<AuthManager>,
        vendors: Arc<dyn VendorStore>,
        alerts: Arc<dyn AlertStore>,
    ) -> Self {
        Self {
            registry,
            auth,
            vendors,
            alerts,
        }
    }

    /// Retrieve and upsert all alerts for one vendor, optionally scoped by
    /// `filter`. Existing alerts are updated in place; nothing is deleted.
    #[tracing::instrument(level = "info", skip(self, filter))]
    pub async fn sync_vendor(&self, vendor_id: VendorId, filter: &AlertFilter) -> Result<SyncResult> {
        let vendor = self.load_vendor(vendor_id).await?;
        let adapter = self.registry.resolve(vendor.kind)?;
        let token = self.auth.bearer_token(&vendor, adapter.as_ref()).await?;

        let fetched = adapter.get_alerts(&vendor, &token, filter).await?;
        let now = Utc::now();

        let mut result = SyncResult {
            total: fetched.total_reported,
            ..SyncResult::default()
        };
        for skip in &fetched.skipped {
            result.skipped += 1;
            result.record_errors.push(match &skip.native_id {
                Some(id) => format!("alert '{id}': {}", skip.reason),
                None => skip.reason.clone(),
            });
        }

        for alert in fetched.alerts {
            match self.alerts.upsert_alert(vendor.id, alert, now).await? {
                UpsertOutcome::Created => result.created += 1,
                UpsertOutcome::Updated => result.updated += 1,
                UpsertOutcome::Unchanged => {}
            }
            result.synced += 1;
        }

        tracing::info!(
            vendor_id = %vendor.id,
            synced = result.synced,
            created = result.created,
            updated = result.updated,
            "alert sync finished"
        );
        Ok(result)
    }

    async fn load_vendor(&self, vendor_id: VendorId) -> Result<VendorConfig> {
        let vendor = self
            .vendors
            .get_vendor(vendor_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("vendor '{vendor_id}' not found")))?;
        if !vendor.active {
            return Err(Error::Conflict(format!(
                "vendor '{}' is not active",
                vendor.display_name
            )));
        }
        Ok(vendor)
    }
}
