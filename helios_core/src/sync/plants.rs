//! Plant synchronization: authenticate, list, normalize, upsert.

use crate::adapter::AdapterRegistry;
use crate::auth::AuthManager;
use crate::models::{SyncResult, VendorConfig, VendorId};
use crate::store::{PlantStore, UpsertOutcome, VendorStore};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;

pub struct PlantSyncService {
    registry: Arc<AdapterRegistry>,
    auth: Arc<AuthManager>,
    vendors: Arc<dyn VendorStore>,
    plants: Arc<dyn PlantStore>,
}

impl PlantSyncService {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        auth: Arc<AuthManager>,
        vendors: Arc<dyn VendorStore>,
        plants: Arc<dyn PlantStore>,
    ) -> Self {
        Self {
            registry,
            auth,
            vendors,
            plants,
        }
    }

    /// Sync all plants for one vendor.
    ///
    /// The listing is all-or-nothing: a failing page aborts the vendor's
    /// plant sync with nothing committed from that fetch. Records the
    /// adapter skipped during normalization are counted and their reasons
    /// collected, but they never abort the batch.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn sync_vendor(&self, vendor_id: VendorId) -> Result<SyncResult> {
        let vendor = self.load_vendor(vendor_id).await?;
        let adapter = self.registry.resolve(vendor.kind)?;
        let token = self.auth.bearer_token(&vendor, adapter.as_ref()).await?;

        let fetched = adapter.list_plants(&vendor, &token).await?;
        let now = Utc::now();

        let mut result = SyncResult {
            total: fetched.total_reported,
            ..SyncResult::default()
        };
        for skip in &fetched.skipped {
            result.skipped += 1;
            result.record_errors.push(match &skip.native_id {
                Some(id) => format!("plant '{id}': {}", skip.reason),
                None => skip.reason.clone(),
            });
        }

        for plant in fetched.plants {
            match self.plants.upsert_plant(vendor.id, plant, now).await? {
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
            skipped = result.skipped,
            "plant sync finished"
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
