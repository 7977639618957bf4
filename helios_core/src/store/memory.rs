//! In-memory store implementations backed by `RwLock<HashMap>`.

use crate::models::{
    Alert, NewAlert, NewPlant, OrgId, Plant, SyncSettings, VendorConfig, VendorId, VendorToken,
};
use crate::store::{
    AlertStore, PlantStore, SyncSettingsStore, TokenStore, UpsertOutcome, VendorStore,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryVendorStore {
    vendors: RwLock<HashMap<VendorId, VendorConfig>>,
}

impl InMemoryVendorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, vendor: VendorConfig) {
        self.vendors.write().await.insert(vendor.id, vendor);
    }
}

#[async_trait]
impl VendorStore for InMemoryVendorStore {
    async fn list_active_vendors(&self) -> Result<Vec<VendorConfig>> {
        let map = self.vendors.read().await;
        let mut out: Vec<VendorConfig> = map.values().filter(|v| v.active).cloned().collect();
        out.sort_by_key(|v| v.id);
        Ok(out)
    }

    async fn get_vendor(&self, id: VendorId) -> Result<Option<VendorConfig>> {
        Ok(self.vendors.read().await.get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<VendorId, VendorToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get_token(&self, vendor_id: VendorId) -> Result<Option<VendorToken>> {
        Ok(self.tokens.read().await.get(&vendor_id).cloned())
    }

    async fn compare_and_swap_token(
        &self,
        vendor_id: VendorId,
        previous: Option<&VendorToken>,
        next: &VendorToken,
    ) -> Result<bool> {
        let mut map = self.tokens.write().await;
        let current = map.get(&vendor_id);
        if current != previous {
            return Ok(false);
        }
        map.insert(vendor_id, next.clone());
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryPlantStore {
    plants: RwLock<HashMap<(VendorId, String), Plant>>,
}

impl InMemoryPlantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.plants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plants.read().await.is_empty()
    }
}

#[async_trait]
impl PlantStore for InMemoryPlantStore {
    async fn get_plant(
        &self,
        vendor_id: VendorId,
        vendor_plant_id: &str,
    ) -> Result<Option<Plant>> {
        Ok(self
            .plants
            .read()
            .await
            .get(&(vendor_id, vendor_plant_id.to_string()))
            .cloned())
    }

    async fn list_plants(&self, vendor_id: VendorId) -> Result<Vec<Plant>> {
        let map = self.plants.read().await;
        let mut out: Vec<Plant> = map
            .values()
            .filter(|p| p.vendor_id == vendor_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.vendor_plant_id.cmp(&b.vendor_plant_id));
        Ok(out)
    }

    async fn upsert_plant(
        &self,
        vendor_id: VendorId,
        plant: NewPlant,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let mut map = self.plants.write().await;
        let key = (vendor_id, plant.vendor_plant_id.clone());
        match map.get_mut(&key) {
            Some(existing) => {
                let changed = existing.differs_from(&plant);
                existing.apply(plant, now);
                Ok(if changed {
                    UpsertOutcome::Updated
                } else {
                    UpsertOutcome::Unchanged
                })
            }
            None => {
                map.insert(key, Plant::from_new(vendor_id, plant, now));
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn plants_last_synced_at(&self, vendor_id: VendorId) -> Result<Option<DateTime<Utc>>> {
        let map = self.plants.read().await;
        Ok(map
            .values()
            .filter(|p| p.vendor_id == vendor_id)
            .map(|p| p.last_synced_at)
            .max())
    }
}

#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: RwLock<HashMap<(VendorId, String), Alert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn get_alert(
        &self,
        vendor_id: VendorId,
        vendor_alert_id: &str,
    ) -> Result<Option<Alert>> {
        Ok(self
            .alerts
            .read()
            .await
            .get(&(vendor_id, vendor_alert_id.to_string()))
            .cloned())
    }

    async fn list_alerts(&self, vendor_id: VendorId) -> Result<Vec<Alert>> {
        let map = self.alerts.read().await;
        let mut out: Vec<Alert> = map
            .values()
            .filter(|a| a.vendor_id == vendor_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.vendor_alert_id.cmp(&b.vendor_alert_id));
        Ok(out)
    }

    async fn upsert_alert(
        &self,
        vendor_id: VendorId,
        alert: NewAlert,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let mut map = self.alerts.write().await;
        let key = (vendor_id, alert.vendor_alert_id.clone());
        match map.get_mut(&key) {
            Some(existing) => {
                let changed = existing.differs_from(&alert);
                existing.apply(alert, now);
                Ok(if changed {
                    UpsertOutcome::Updated
                } else {
                    UpsertOutcome::Unchanged
                })
            }
            None => {
                map.insert(key, Alert::from_new(vendor_id, alert, now));
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn alerts_last_synced_at(&self, vendor_id: VendorId) -> Result<Option<DateTime<Utc>>> {
        let map = self.alerts.read().await;
        Ok(map
            .values()
            .filter(|a| a.vendor_id == vendor_id)
            .map(|a| a.last_synced_at)
            .max())
    }
}

#[derive(Default)]
pub struct InMemorySyncSettingsStore {
    settings: RwLock<HashMap<OrgId, SyncSettings>>,
}

impl InMemorySyncSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncSettingsStore for InMemorySyncSettingsStore {
    async fn get_settings(&self, org_id: OrgId) -> Result<Option<SyncSettings>> {
        Ok(self.settings.read().await.get(&org_id).cloned())
    }

    async fn put_settings(&self, settings: SyncSettings) -> Result<()> {
        self.settings
            .write()
            .await
            .insert(settings.org_id, settings);
        Ok(())
    }

    async fn list_settings(&self) -> Result<Vec<SyncSettings>> {
        Ok(self.settings.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertSeverity;
    use crate::models::AlertStatus;

    fn plant(id: &str, capacity: f64) -> NewPlant {
        let mut p = NewPlant::new(id, format!("plant {id}")).unwrap();
        p.capacity_kw = Some(capacity);
        p
    }

    #[tokio::test]
    async fn plant_upsert_reports_created_updated_unchanged() {
        let store = InMemoryPlantStore::new();
        let vendor = VendorId(1);
        let now = Utc::now();

        assert_eq!(
            store.upsert_plant(vendor, plant("100", 5.0), now).await.unwrap(),
            UpsertOutcome::Created
        );
        assert_eq!(
            store.upsert_plant(vendor, plant("100", 5.0), now).await.unwrap(),
            UpsertOutcome::Unchanged
        );
        assert_eq!(
            store.upsert_plant(vendor, plant("100", 5.5), now).await.unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(store.len().await, 1);
        let stored = store.get_plant(vendor, "100").await.unwrap().unwrap();
        assert_eq!(stored.capacity_kw, Some(5.5));
    }

    #[tokio::test]
    async fn alert_resync_updates_in_place() {
        let store = InMemoryAlertStore::new();
        let vendor = VendorId(1);
        let now = Utc::now();
        let mk = |status: AlertStatus| NewAlert {
            vendor_alert_id: "a-1".to_string(),
            vendor_plant_id: Some("100".to_string()),
            title: "grid fault".to_string(),
            description: None,
            severity: AlertSeverity::High,
            status,
            started_at: now,
            ended_at: None,
            metadata: serde_json::json!({}),
        };

        assert_eq!(
            store.upsert_alert(vendor, mk(AlertStatus::Open), now).await.unwrap(),
            UpsertOutcome::Created
        );
        assert_eq!(
            store
                .upsert_alert(vendor, mk(AlertStatus::Resolved), now)
                .await
                .unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn token_cas_rejects_stale_writers() {
        let store = InMemoryTokenStore::new();
        let vendor = VendorId(7);
        let now = Utc::now();
        let a = VendorToken::new("a", now + chrono::Duration::hours(1), None, now).unwrap();
        let b = VendorToken::new("b", now + chrono::Duration::hours(2), None, now).unwrap();

        assert!(store.compare_and_swap_token(vendor, None, &a).await.unwrap());
        // A second writer that still believes the slot is empty loses.
        assert!(!store.compare_and_swap_token(vendor, None, &b).await.unwrap());
        assert!(store
            .compare_and_swap_token(vendor, Some(&a), &b)
            .await
            .unwrap());
        assert_eq!(
            store.get_token(vendor).await.unwrap().unwrap().access_token,
            "b"
        );
    }
}
