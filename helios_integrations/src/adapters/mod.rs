//! Shipped vendor adapters.
//!
//! Each adapter bridges one vendor family's HTTP API to the common schema:
//! typed response structs, total normalization functions, explicit
//! pagination. All adapters share the pooled client they are built with.

pub mod growatt;
pub mod solarman;

use helios_core::{AdapterRegistry, HeliosConfig, VendorKind};
use std::sync::Arc;

/// Cap on pages requested from any paged vendor listing; guards against a
/// persistently malformed total/pages response.
pub(crate) const MAX_PAGES: u64 = 512;

/// Build the registry with every shipped adapter, applying configured
/// base-URL overrides.
pub fn default_registry(client: reqwest::Client, config: &HeliosConfig) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(solarman::SolarmanAdapter::new(
        client.clone(),
        config.api_base_override(VendorKind::Solarman),
    )));
    registry.register(Arc::new(growatt::GrowattAdapter::new(
        client,
        config.api_base_override(VendorKind::Growatt),
    )));
    registry
}
