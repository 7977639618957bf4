//! Solarman business-API adapter.
//!
//! Token login (`/account/v1.0/token`), paged station listing, paged alert
//! listing with the pages=0 anomaly handled explicitly, station history and
//! realtime frames. Power comes back in watts and timestamps as epoch
//! seconds; normalization converts to kilowatts and absolute instants.

use crate::adapters::MAX_PAGES;
use async_trait::async_trait;
use helios_core::adapter::{
    parse_epoch_seconds, plan_pages, FetchedAlerts, FetchedPlants, SkippedRecord, VendorAdapter,
    VendorLogin,
};
use helios_core::models::{
    AlertFilter, AlertSeverity, AlertStatus, Location, NetworkStatus, NewAlert, NewPlant,
    ProductionSnapshot, RealtimeReading, TelemetryPoint, TelemetryQuery, TelemetrySeries,
    TelemetrySpan, VendorConfig, VendorKind,
};
use helios_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://globalapi.solarmanpv.com";
const PAGE_SIZE: u64 = 20;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    /// Seconds, but delivered as a string.
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct PageRequest {
    page: u64,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct StationListResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default, rename = "stationList")]
    station_list: Vec<Station>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Station {
    pub id: Option<i64>,
    pub name: Option<String>,
    #[serde(rename = "locationLat")]
    pub location_lat: Option<f64>,
    #[serde(rename = "locationLng")]
    pub location_lng: Option<f64>,
    #[serde(rename = "locationAddress")]
    pub location_address: Option<String>,
    /// Installed capacity in kilowatts.
    #[serde(rename = "installedCapacity")]
    pub installed_capacity: Option<f64>,
    /// Instantaneous generation power in watts.
    #[serde(rename = "generationPower")]
    pub generation_power: Option<f64>,
    #[serde(rename = "generationValue")]
    pub generation_value: Option<f64>,
    #[serde(rename = "networkStatus")]
    pub network_status: Option<String>,
}

#[derive(Debug, Serialize)]
struct AlertListRequest {
    page: u64,
    size: u64,
    #[serde(rename = "startTimestamp", skip_serializing_if = "Option::is_none")]
    start_timestamp: Option<i64>,
    #[serde(rename = "endTimestamp", skip_serializing_if = "Option::is_none")]
    end_timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AlertListResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    total: Option<u64>,
    /// Sometimes reported as 0 despite a non-zero total.
    #[serde(default)]
    pages: Option<u64>,
    #[serde(default, rename = "alertList")]
    alert_list: Vec<RawAlert>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAlert {
    #[serde(rename = "alertId")]
    pub alert_id: Option<i64>,
    #[serde(rename = "stationId")]
    pub station_id: Option<i64>,
    #[serde(rename = "showName")]
    pub show_name: Option<String>,
    #[serde(rename = "alertNameInPAAS")]
    pub alert_name: Option<String>,
    pub influence: Option<String>,
    /// Severity code 0..=3.
    pub level: Option<i64>,
    /// Epoch seconds.
    #[serde(rename = "startTime")]
    pub start_time: Option<i64>,
    #[serde(rename = "endTime")]
    pub end_time: Option<i64>,
    /// 0 open, 1 resolved.
    pub status: Option<i64>,
}

#[derive(Debug, Serialize)]
struct HistoryRequest<'a> {
    #[serde(rename = "stationId")]
    station_id: &'a str,
    /// 1 day, 2 month, 3 year, 4 total.
    #[serde(rename = "timeType")]
    time_type: u8,
    #[serde(rename = "startTime")]
    start_time: String,
    #[serde(rename = "endTime")]
    end_time: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default, rename = "stationDataItems")]
    items: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    #[serde(rename = "dateTime")]
    date_time: Option<i64>,
    #[serde(rename = "generationPower")]
    generation_power: Option<f64>,
    #[serde(rename = "generationValue")]
    generation_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(rename = "generationPower")]
    generation_power: Option<f64>,
    #[serde(rename = "generationValue")]
    generation_value: Option<f64>,
    #[serde(rename = "lastUpdateTime")]
    last_update_time: Option<i64>,
    #[serde(rename = "networkStatus")]
    network_status: Option<String>,
}

pub struct SolarmanAdapter {
    client: reqwest::Client,
    api_base: String,
}

impl SolarmanAdapter {
    pub fn new(client: reqwest::Client, api_base: Option<&str>) -> Self {
        Self {
            client,
            api_base: api_base
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn base<'a>(&'a self, vendor: &'a VendorConfig) -> &'a str {
        vendor.api_base.as_deref().unwrap_or(&self.api_base)
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        vendor: &VendorConfig,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{path}", self.base(vendor));
        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(Error::backend_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::VendorApi {
                vendor: vendor.display_name.clone(),
                status: status.as_u16(),
                body,
            });
        }
        resp.json().await.map_err(Error::backend_reqwest)
    }

    /// Solarman wraps errors in a 200 with `success = false`.
    fn ensure_vendor_ok(
        vendor: &VendorConfig,
        success: Option<bool>,
        msg: &Option<String>,
    ) -> Result<()> {
        if success == Some(false) {
            return Err(Error::VendorApi {
                vendor: vendor.display_name.clone(),
                status: 200,
                body: msg.clone().unwrap_or_else(|| "vendor reported failure".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VendorAdapter for SolarmanAdapter {
    fn kind(&self) -> VendorKind {
        VendorKind::Solarman
    }

    #[tracing::instrument(level = "info", skip(self, vendor), fields(vendor = %vendor.display_name))]
    async fn login(&self, vendor: &VendorConfig) -> Result<VendorLogin> {
        let app_id = vendor.credential("app_id")?;
        let app_secret = vendor.credential("app_secret")?;
        let email = vendor.credential("email")?;
        let password = vendor.credential("password")?;

        let url = format!("{}/account/v1.0/token", self.base(vendor));
        let resp = self
            .client
            .post(url)
            .query(&[("appId", app_id), ("language", "en")])
            .json(&serde_json::json!({
                "appSecret": app_secret,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(Error::backend_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::AuthenticationFailed {
                vendor: vendor.display_name.clone(),
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let body: TokenResponse = resp.json().await.map_err(Error::backend_reqwest)?;
        if body.success == Some(false) {
            return Err(Error::AuthenticationFailed {
                vendor: vendor.display_name.clone(),
                status: Some(200),
                message: body.msg.unwrap_or_else(|| "login rejected".to_string()),
            });
        }
        let access_token = body.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::AuthenticationFailed {
                vendor: vendor.display_name.clone(),
                status: Some(200),
                message: "login response carried no access_token".to_string(),
            }
        })?;

        Ok(VendorLogin {
            access_token,
            expires_in: body
                .expires_in
                .as_deref()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
            refresh_token: body.refresh_token,
        })
    }

    #[tracing::instrument(level = "info", skip(self, vendor, token), fields(vendor = %vendor.display_name))]
    async fn list_plants(&self, vendor: &VendorConfig, token: &str) -> Result<FetchedPlants> {
        let mut fetched = FetchedPlants::default();
        let mut page = 1u64;

        loop {
            let body: StationListResponse = self
                .post_json(
                    vendor,
                    "/station/v1.0/list",
                    token,
                    &PageRequest {
                        page,
                        size: PAGE_SIZE,
                    },
                )
                .await?;
            Self::ensure_vendor_ok(vendor, body.success, &body.msg)?;

            if page == 1 {
                fetched.total_reported = body.total;
            }
            if body.station_list.is_empty() {
                break;
            }

            for station in &body.station_list {
                match normalize_station(station) {
                    Ok(plant) => fetched.plants.push(plant),
                    Err(e) => fetched.skipped.push(SkippedRecord {
                        native_id: station.id.map(|id| id.to_string()),
                        reason: e.to_string(),
                    }),
                }
            }

            let seen = (fetched.plants.len() + fetched.skipped.len()) as u64;
            if fetched.total_reported.is_some_and(|total| seen >= total) {
                break;
            }
            page += 1;
            if page > MAX_PAGES {
                tracing::warn!(vendor = %vendor.display_name, "station listing exceeded page cap");
                break;
            }
        }

        Ok(fetched)
    }

    #[tracing::instrument(level = "info", skip(self, vendor, token, filter), fields(vendor = %vendor.display_name))]
    async fn get_alerts(
        &self,
        vendor: &VendorConfig,
        token: &str,
        filter: &AlertFilter,
    ) -> Result<FetchedAlerts> {
        let request = |page: u64| AlertListRequest {
            page,
            size: PAGE_SIZE,
            start_timestamp: filter.since.map(|t| t.timestamp()),
            end_timestamp: filter.until.map(|t| t.timestamp()),
        };

        // First page tells us the totals.
        let first: AlertListResponse = self
            .post_json(vendor, "/station/v1.0/alertList", token, &request(1))
            .await?;
        Self::ensure_vendor_ok(vendor, first.success, &first.msg)?;

        let total = first.total.unwrap_or(first.alert_list.len() as u64);
        let pages = plan_pages(total, first.pages.unwrap_or(0), PAGE_SIZE, MAX_PAGES);

        let mut fetched = FetchedAlerts {
            total_reported: Some(total),
            ..FetchedAlerts::default()
        };
        let mut collect = |records: &[RawAlert], out: &mut FetchedAlerts| {
            for raw in records {
                if let Some(fault) = &filter.fault_type {
                    let name = raw.alert_name.as_deref().unwrap_or_default();
                    if !name.contains(fault.as_str()) {
                        continue;
                    }
                }
                match normalize_alert(raw) {
                    Ok(alert) => out.alerts.push(alert),
                    Err(e) => out.skipped.push(SkippedRecord {
                        native_id: raw.alert_id.map(|id| id.to_string()),
                        reason: e.to_string(),
                    }),
                }
            }
        };

        let mut seen = first.alert_list.len() as u64;
        collect(&first.alert_list, &mut fetched);
        if first.alert_list.is_empty() {
            return Ok(fetched);
        }

        for page in 2..=pages {
            let body: AlertListResponse = self
                .post_json(vendor, "/station/v1.0/alertList", token, &request(page))
                .await?;
            Self::ensure_vendor_ok(vendor, body.success, &body.msg)?;
            // Empty page before the reported total is reached: stop rather
            // than loop on a malformed response.
            if body.alert_list.is_empty() {
                break;
            }
            seen += body.alert_list.len() as u64;
            collect(&body.alert_list, &mut fetched);
            if seen >= total {
                break;
            }
        }

        Ok(fetched)
    }

    #[tracing::instrument(level = "debug", skip(self, vendor, token), fields(vendor = %vendor.display_name))]
    async fn get_telemetry(
        &self,
        vendor: &VendorConfig,
        token: &str,
        query: &TelemetryQuery,
    ) -> Result<TelemetrySeries> {
        let (time_type, fmt) = match query.span {
            TelemetrySpan::Day => (1, "%Y-%m-%d"),
            TelemetrySpan::Month => (2, "%Y-%m"),
            TelemetrySpan::Year => (3, "%Y"),
            TelemetrySpan::Total => (4, "%Y"),
        };
        let stamp = query.at.format(fmt).to_string();
        let body: HistoryResponse = self
            .post_json(
                vendor,
                "/station/v1.0/history",
                token,
                &HistoryRequest {
                    station_id: &query.vendor_plant_id,
                    time_type,
                    start_time: stamp.clone(),
                    end_time: stamp,
                },
            )
            .await?;
        Self::ensure_vendor_ok(vendor, body.success, &body.msg)?;

        let points = body
            .items
            .iter()
            .filter_map(|item| {
                let at = parse_epoch_seconds(item.date_time?)?;
                Some(TelemetryPoint {
                    at,
                    power_kw: item.generation_power.map(watts_to_kw),
                    energy_kwh: item.generation_value,
                })
            })
            .collect();

        Ok(TelemetrySeries {
            vendor_plant_id: query.vendor_plant_id.clone(),
            span: query.span,
            points,
        })
    }

    #[tracing::instrument(level = "debug", skip(self, vendor, token), fields(vendor = %vendor.display_name))]
    async fn get_realtime(
        &self,
        vendor: &VendorConfig,
        token: &str,
        vendor_plant_id: &str,
    ) -> Result<RealtimeReading> {
        let body: RealtimeResponse = self
            .post_json(
                vendor,
                "/station/v1.0/realTime",
                token,
                &serde_json::json!({ "stationId": vendor_plant_id }),
            )
            .await?;
        Self::ensure_vendor_ok(vendor, body.success, &body.msg)?;

        Ok(RealtimeReading {
            vendor_plant_id: vendor_plant_id.to_string(),
            at: body
                .last_update_time
                .and_then(parse_epoch_seconds)
                .unwrap_or_else(chrono::Utc::now),
            power_kw: body.generation_power.map(watts_to_kw),
            energy_today_kwh: body.generation_value,
            network_status: network_status(body.network_status.as_deref()),
        })
    }
}

fn watts_to_kw(watts: f64) -> f64 {
    watts / 1000.0
}

fn network_status(raw: Option<&str>) -> NetworkStatus {
    match raw {
        Some("NORMAL") => NetworkStatus::Online,
        Some("ALL_OFFLINE") => NetworkStatus::Offline,
        Some("PARTIAL_OFFLINE") => NetworkStatus::Alerting,
        _ => NetworkStatus::Unknown,
    }
}

/// Severity translation table: Solarman levels 0..=3.
fn severity(level: Option<i64>) -> Result<AlertSeverity> {
    match level {
        Some(0) => Ok(AlertSeverity::Low),
        Some(1) => Ok(AlertSeverity::Medium),
        Some(2) => Ok(AlertSeverity::High),
        Some(3) => Ok(AlertSeverity::Critical),
        other => Err(Error::Normalization(format!(
            "unknown solarman alert level {other:?}"
        ))),
    }
}

pub(crate) fn normalize_station(raw: &Station) -> Result<NewPlant> {
    let id = raw
        .id
        .ok_or_else(|| Error::Normalization("station record has no id".to_string()))?;
    let mut plant = NewPlant::new(
        id.to_string(),
        raw.name.clone().unwrap_or_else(|| format!("station {id}")),
    )?;
    plant.capacity_kw = raw.installed_capacity;
    plant.location = Location {
        latitude: raw.location_lat,
        longitude: raw.location_lng,
        address: raw.location_address.clone(),
    };
    plant.production = ProductionSnapshot {
        current_power_kw: raw.generation_power.map(watts_to_kw),
        energy_today_kwh: raw.generation_value,
        ..ProductionSnapshot::default()
    };
    plant.network_status = network_status(raw.network_status.as_deref());
    Ok(plant)
}

pub(crate) fn normalize_alert(raw: &RawAlert) -> Result<NewAlert> {
    let id = raw
        .alert_id
        .ok_or_else(|| Error::Normalization("alert record has no id".to_string()))?;
    let started_at = raw
        .start_time
        .and_then(parse_epoch_seconds)
        .ok_or_else(|| Error::Normalization(format!("alert {id} has no valid startTime")))?;

    Ok(NewAlert {
        vendor_alert_id: id.to_string(),
        vendor_plant_id: raw.station_id.map(|s| s.to_string()),
        title: raw
            .show_name
            .clone()
            .or_else(|| raw.alert_name.clone())
            .unwrap_or_else(|| format!("alert {id}")),
        description: raw.influence.clone(),
        severity: severity(raw.level)?,
        status: match raw.status {
            Some(1) => AlertStatus::Resolved,
            _ => AlertStatus::Open,
        },
        started_at,
        ended_at: raw.end_time.and_then(parse_epoch_seconds),
        metadata: serde_json::json!({
            "alert_name": raw.alert_name,
            "level": raw.level,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_core::models::{OrgId, VendorId};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn vendor_at(base: &str) -> VendorConfig {
        let mut vendor = VendorConfig::new(
            VendorId(1),
            "solarman-test",
            VendorKind::Solarman,
            OrgId(Uuid::new_v4()),
            HashMap::new(),
            None,
        )
        .unwrap();
        vendor.api_base = Some(base.to_string());
        vendor
    }

    fn alert_record(id: i64) -> serde_json::Value {
        serde_json::json!({
            "alertId": id,
            "stationId": 1,
            "showName": format!("fault {id}"),
            "level": 1,
            "startTime": 1_718_000_000,
            "status": 0,
        })
    }

    fn alert_page(total: u64, pages: u64, ids: std::ops::Range<i64>) -> String {
        serde_json::json!({
            "success": true,
            "total": total,
            "pages": pages,
            "alertList": ids.map(alert_record).collect::<Vec<_>>(),
        })
        .to_string()
    }

    #[tokio::test]
    async fn alert_listing_recomputes_zero_pages_and_aggregates() {
        let mut server = mockito::Server::new_async().await;
        // 25 alerts across two pages; the vendor claims zero pages.
        let page1 = server
            .mock("POST", "/station/v1.0/alertList")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"page": 1})))
            .with_header("content-type", "application/json")
            .with_body(alert_page(25, 0, 0..20))
            .create_async()
            .await;
        let page2 = server
            .mock("POST", "/station/v1.0/alertList")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"page": 2})))
            .with_header("content-type", "application/json")
            .with_body(alert_page(25, 0, 20..25))
            .create_async()
            .await;

        let adapter = SolarmanAdapter::new(reqwest::Client::new(), None);
        let vendor = vendor_at(&server.url());
        let fetched = adapter
            .get_alerts(&vendor, "tok", &AlertFilter::default())
            .await
            .unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(fetched.alerts.len(), 25);
        assert_eq!(fetched.total_reported, Some(25));
        assert!(fetched.skipped.is_empty());
    }

    #[tokio::test]
    async fn empty_page_stops_alert_listing_before_reported_total() {
        let mut server = mockito::Server::new_async().await;
        // Total claims 60 over 3 pages, but page 2 comes back empty.
        server
            .mock("POST", "/station/v1.0/alertList")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"page": 1})))
            .with_header("content-type", "application/json")
            .with_body(alert_page(60, 3, 0..20))
            .create_async()
            .await;
        let page2 = server
            .mock("POST", "/station/v1.0/alertList")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"page": 2})))
            .with_header("content-type", "application/json")
            .with_body(alert_page(60, 3, 0..0))
            .create_async()
            .await;

        let adapter = SolarmanAdapter::new(reqwest::Client::new(), None);
        let vendor = vendor_at(&server.url());
        let fetched = adapter
            .get_alerts(&vendor, "tok", &AlertFilter::default())
            .await
            .unwrap();

        page2.assert_async().await;
        assert_eq!(fetched.alerts.len(), 20);
    }

    #[tokio::test]
    async fn vendor_reported_failure_rejects_station_listing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/station/v1.0/list")
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "msg": "auth invalid"}"#)
            .create_async()
            .await;

        let adapter = SolarmanAdapter::new(reqwest::Client::new(), None);
        let vendor = vendor_at(&server.url());
        let err = adapter.list_plants(&vendor, "tok").await.unwrap_err();
        match err {
            Error::VendorApi { status, body, .. } => {
                assert_eq!(status, 200);
                assert!(body.contains("auth invalid"));
            }
            other => panic!("expected vendor api error, got {other:?}"),
        }
    }

    #[test]
    fn station_normalization_converts_watts_and_location() {
        let raw: Station = serde_json::from_value(serde_json::json!({
            "id": 12345,
            "name": "Rooftop A",
            "locationLat": 48.2,
            "locationLng": 16.3,
            "locationAddress": "Vienna",
            "installedCapacity": 9.9,
            "generationPower": 4321.0,
            "generationValue": 12.5,
            "networkStatus": "NORMAL",
        }))
        .unwrap();

        let plant = normalize_station(&raw).unwrap();
        assert_eq!(plant.vendor_plant_id, "12345");
        assert_eq!(plant.capacity_kw, Some(9.9));
        assert_eq!(plant.production.current_power_kw, Some(4.321));
        assert_eq!(plant.network_status, NetworkStatus::Online);
        assert_eq!(plant.location.address.as_deref(), Some("Vienna"));
    }

    #[test]
    fn station_without_id_fails_normalization() {
        let raw: Station = serde_json::from_value(serde_json::json!({"name": "x"})).unwrap();
        assert!(matches!(
            normalize_station(&raw),
            Err(Error::Normalization(_))
        ));
    }

    #[test]
    fn severity_table_covers_all_levels() {
        assert_eq!(severity(Some(0)).unwrap(), AlertSeverity::Low);
        assert_eq!(severity(Some(1)).unwrap(), AlertSeverity::Medium);
        assert_eq!(severity(Some(2)).unwrap(), AlertSeverity::High);
        assert_eq!(severity(Some(3)).unwrap(), AlertSeverity::Critical);
        assert!(severity(Some(9)).is_err());
        assert!(severity(None).is_err());
    }

    #[test]
    fn alert_normalization_maps_status_and_times() {
        let raw: RawAlert = serde_json::from_value(serde_json::json!({
            "alertId": 777,
            "stationId": 12345,
            "showName": "Grid overvoltage",
            "alertNameInPAAS": "GRID_OVER_VOLTAGE",
            "influence": "production halted",
            "level": 2,
            "startTime": 1_718_000_000,
            "endTime": 1_718_003_600,
            "status": 1,
        }))
        .unwrap();

        let alert = normalize_alert(&raw).unwrap();
        assert_eq!(alert.vendor_alert_id, "777");
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.downtime().unwrap().num_seconds(), 3600);
    }

    #[test]
    fn alert_without_start_time_is_skipped() {
        let raw: RawAlert =
            serde_json::from_value(serde_json::json!({"alertId": 1, "level": 0})).unwrap();
        assert!(matches!(normalize_alert(&raw), Err(Error::Normalization(_))));
    }
}
