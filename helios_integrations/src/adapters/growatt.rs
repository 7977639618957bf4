//! Growatt OpenAPI adapter.
//!
//! Growatt authenticates with a static API token sent in a `token` header,
//! so `login` performs no network exchange. Responses wrap payloads in an
//! `error_code`/`error_msg` envelope, report numeric values as strings and
//! timestamps as local naive datetimes, all of which normalization absorbs.

use crate::adapters::MAX_PAGES;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use helios_core::adapter::{
    plan_pages, FetchedAlerts, FetchedPlants, SkippedRecord, VendorAdapter, VendorLogin,
};
use helios_core::models::{
    AlertFilter, AlertSeverity, AlertStatus, Location, NetworkStatus, NewAlert, NewPlant,
    ProductionSnapshot, RealtimeReading, TelemetryPoint, TelemetryQuery, TelemetrySeries,
    TelemetrySpan, VendorConfig, VendorKind,
};
use helios_core::{Error, Result};
use serde::Deserialize;

const DEFAULT_API_BASE: &str = "https://openapi.growatt.com";
const PAGE_SIZE: u64 = 20;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PlantPage {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    plants: Vec<RawPlant>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPlant {
    pub plant_id: Option<i64>,
    pub name: Option<String>,
    /// Decimal degrees, as a string.
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// Installed capacity in kilowatts, as a string.
    pub peak_power: Option<String>,
    /// Instantaneous power in watts, as a string.
    pub current_power: Option<String>,
    pub total_energy: Option<String>,
    /// 1 online, 2 alerting, 3 offline.
    pub status: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AlarmPage {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    alarms: Vec<RawAlarm>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAlarm {
    pub alarm_id: Option<i64>,
    pub plant_id: Option<i64>,
    pub alarm_code: Option<String>,
    pub alarm_message: Option<String>,
    /// Severity code 1..=4.
    pub alarm_level: Option<i64>,
    /// "%Y-%m-%d %H:%M:%S", vendor-local, treated as UTC.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// 0 open, 1 resolved.
    pub status: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EnergySeries {
    #[serde(default)]
    energys: Vec<EnergyPoint>,
}

#[derive(Debug, Deserialize)]
struct EnergyPoint {
    date: Option<String>,
    energy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlantData {
    current_power: Option<String>,
    today_energy: Option<String>,
    last_update_time: Option<String>,
    status: Option<i64>,
}

pub struct GrowattAdapter {
    client: reqwest::Client,
    api_base: String,
}

impl GrowattAdapter {
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

    async fn get_enveloped<T: for<'de> Deserialize<'de>>(
        &self,
        vendor: &VendorConfig,
        path: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base(vendor));
        let resp = self
            .client
            .get(url)
            .header("token", token)
            .query(query)
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

        let envelope: Envelope<T> = resp.json().await.map_err(Error::backend_reqwest)?;
        if envelope.error_code != 0 {
            return Err(Error::VendorApi {
                vendor: vendor.display_name.clone(),
                status: status.as_u16(),
                body: format!(
                    "error_code {}: {}",
                    envelope.error_code,
                    envelope.error_msg.unwrap_or_default()
                ),
            });
        }
        envelope.data.ok_or_else(|| Error::VendorApi {
            vendor: vendor.display_name.clone(),
            status: status.as_u16(),
            body: "response envelope carried no data".to_string(),
        })
    }
}

#[async_trait]
impl VendorAdapter for GrowattAdapter {
    fn kind(&self) -> VendorKind {
        VendorKind::Growatt
    }

    /// No token exchange: the configured API token is the bearer token. It
    /// is opaque and carries no expiry, so the auth manager applies its
    /// default lifetime.
    #[tracing::instrument(level = "info", skip(self, vendor), fields(vendor = %vendor.display_name))]
    async fn login(&self, vendor: &VendorConfig) -> Result<VendorLogin> {
        let token = vendor
            .credential("api_token")
            .map_err(|_| Error::AuthenticationFailed {
                vendor: vendor.display_name.clone(),
                status: None,
                message: "missing 'api_token' credential".to_string(),
            })?;
        Ok(VendorLogin {
            access_token: token.to_string(),
            expires_in: None,
            refresh_token: None,
        })
    }

    #[tracing::instrument(level = "info", skip(self, vendor, token), fields(vendor = %vendor.display_name))]
    async fn list_plants(&self, vendor: &VendorConfig, token: &str) -> Result<FetchedPlants> {
        let mut fetched = FetchedPlants::default();
        let mut page = 1u64;

        loop {
            let data: PlantPage = self
                .get_enveloped(
                    vendor,
                    "/v1/plant/list",
                    token,
                    &[
                        ("page", page.to_string()),
                        ("perpage", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;

            if page == 1 {
                fetched.total_reported = data.count;
            }
            if data.plants.is_empty() {
                break;
            }

            for raw in &data.plants {
                match normalize_plant(raw) {
                    Ok(plant) => fetched.plants.push(plant),
                    Err(e) => fetched.skipped.push(SkippedRecord {
                        native_id: raw.plant_id.map(|id| id.to_string()),
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
                tracing::warn!(vendor = %vendor.display_name, "plant listing exceeded page cap");
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
        // Growatt exposes no server-side time or type filters; everything is
        // applied after normalization.
        let first: AlarmPage = self
            .get_enveloped(
                vendor,
                "/v1/plant/alarm_list",
                token,
                &[
                    ("page", "1".to_string()),
                    ("perpage", PAGE_SIZE.to_string()),
                ],
            )
            .await?;

        let total = first.count.unwrap_or(first.alarms.len() as u64);
        let pages = plan_pages(total, 0, PAGE_SIZE, MAX_PAGES);

        let mut fetched = FetchedAlerts {
            total_reported: Some(total),
            ..FetchedAlerts::default()
        };
        let mut collect = |records: &[RawAlarm], out: &mut FetchedAlerts| {
            for raw in records {
                if let Some(fault) = &filter.fault_type {
                    let code = raw.alarm_code.as_deref().unwrap_or_default();
                    if !code.contains(fault.as_str()) {
                        continue;
                    }
                }
                match normalize_alarm(raw) {
                    Ok(alert) => {
                        if filter.since.is_some_and(|since| alert.started_at < since) {
                            continue;
                        }
                        if filter.until.is_some_and(|until| alert.started_at > until) {
                            continue;
                        }
                        out.alerts.push(alert);
                    }
                    Err(e) => out.skipped.push(SkippedRecord {
                        native_id: raw.alarm_id.map(|id| id.to_string()),
                        reason: e.to_string(),
                    }),
                }
            }
        };

        let mut seen = first.alarms.len() as u64;
        collect(&first.alarms, &mut fetched);
        if first.alarms.is_empty() {
            return Ok(fetched);
        }

        for page in 2..=pages {
            let data: AlarmPage = self
                .get_enveloped(
                    vendor,
                    "/v1/plant/alarm_list",
                    token,
                    &[
                        ("page", page.to_string()),
                        ("perpage", PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            if data.alarms.is_empty() {
                break;
            }
            seen += data.alarms.len() as u64;
            collect(&data.alarms, &mut fetched);
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
        let (time_unit, fmt) = match query.span {
            TelemetrySpan::Day => ("day", "%Y-%m-%d"),
            TelemetrySpan::Month => ("month", "%Y-%m"),
            TelemetrySpan::Year => ("year", "%Y"),
            TelemetrySpan::Total => ("total", "%Y"),
        };
        let stamp = query.at.format(fmt).to_string();
        let data: EnergySeries = self
            .get_enveloped(
                vendor,
                "/v1/plant/energy",
                token,
                &[
                    ("plant_id", query.vendor_plant_id.clone()),
                    ("time_unit", time_unit.to_string()),
                    ("start_date", stamp.clone()),
                    ("end_date", stamp),
                ],
            )
            .await?;

        let points = data
            .energys
            .iter()
            .filter_map(|point| {
                let at = parse_timestamp(point.date.as_deref()?)?;
                Some(TelemetryPoint {
                    at,
                    power_kw: None,
                    energy_kwh: point.energy.as_deref().and_then(|s| s.parse().ok()),
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
        let data: PlantData = self
            .get_enveloped(
                vendor,
                "/v1/plant/data",
                token,
                &[("plant_id", vendor_plant_id.to_string())],
            )
            .await?;

        Ok(RealtimeReading {
            vendor_plant_id: vendor_plant_id.to_string(),
            at: data
                .last_update_time
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(chrono::Utc::now),
            power_kw: data
                .current_power
                .as_deref()
                .and_then(|s| s.parse::<f64>().ok())
                .map(|w| w / 1000.0),
            energy_today_kwh: data.today_energy.as_deref().and_then(|s| s.parse().ok()),
            network_status: network_status(data.status),
        })
    }
}

fn network_status(raw: Option<i64>) -> NetworkStatus {
    match raw {
        Some(1) => NetworkStatus::Online,
        Some(2) => NetworkStatus::Alerting,
        Some(3) => NetworkStatus::Offline,
        _ => NetworkStatus::Unknown,
    }
}

/// Severity translation table: Growatt levels 1..=4.
fn severity(level: Option<i64>) -> Result<AlertSeverity> {
    match level {
        Some(1) => Ok(AlertSeverity::Low),
        Some(2) => Ok(AlertSeverity::Medium),
        Some(3) => Ok(AlertSeverity::High),
        Some(4) => Ok(AlertSeverity::Critical),
        other => Err(Error::Normalization(format!(
            "unknown growatt alarm level {other:?}"
        ))),
    }
}

/// Vendor datetimes carry no offset; they are read as UTC.
fn parse_timestamp(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

fn parse_numeric_string(raw: Option<&str>, field: &str, id: i64) -> Result<Option<f64>> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            Error::Normalization(format!("plant {id}: field '{field}' is not numeric: '{s}'"))
        }),
    }
}

pub(crate) fn normalize_plant(raw: &RawPlant) -> Result<NewPlant> {
    let id = raw
        .plant_id
        .ok_or_else(|| Error::Normalization("plant record has no id".to_string()))?;
    let mut plant = NewPlant::new(
        id.to_string(),
        raw.name.clone().unwrap_or_else(|| format!("plant {id}")),
    )?;
    plant.capacity_kw = parse_numeric_string(raw.peak_power.as_deref(), "peak_power", id)?;
    plant.location = Location {
        latitude: parse_numeric_string(raw.latitude.as_deref(), "latitude", id)?,
        longitude: parse_numeric_string(raw.longitude.as_deref(), "longitude", id)?,
        address: match (&raw.city, &raw.country) {
            (Some(city), Some(country)) => Some(format!("{city}, {country}")),
            (Some(city), None) => Some(city.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        },
    };
    plant.production = ProductionSnapshot {
        current_power_kw: parse_numeric_string(raw.current_power.as_deref(), "current_power", id)?
            .map(|w| w / 1000.0),
        energy_total_kwh: parse_numeric_string(raw.total_energy.as_deref(), "total_energy", id)?,
        ..ProductionSnapshot::default()
    };
    plant.network_status = network_status(raw.status);
    Ok(plant)
}

pub(crate) fn normalize_alarm(raw: &RawAlarm) -> Result<NewAlert> {
    let id = raw
        .alarm_id
        .ok_or_else(|| Error::Normalization("alarm record has no id".to_string()))?;
    let started_at = raw
        .start_time
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| Error::Normalization(format!("alarm {id} has no valid start_time")))?;

    Ok(NewAlert {
        vendor_alert_id: id.to_string(),
        vendor_plant_id: raw.plant_id.map(|p| p.to_string()),
        title: raw
            .alarm_code
            .clone()
            .unwrap_or_else(|| format!("alarm {id}")),
        description: raw.alarm_message.clone(),
        severity: severity(raw.alarm_level)?,
        status: match raw.status {
            Some(1) => AlertStatus::Resolved,
            _ => AlertStatus::Open,
        },
        started_at,
        ended_at: raw.end_time.as_deref().and_then(parse_timestamp),
        metadata: serde_json::json!({
            "alarm_code": raw.alarm_code,
            "alarm_level": raw.alarm_level,
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
            VendorId(2),
            "growatt-test",
            VendorKind::Growatt,
            OrgId(Uuid::new_v4()),
            HashMap::new(),
            None,
        )
        .unwrap();
        vendor.api_base = Some(base.to_string());
        vendor
    }

    fn plant_record(id: i64) -> serde_json::Value {
        serde_json::json!({
            "plant_id": id,
            "name": format!("plant {id}"),
            "peak_power": "10.0",
            "current_power": "2500",
            "status": 1,
        })
    }

    fn plant_page(count: u64, ids: std::ops::Range<i64>) -> String {
        serde_json::json!({
            "error_code": 0,
            "error_msg": null,
            "data": {
                "count": count,
                "plants": ids.map(plant_record).collect::<Vec<_>>(),
            },
        })
        .to_string()
    }

    #[tokio::test]
    async fn plant_listing_pages_until_reported_count_is_reached() {
        let mut server = mockito::Server::new_async().await;
        let page1 = server
            .mock("GET", "/v1/plant/list")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "1".into()))
            .with_header("content-type", "application/json")
            .with_body(plant_page(25, 0..20))
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/v1/plant/list")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "2".into()))
            .with_header("content-type", "application/json")
            .with_body(plant_page(25, 20..25))
            .create_async()
            .await;

        let adapter = GrowattAdapter::new(reqwest::Client::new(), None);
        let vendor = vendor_at(&server.url());
        let fetched = adapter.list_plants(&vendor, "tok").await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(fetched.plants.len(), 25);
        assert_eq!(fetched.total_reported, Some(25));
    }

    #[tokio::test]
    async fn nonzero_error_code_rejects_the_listing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/plant/list")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error_code": 10011, "error_msg": "permission denied"}"#)
            .create_async()
            .await;

        let adapter = GrowattAdapter::new(reqwest::Client::new(), None);
        let vendor = vendor_at(&server.url());
        let err = adapter.list_plants(&vendor, "tok").await.unwrap_err();
        match err {
            Error::VendorApi { body, .. } => {
                assert!(body.contains("10011"));
                assert!(body.contains("permission denied"));
            }
            other => panic!("expected vendor api error, got {other:?}"),
        }
    }

    #[test]
    fn plant_normalization_parses_numeric_strings() {
        let raw: RawPlant = serde_json::from_value(serde_json::json!({
            "plant_id": 9001,
            "name": "Farm West",
            "latitude": "33.91",
            "longitude": "-5.2",
            "city": "Meknes",
            "country": "Morocco",
            "peak_power": "120.5",
            "current_power": "80500",
            "total_energy": "240113.7",
            "status": 1,
        }))
        .unwrap();

        let plant = normalize_plant(&raw).unwrap();
        assert_eq!(plant.vendor_plant_id, "9001");
        assert_eq!(plant.capacity_kw, Some(120.5));
        assert_eq!(plant.production.current_power_kw, Some(80.5));
        assert_eq!(plant.location.latitude, Some(33.91));
        assert_eq!(plant.location.address.as_deref(), Some("Meknes, Morocco"));
        assert_eq!(plant.network_status, NetworkStatus::Online);
    }

    #[test]
    fn garbled_numeric_string_fails_normalization() {
        let raw: RawPlant = serde_json::from_value(serde_json::json!({
            "plant_id": 9002,
            "name": "Farm East",
            "peak_power": "n/a",
        }))
        .unwrap();
        assert!(matches!(normalize_plant(&raw), Err(Error::Normalization(_))));
    }

    #[test]
    fn empty_numeric_string_is_absent_not_an_error() {
        let raw: RawPlant = serde_json::from_value(serde_json::json!({
            "plant_id": 9003,
            "name": "Farm South",
            "peak_power": "",
        }))
        .unwrap();
        assert_eq!(normalize_plant(&raw).unwrap().capacity_kw, None);
    }

    #[test]
    fn alarm_normalization_parses_local_datetimes() {
        let raw: RawAlarm = serde_json::from_value(serde_json::json!({
            "alarm_id": 42,
            "plant_id": 9001,
            "alarm_code": "203",
            "alarm_message": "inverter fault",
            "alarm_level": 3,
            "start_time": "2024-06-10 08:30:00",
            "end_time": "2024-06-10 09:30:00",
            "status": 1,
        }))
        .unwrap();

        let alert = normalize_alarm(&raw).unwrap();
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.downtime().unwrap().num_minutes(), 60);
    }

    #[test]
    fn severity_table_covers_all_levels() {
        assert_eq!(severity(Some(1)).unwrap(), AlertSeverity::Low);
        assert_eq!(severity(Some(4)).unwrap(), AlertSeverity::Critical);
        assert!(severity(Some(0)).is_err());
        assert!(severity(None).is_err());
    }
}
