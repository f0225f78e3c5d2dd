//! Ingests vendor data into local storage: vehicle-list upserts,
//! append-only telemetry with derived device status, live-stream URL
//! synthesis, and the command audit trail.

use crate::actions::Params;
use crate::config::VendorConfig;
use crate::db::{self, DeviceUpsert};
use crate::envelope;
use crate::errors::{Error, Result};
use crate::metrics::{
    DEVICES_UPSERTED, SYNC_LATENCY_SECONDS, VENDOR_CALLS_TOTAL, VENDOR_TRANSPORT_FAILURES_TOTAL,
};
use crate::model::{
    CommandRecord, Device, DeviceStatus, Stream, TelemetrySample, VendorDeviceStatus, VendorVehicle,
};
use crate::proxy::{ActionProxy, ProxyRequest};
use crate::session::SessionManager;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

const VEHICLE_LIST_ENDPOINT: &str = "StandardApiAction_queryUserVehicle.action";
const DEVICE_STATUS_ENDPOINT: &str = "StandardApiAction_getDeviceStatus.action";

/// `0` selects the main stream, `1` the sub stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Main = 0,
    Sub = 1,
}

impl StreamType {
    pub fn as_digit(&self) -> u8 {
        *self as u8
    }
}

/// Bit-exact HLS playlist URL for a device channel. Pure string
/// synthesis; no vendor round trip.
pub fn hls_url(
    config: &VendorConfig,
    device_id: &str,
    channel: u8,
    stream_type: StreamType,
    token: &str,
) -> String {
    format!(
        "{}://{}:{}/hls/1_{}_{}_{}.m3u8?jsession={}",
        config.stream_scheme,
        config.stream_host,
        config.stream_port,
        device_id,
        channel,
        stream_type.as_digit(),
        token
    )
}

pub struct Syncer {
    config: VendorConfig,
    http: reqwest::Client,
    sessions: Arc<SessionManager>,
    pool: PgPool,
}

impl Syncer {
    pub fn new(
        config: VendorConfig,
        http: reqwest::Client,
        sessions: Arc<SessionManager>,
        pool: PgPool,
    ) -> Self {
        Self {
            config,
            http,
            sessions,
            pool,
        }
    }

    /// Fetches the vendor's vehicle list and upserts one device row
    /// per vehicle, keyed by IMEI. Re-running with unchanged vendor
    /// data is a no-op.
    pub async fn sync_vehicles(&self) -> Result<Vec<Device>> {
        let start = Instant::now();
        let body = self.call_vendor(VEHICLE_LIST_ENDPOINT, &[]).await?;

        let vehicles: Vec<VendorVehicle> = match body.get("vehicles") {
            Some(list) => serde_json::from_value(list.clone())?,
            None => Vec::new(),
        };

        let mut devices = Vec::with_capacity(vehicles.len());
        for vehicle in &vehicles {
            let upsert = DeviceUpsert {
                imei: vehicle.device_number.clone(),
                vendor_id: vehicle.device_number.clone(),
                name: if vehicle.name.is_empty() {
                    vehicle.device_number.clone()
                } else {
                    vehicle.name.clone()
                },
                model: vehicle.device_type.clone(),
                firmware_version: vehicle.firmware.clone(),
                status: DeviceStatus::from_vendor_flag(vehicle.online_status),
                owner: None,
            };
            devices.push(db::upsert_device(&self.pool, &upsert).await?);
        }

        DEVICES_UPSERTED.set(devices.len() as f64);
        SYNC_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
        info!(count = devices.len(), "vehicle sync completed");
        Ok(devices)
    }

    /// Fetches the current vendor status for one device, appends a
    /// telemetry sample, then derives the device's status. The
    /// telemetry insert is the primary record; a failed status
    /// derivation is logged and does not undo it.
    pub async fn sync_telemetry(&self, imei: &str) -> Result<TelemetrySample> {
        let start = Instant::now();
        let device = db::get_device_by_imei(&self.pool, imei)
            .await?
            .ok_or_else(|| Error::InvalidRequest(format!("unknown device IMEI '{imei}'")))?;

        let body = self
            .call_vendor(DEVICE_STATUS_ENDPOINT, &[("devIdno", imei.to_string())])
            .await?;

        let status: VendorDeviceStatus = match body.get("status") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => serde_json::from_value(body.clone())?,
        };

        let sample = TelemetrySample {
            device_id: device.id,
            timestamp: status.gps_time.unwrap_or_else(Utc::now),
            signal_strength: status.signal,
            battery: status.battery,
            free_storage: status.storage,
            data_usage: status.data_usage,
            latitude: status.latitude,
            longitude: status.longitude,
        };

        db::insert_telemetry(&self.pool, &sample).await?;

        let derived = DeviceStatus::from_vendor_flag(status.online);
        let last_seen = (derived == DeviceStatus::Online).then(Utc::now);
        if let Err(e) = db::update_device_status(&self.pool, device.id, derived, last_seen).await {
            // Telemetry history is the record of truth; the derived
            // status catches up on the next sync.
            warn!(imei, error = %e, "device status update failed after telemetry insert");
        }

        SYNC_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
        Ok(sample)
    }

    /// Synthesizes the HLS playlist URL for a device channel and
    /// overwrites the device's stream row with it.
    pub async fn resolve_live_stream_url(
        &self,
        imei: &str,
        channel: u8,
        stream_type: StreamType,
    ) -> Result<Stream> {
        let device = db::get_device_by_imei(&self.pool, imei)
            .await?
            .ok_or_else(|| Error::InvalidRequest(format!("unknown device IMEI '{imei}'")))?;

        let session = self.sessions.acquire().await?;
        let url = hls_url(
            &self.config,
            &device.vendor_id,
            channel,
            stream_type,
            &session.token,
        );

        db::upsert_stream(&self.pool, device.id, &url, "hls").await
    }

    /// Relays a control action through the proxy and appends one
    /// write-once audit row per dispatched command. Commands the
    /// vendor rejected or that failed in transit are still audited;
    /// requests that never reached the vendor (bad identity, unknown
    /// action, missing parameters) leave no trace.
    pub async fn dispatch_command(
        &self,
        proxy: &ActionProxy,
        bearer_token: &str,
        imei: &str,
        action: &str,
        params: Params,
    ) -> Result<CommandRecord> {
        let caller = proxy.verify_identity(bearer_token).await?;
        let device = db::get_device_by_imei(&self.pool, imei)
            .await?
            .ok_or_else(|| Error::InvalidRequest(format!("unknown device IMEI '{imei}'")))?;

        let payload = params_as_json(&params);
        let outcome = proxy
            .execute(ProxyRequest {
                bearer_token: bearer_token.to_string(),
                area: crate::actions::FeatureArea::Control,
                action: action.to_string(),
                params,
            })
            .await;

        // Failures before the vendor call (lost identity, unknown
        // action, missing parameters) dispatched nothing, so they
        // leave no audit row.
        let outcome = match outcome {
            Err(e) if !matches!(e, Error::VendorRejected(_) | Error::Transport(_)) => {
                return Err(e);
            }
            other => other,
        };

        let (delivery_status, vendor_response) = match &outcome {
            Ok(response) => ("delivered".to_string(), Some(response.data.clone())),
            Err(Error::VendorRejected(desc)) => (
                "rejected".to_string(),
                Some(serde_json::json!({ "description": desc })),
            ),
            Err(_) => ("failed".to_string(), None),
        };

        let record = CommandRecord {
            id: uuid::Uuid::new_v4(),
            device_id: device.id,
            issued_by: caller.user_id,
            command_type: action.to_string(),
            payload,
            delivery_status,
            vendor_response,
            issued_at: Utc::now(),
        };
        db::insert_command(&self.pool, &record).await?;

        outcome?;
        Ok(record)
    }

    async fn call_vendor(&self, endpoint: &str, extra: &[(&str, String)]) -> Result<Value> {
        let session = self.sessions.acquire().await?;
        let url = self.config.action_url(endpoint);

        let mut query: Vec<(&str, String)> = vec![("jsession", session.token)];
        query.extend(extra.iter().cloned());

        VENDOR_CALLS_TOTAL.inc();
        let track_transport = |e: reqwest::Error| {
            VENDOR_TRANSPORT_FAILURES_TOTAL.inc();
            Error::Transport(e)
        };

        let body: Value = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(track_transport)?
            .error_for_status()
            .map_err(track_transport)?
            .json()
            .await
            .map_err(track_transport)?;

        envelope::normalize(body)
    }
}

fn params_as_json(params: &Params) -> Value {
    let map: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| {
            let value = match v {
                crate::actions::ParamValue::Str(s) => Value::String(s.clone()),
                crate::actions::ParamValue::Num(n) => Value::from(*n),
            };
            (k.clone(), value)
        })
        .collect();
    Value::Object(map)
}
