use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse lifecycle status derived from vendor-reported flags.
/// Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Maintenance,
}

impl TryFrom<String> for DeviceStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "online" => Ok(DeviceStatus::Online),
            "offline" => Ok(DeviceStatus::Offline),
            "maintenance" => Ok(DeviceStatus::Maintenance),
            other => Err(format!("unknown device status '{other}'")),
        }
    }
}

impl DeviceStatus {
    /// Vendor online flag: `1` means online, anything else offline.
    pub fn from_vendor_flag(flag: i64) -> Self {
        if flag == 1 {
            DeviceStatus::Online
        } else {
            DeviceStatus::Offline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Maintenance => "maintenance",
        }
    }
}

/// A tracked device, joined to vendor records by IMEI.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: uuid::Uuid,
    pub imei: String,
    pub vendor_id: String,
    pub name: String,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: DeviceStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub owner: Option<String>,
}

/// One telemetry sample; append-only, newest-first reads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TelemetrySample {
    pub device_id: uuid::Uuid,
    pub timestamp: DateTime<Utc>,
    pub signal_strength: Option<f64>,
    pub battery: Option<f64>,
    pub free_storage: Option<f64>,
    pub data_usage: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Suspended,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "suspended" => Ok(SubscriptionStatus::Suspended),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(format!("unknown subscription status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub device_id: uuid::Uuid,
    pub plan: String,
    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Live-stream descriptor; at most one per device, overwritten on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Stream {
    pub device_id: uuid::Uuid,
    pub url: String,
    pub transport: String,
    pub last_active: DateTime<Utc>,
}

/// Write-once audit record for a command dispatched to a device.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommandRecord {
    pub id: uuid::Uuid,
    pub device_id: uuid::Uuid,
    pub issued_by: String,
    pub command_type: String,
    pub payload: serde_json::Value,
    pub delivery_status: String,
    pub vendor_response: Option<serde_json::Value>,
    pub issued_at: DateTime<Utc>,
}

/// One vehicle entry from the vendor's vehicle-listing action.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorVehicle {
    #[serde(rename = "deviceNumber")]
    pub device_number: String,
    #[serde(rename = "name", default)]
    pub name: String,
    #[serde(rename = "onlineStatus", default)]
    pub online_status: i64,
    #[serde(rename = "simNumber", default)]
    pub sim_number: Option<String>,
    #[serde(rename = "deviceType", default)]
    pub device_type: Option<String>,
    #[serde(rename = "firmware", default)]
    pub firmware: Option<String>,
}

/// Fields of interest from the vendor's device-status action.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorDeviceStatus {
    #[serde(rename = "online", default)]
    pub online: i64,
    #[serde(rename = "signal", default)]
    pub signal: Option<f64>,
    #[serde(rename = "battery", default)]
    pub battery: Option<f64>,
    #[serde(rename = "storage", default)]
    pub storage: Option<f64>,
    #[serde(rename = "dataUsage", default)]
    pub data_usage: Option<f64>,
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "lng", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "gpsTime", default)]
    pub gps_time: Option<chrono::DateTime<Utc>>,
}
