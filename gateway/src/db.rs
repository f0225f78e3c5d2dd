use crate::errors::Result;
use crate::model::{
    CommandRecord, Device, DeviceStatus, Stream, Subscription, SubscriptionStatus, TelemetrySample,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub async fn make_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Fields fed into the IMEI-keyed device upsert. `last_seen` is only
/// written when the device comes online; an upsert that does not
/// change the online state keeps the old value, so re-running with
/// unchanged vendor data leaves the row byte-identical.
#[derive(Debug, Clone)]
pub struct DeviceUpsert {
    pub imei: String,
    pub vendor_id: String,
    pub name: String,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub status: DeviceStatus,
    pub owner: Option<String>,
}

pub async fn upsert_device(pool: &PgPool, upsert: &DeviceUpsert) -> Result<Device> {
    let last_seen = if upsert.status == DeviceStatus::Online {
        Some(Utc::now())
    } else {
        None
    };

    let device = sqlx::query_as::<_, Device>(
        r#"
        INSERT INTO devices (imei, vendor_id, name, model, firmware_version, status, last_seen, owner)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (imei) DO UPDATE SET
            vendor_id = EXCLUDED.vendor_id,
            name = EXCLUDED.name,
            model = COALESCE(EXCLUDED.model, devices.model),
            firmware_version = COALESCE(EXCLUDED.firmware_version, devices.firmware_version),
            status = EXCLUDED.status,
            last_seen = CASE
                WHEN EXCLUDED.status = 'online' AND devices.status <> 'online'
                    THEN EXCLUDED.last_seen
                ELSE devices.last_seen
            END,
            owner = COALESCE(EXCLUDED.owner, devices.owner)
        RETURNING id, imei, vendor_id, name, model, firmware_version, status, last_seen, owner
        "#,
    )
    .bind(&upsert.imei)
    .bind(&upsert.vendor_id)
    .bind(&upsert.name)
    .bind(&upsert.model)
    .bind(&upsert.firmware_version)
    .bind(upsert.status.as_str())
    .bind(last_seen)
    .bind(&upsert.owner)
    .fetch_one(pool)
    .await?;

    Ok(device)
}

pub async fn get_device_by_imei(pool: &PgPool, imei: &str) -> Result<Option<Device>> {
    let device = sqlx::query_as::<_, Device>(
        "SELECT id, imei, vendor_id, name, model, firmware_version, status, last_seen, owner
         FROM devices WHERE imei = $1",
    )
    .bind(imei)
    .fetch_optional(pool)
    .await?;

    Ok(device)
}

pub async fn update_device_status(
    pool: &PgPool,
    device_id: Uuid,
    status: DeviceStatus,
    last_seen: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        "UPDATE devices SET status = $2, last_seen = COALESCE($3, last_seen) WHERE id = $1",
    )
    .bind(device_id)
    .bind(status.as_str())
    .bind(last_seen)
    .execute(pool)
    .await?;

    Ok(())
}

/// Append-only; a sample is never updated or deleted.
pub async fn insert_telemetry(pool: &PgPool, sample: &TelemetrySample) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO telemetry
            (device_id, ts, signal_strength, battery, free_storage, data_usage, latitude, longitude)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(sample.device_id)
    .bind(sample.timestamp)
    .bind(sample.signal_strength)
    .bind(sample.battery)
    .bind(sample.free_storage)
    .bind(sample.data_usage)
    .bind(sample.latitude)
    .bind(sample.longitude)
    .execute(pool)
    .await?;

    Ok(())
}

/// Newest-first page of samples for one device.
pub async fn latest_telemetry(
    pool: &PgPool,
    device_id: Uuid,
    limit: i64,
) -> Result<Vec<TelemetrySample>> {
    let samples = sqlx::query_as::<_, TelemetrySample>(
        "SELECT device_id, ts AS timestamp, signal_strength, battery, free_storage,
                data_usage, latitude, longitude
         FROM telemetry
         WHERE device_id = $1
         ORDER BY ts DESC
         LIMIT $2",
    )
    .bind(device_id)
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await?;

    Ok(samples)
}

/// One stream row per device, overwritten on each refresh.
pub async fn upsert_stream(pool: &PgPool, device_id: Uuid, url: &str, transport: &str) -> Result<Stream> {
    let stream = sqlx::query_as::<_, Stream>(
        r#"
        INSERT INTO streams (device_id, url, transport, last_active)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (device_id) DO UPDATE SET
            url = EXCLUDED.url,
            transport = EXCLUDED.transport,
            last_active = EXCLUDED.last_active
        RETURNING device_id, url, transport, last_active
        "#,
    )
    .bind(device_id)
    .bind(url)
    .bind(transport)
    .fetch_one(pool)
    .await?;

    Ok(stream)
}

pub async fn get_stream(pool: &PgPool, device_id: Uuid) -> Result<Option<Stream>> {
    let stream = sqlx::query_as::<_, Stream>(
        "SELECT device_id, url, transport, last_active FROM streams WHERE device_id = $1",
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(stream)
}

/// Flips the subscription and the device's derived status together.
/// Suspension parks the device in `maintenance`; activation returns
/// it to `offline` until the next sync observes it online.
pub async fn set_subscription_status(
    pool: &PgPool,
    device_id: Uuid,
    status: SubscriptionStatus,
) -> Result<()> {
    let derived = match status {
        SubscriptionStatus::Active => DeviceStatus::Offline,
        SubscriptionStatus::Suspended | SubscriptionStatus::Cancelled => DeviceStatus::Maintenance,
    };

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE subscriptions SET status = $2 WHERE device_id = $1")
        .bind(device_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE devices SET status = $2 WHERE id = $1")
        .bind(device_id)
        .bind(derived.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(())
}

pub async fn get_subscription(pool: &PgPool, device_id: Uuid) -> Result<Option<Subscription>> {
    let subscription = sqlx::query_as::<_, Subscription>(
        "SELECT device_id, plan, status, valid_from, valid_until
         FROM subscriptions WHERE device_id = $1",
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(subscription)
}

/// Write-once audit row; there is no update path for commands.
pub async fn insert_command(pool: &PgPool, record: &CommandRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO commands
            (id, device_id, issued_by, command_type, payload, delivery_status, vendor_response, issued_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(record.id)
    .bind(record.device_id)
    .bind(&record.issued_by)
    .bind(&record.command_type)
    .bind(&record.payload)
    .bind(&record.delivery_status)
    .bind(&record.vendor_response)
    .bind(record.issued_at)
    .execute(pool)
    .await?;

    Ok(())
}
