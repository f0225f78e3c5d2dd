use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    #[serde(rename = "deviceNumber")]
    pub device_number: String,
    pub name: String,
    #[serde(rename = "onlineStatus")]
    pub online_status: i64,
    #[serde(rename = "simNumber")]
    pub sim_number: String,
}

pub fn generate_fleet(rng: &mut impl Rng, count: usize) -> Vec<Vehicle> {
    (0..count)
        .map(|i| Vehicle {
            device_number: format!("8691234567{:05}", i),
            name: format!("truck-{}", i),
            // Roughly one in five devices is offline at any moment.
            online_status: if rng.gen_bool(0.8) { 1 } else { 0 },
            sim_number: format!("890119{:09}", rng.gen_range(0..1_000_000_000u64)),
        })
        .collect()
}

pub fn random_status(rng: &mut impl Rng, online: bool) -> serde_json::Value {
    serde_json::json!({
        "online": if online { 1 } else { 0 },
        "signal": rng.gen_range(5.0..31.0),
        "battery": rng.gen_range(20.0..100.0),
        "storage": rng.gen_range(1.0..64.0),
        "dataUsage": rng.gen_range(0.0..512.0),
        "lat": rng.gen_range(50.0..54.0),
        "lng": rng.gen_range(3.0..7.0),
        "gpsTime": chrono::Utc::now(),
    })
}
