//! Fake CMSV6 vendor server for local development: answers the login
//! action, the vehicle listing, the device-status action, and a
//! permissive catch-all for the remaining StandardApiAction family.

mod fleet;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use fleet::Vehicle;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Clone)]
struct AppState {
    account: String,
    password: String,
    sessions: Arc<Mutex<HashSet<String>>>,
    fleet: Arc<Vec<Vehicle>>,
}

#[tokio::main]
async fn main() {
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:6605".to_string());
    let account = env::var("SIM_ACCOUNT").unwrap_or_else(|_| "fleet".to_string());
    let password = env::var("SIM_PASSWORD").unwrap_or_else(|_| "secret".to_string());
    let num_devices: usize = env::var("DEVICES")
        .unwrap_or_else(|_| "25".to_string())
        .parse()
        .unwrap_or(25);

    tracing_subscriber::fmt::init();

    info!("Starting CMSV6 simulator");
    info!("HTTP server: {}, devices: {}", http_addr, num_devices);

    let fleet = {
        let mut rng = rand::thread_rng();
        Arc::new(fleet::generate_fleet(&mut rng, num_devices))
    };
    let state = AppState {
        account,
        password,
        sessions: Arc::new(Mutex::new(HashSet::new())),
        fleet,
    };

    let app = Router::new()
        .route("/StandardApiAction_login.action", get(login))
        .route("/StandardApiAction_queryUserVehicle.action", get(query_user_vehicle))
        .route("/StandardApiAction_getDeviceStatus.action", get(get_device_status))
        .route("/:action", get(any_action))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("Simulator listening on {}", http_addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("HTTP server error: {}", e);
    }
}

async fn login(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let account = params.get("account").map(String::as_str).unwrap_or("");
    let password = params.get("password").map(String::as_str).unwrap_or("");

    if account != state.account || password != state.password {
        warn!(account, "rejected login");
        return Json(json!({"result": 1, "description": "account or password error"}));
    }

    let token = uuid::Uuid::new_v4().simple().to_string();
    state.sessions.lock().unwrap().insert(token.clone());
    info!(account, "issued session");
    Json(json!({"result": 0, "jsession": token}))
}

fn check_session(state: &AppState, params: &HashMap<String, String>) -> Option<Json<Value>> {
    let token = params.get("jsession").map(String::as_str).unwrap_or("");
    if state.sessions.lock().unwrap().contains(token) {
        None
    } else {
        Some(Json(json!({"result": 5, "description": "session not exist"})))
    }
}

async fn query_user_vehicle(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if let Some(rejection) = check_session(&state, &params) {
        return rejection;
    }
    Json(json!({"result": 0, "vehicles": &*state.fleet}))
}

async fn get_device_status(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if let Some(rejection) = check_session(&state, &params) {
        return rejection;
    }

    let device = params.get("devIdno").map(String::as_str).unwrap_or("");
    let Some(vehicle) = state.fleet.iter().find(|v| v.device_number == device) else {
        return Json(json!({"result": 4, "description": "device not exist"}));
    };

    let status = {
        let mut rng = rand::thread_rng();
        fleet::random_status(&mut rng, vehicle.online_status == 1)
    };
    Json(json!({"result": 0, "status": status}))
}

/// All other StandardApiAction endpoints accept the call and answer
/// an empty success envelope, which is enough to exercise the proxy.
async fn any_action(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    if !action.starts_with("StandardApiAction_") || !action.ends_with(".action") {
        return Json(json!({"result": 6, "description": "unknown action"}));
    }
    if let Some(rejection) = check_session(&state, &params) {
        return rejection;
    }
    info!(action, "answering generic action");
    Json(json!({"result": 0}))
}
