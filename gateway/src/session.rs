use crate::config::VendorConfig;
use crate::errors::{Error, Result};
use crate::metrics::VENDOR_LOGINS_TOTAL;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Fixed lifetime of a vendor session from issuance.
const SESSION_TTL_SECS: i64 = 3600;

/// Fixed cache name the session survives restarts under.
pub const SESSION_CACHE_NAME: &str = "cmsv6_session.json";

/// An authenticated vendor session. Valid iff `now < expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub obtained_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn issued_now(token: String) -> Self {
        let now = Utc::now();
        Self {
            token,
            obtained_at: now,
            expires_at: now + Duration::seconds(SESSION_TTL_SECS),
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Where the current session is cached between calls (and restarts).
/// Injected so the refresh-coalescing logic is testable without a
/// real storage backend.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-process cache; the default for library embedding.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.inner.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().unwrap() = None;
        Ok(())
    }
}

/// JSON-file cache under a fixed name, so a restarted process reuses
/// a still-valid session instead of logging in again.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SESSION_CACHE_NAME),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(session) => Ok(Some(session)),
                Err(e) => {
                    // An unreadable cache is treated as no cache, so
                    // the manager falls through to a fresh login.
                    warn!(path = %self.path.display(), error = %e, "discarding corrupt session cache");
                    let _ = std::fs::remove_file(&self.path);
                    Ok(None)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_vec(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct LoginGate {
    // Count and replayable copy of the most recent failed login.
    failed: Option<(u64, Error)>,
}

/// Single source of truth for "are we authenticated to the vendor".
pub struct SessionManager {
    config: VendorConfig,
    http: reqwest::Client,
    store: Box<dyn SessionStore>,
    // Held across the login round trip so concurrent acquires during
    // an expired-session window coalesce onto one vendor login; also
    // carries a failed login's outcome to the callers queued on it.
    gate: tokio::sync::Mutex<LoginGate>,
    failures: AtomicU64,
}

impl SessionManager {
    pub fn new(config: VendorConfig, http: reqwest::Client, store: Box<dyn SessionStore>) -> Self {
        Self {
            config,
            http,
            store,
            gate: tokio::sync::Mutex::new(LoginGate { failed: None }),
            failures: AtomicU64::new(0),
        }
    }

    /// Returns the cached session if still valid, otherwise performs
    /// exactly one vendor login shared by all concurrent callers.
    /// A login failure is delivered to every caller that was waiting
    /// on it; only a later acquire starts a fresh attempt.
    pub async fn acquire(&self) -> Result<Session> {
        if let Some(session) = self.store.load()? {
            if session.is_valid(Utc::now()) {
                debug!("reusing cached vendor session");
                return Ok(session);
            }
        }

        let failures_seen = self.failures.load(Ordering::Acquire);
        let mut gate = self.gate.lock().await;

        // Another caller may have finished the login while we waited.
        if let Some(session) = self.store.load()? {
            if session.is_valid(Utc::now()) {
                return Ok(session);
            }
        }

        // The login this caller queued behind has failed; that
        // failure is this caller's failure too.
        if let Some((count, failure)) = &gate.failed {
            if *count > failures_seen {
                return Err(replay_failure(failure));
            }
        }

        self.login_and_record(&mut gate).await
    }

    /// Discards any cached session and logs in again.
    pub async fn refresh(&self) -> Result<Session> {
        let mut gate = self.gate.lock().await;
        self.store.clear()?;
        self.login_and_record(&mut gate).await
    }

    async fn login_and_record(&self, gate: &mut LoginGate) -> Result<Session> {
        match self.login().await {
            Ok(session) => {
                gate.failed = None;
                self.store.save(&session)?;
                Ok(session)
            }
            Err(e) => {
                let count = self.failures.fetch_add(1, Ordering::AcqRel) + 1;
                gate.failed = Some((count, replay_failure(&e)));
                Err(e)
            }
        }
    }

    async fn login(&self) -> Result<Session> {
        self.config.validate()?;
        info!(account = %self.config.account, "logging in to vendor");
        VENDOR_LOGINS_TOTAL.inc();

        let url = self.config.action_url("StandardApiAction_login.action");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("account", self.config.account.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;

        if let Some(result) = body.get("result").and_then(Value::as_i64) {
            if result != 0 {
                let description = body
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("vendor login rejected")
                    .to_string();
                return Err(Error::Auth(description));
            }
        }

        let token = body
            .get("jsession")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("login response missing jsession".to_string()))?;

        Ok(Session::issued_now(token.to_string()))
    }
}

/// Rebuilds a login failure so it can be handed to every caller that
/// was waiting on the same login. String-carrying variants survive
/// as-is; anything transport-shaped collapses into `VendorUnavailable`
/// with the original message.
fn replay_failure(failure: &Error) -> Error {
    match failure {
        Error::Auth(msg) => Error::Auth(msg.clone()),
        Error::Configuration(msg) => Error::Configuration(msg.clone()),
        Error::VendorUnavailable(msg) => Error::VendorUnavailable(msg.clone()),
        other => Error::VendorUnavailable(other.to_string()),
    }
}
