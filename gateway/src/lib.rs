//! Fleet-telematics vendor gateway: session lifecycle, action
//! proxying, and telemetry synchronization against a CMSV6-style
//! telematics platform, backed by Postgres.

pub mod actions;
pub mod auth;
pub mod config;
pub mod db;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod poll;
pub mod proxy;
pub mod session;
pub mod sync;

pub use actions::{ActionSpec, FeatureArea, ParamSpec, ParamValue, Params};
pub use auth::{CallerIdentity, IdentityVerifier, StaticIdentityVerifier};
pub use config::VendorConfig;
pub use errors::{Error, Result};
pub use model::{Device, DeviceStatus, Stream, Subscription, SubscriptionStatus, TelemetrySample};
pub use proxy::{ActionProxy, ProxyRequest, ProxyResponse};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionManager, SessionStore};
pub use sync::{hls_url, StreamType, Syncer};
