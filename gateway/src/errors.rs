use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("caller identity missing or invalid")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown action '{action}' for feature area {area}")]
    UnknownAction { area: &'static str, action: String },

    #[error("vendor rejected request: {0}")]
    VendorRejected(String),

    #[error("vendor login failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("vendor unavailable: {0}")]
    VendorUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure came from the vendor's logical envelope
    /// (`result != 0`) as opposed to the transport underneath it.
    pub fn is_vendor_rejection(&self) -> bool {
        matches!(self, Error::VendorRejected(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
