//! The single boundary where vendor response envelopes are interpreted.
//!
//! Every CMSV6 action answers `{result: <number>, description?, ...}`;
//! `result == 0` is the only success signal. No other module looks at
//! the `result` field.

use crate::errors::{Error, Result};
use serde_json::Value;

const DEFAULT_REJECTION: &str = "vendor returned a non-success result";

/// Checks the vendor envelope and hands back the full body on success.
pub fn normalize(body: Value) -> Result<Value> {
    match body.get("result").and_then(Value::as_i64) {
        Some(0) => Ok(body),
        Some(_) => Err(Error::VendorRejected(description_of(&body))),
        // An envelope without a numeric `result` is not a success the
        // caller can act on; surface whatever the vendor did say.
        None => Err(Error::VendorRejected(description_of(&body))),
    }
}

fn description_of(body: &Value) -> String {
    body.get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_REJECTION.to_string())
}
