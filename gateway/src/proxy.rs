//! The generic action executor. One pass per call:
//! `Validating -> Calling -> {Succeeded | VendorRejected | TransportFailed}`,
//! never a retry.

use crate::actions::{ActionSpec, FeatureArea, Params};
use crate::auth::IdentityVerifier;
use crate::config::VendorConfig;
use crate::envelope;
use crate::errors::{Error, Result};
use crate::metrics::{
    VENDOR_CALLS_TOTAL, VENDOR_REJECTIONS_TOTAL, VENDOR_TRANSPORT_FAILURES_TOTAL,
};
use crate::session::SessionManager;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// One proxy invocation.
#[derive(Debug)]
pub struct ProxyRequest {
    pub bearer_token: String,
    pub area: FeatureArea,
    pub action: String,
    pub params: Params,
}

/// A successful vendor answer: the full envelope, plus the per-action
/// convenience field when the catalog names one.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub data: Value,
    pub projected: Option<Value>,
}

pub struct ActionProxy {
    http: reqwest::Client,
    config: VendorConfig,
    sessions: Arc<SessionManager>,
    identity: Arc<dyn IdentityVerifier>,
}

impl ActionProxy {
    pub fn new(
        config: VendorConfig,
        http: reqwest::Client,
        sessions: Arc<SessionManager>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            http,
            config,
            sessions,
            identity,
        }
    }

    /// Builds the shared HTTP client with the configured per-call
    /// timeout. Used for both the proxy and the session manager so
    /// every vendor call is bounded.
    pub fn build_http_client(config: &VendorConfig) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(client)
    }

    /// Resolves the caller's bearer token, or rejects it before any
    /// vendor work happens.
    pub async fn verify_identity(&self, bearer_token: &str) -> Result<crate::auth::CallerIdentity> {
        self.identity.verify(bearer_token).await
    }

    pub async fn execute(&self, request: ProxyRequest) -> Result<ProxyResponse> {
        let caller = self.verify_identity(&request.bearer_token).await?;

        let spec = request
            .area
            .find_action(&request.action)
            .ok_or_else(|| Error::UnknownAction {
                area: request.area.as_str(),
                action: request.action.clone(),
            })?;

        let mut query = build_query(spec, &request.params)?;

        let session = self.sessions.acquire().await?;
        query.push(("jsession", session.token));

        debug!(
            area = request.area.as_str(),
            action = spec.name,
            user = %caller.user_id,
            "forwarding vendor action"
        );

        let body = self.call_vendor(spec.endpoint, &query).await?;
        let body = envelope::normalize(body).inspect_err(|e| {
            if e.is_vendor_rejection() {
                VENDOR_REJECTIONS_TOTAL.inc();
                warn!(action = spec.name, error = %e, "vendor rejected action");
            }
        })?;

        let projected = spec.project.and_then(|field| body.get(field).cloned());

        Ok(ProxyResponse {
            data: body,
            projected,
        })
    }

    async fn call_vendor(&self, endpoint: &str, query: &[(&'static str, String)]) -> Result<Value> {
        VENDOR_CALLS_TOTAL.inc();
        let url = self.config.action_url(endpoint);

        let track_transport = |e: reqwest::Error| {
            VENDOR_TRANSPORT_FAILURES_TOTAL.inc();
            Error::Transport(e)
        };

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(track_transport)?
            .error_for_status()
            .map_err(track_transport)?;

        let body: Value = response.json().await.map_err(track_transport)?;
        Ok(body)
    }
}

/// Maps caller parameters onto vendor query parameters.
///
/// Forwarding is presence-based: a supplied `0` or `""` goes out on
/// the wire; only absent keys are omitted. Missing required keys fail
/// before any HTTP call is made.
fn build_query(spec: &ActionSpec, params: &Params) -> Result<Vec<(&'static str, String)>> {
    let mut query = Vec::with_capacity(spec.params.len() + 1);
    for param in spec.params {
        match params.get(param.source) {
            Some(value) => query.push((param.vendor_name, value.to_string())),
            None if param.required => {
                return Err(Error::InvalidRequest(format!(
                    "missing required parameter '{}' for action '{}'",
                    param.source, spec.name
                )));
            }
            None => {}
        }
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ParamValue;
    use std::collections::HashMap;

    fn report_spec(name: &str) -> &'static ActionSpec {
        FeatureArea::Report.find_action(name).unwrap()
    }

    #[test]
    fn missing_required_param_is_invalid_request() {
        let spec = report_spec("queryMileageDetail");
        let mut params: Params = HashMap::new();
        params.insert("vehicle".to_string(), ParamValue::from("V-1"));
        // begin/end absent
        let err = build_query(spec, &params).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn optional_params_omitted_when_absent() {
        let spec = report_spec("queryMileageDetail");
        let mut params: Params = HashMap::new();
        params.insert("vehicle".to_string(), ParamValue::from("V-1"));
        params.insert("begin".to_string(), ParamValue::from("2024-01-01 00:00:00"));
        params.insert("end".to_string(), ParamValue::from("2024-01-02 00:00:00"));
        let query = build_query(spec, &params).unwrap();
        assert_eq!(
            query,
            vec![
                ("vehiIdno", "V-1".to_string()),
                ("begintime", "2024-01-01 00:00:00".to_string()),
                ("endtime", "2024-01-02 00:00:00".to_string()),
            ]
        );
    }

    #[test]
    fn zero_and_empty_values_are_forwarded() {
        // Presence decides forwarding; falsy values still go out.
        let spec = report_spec("queryAlarmDetail");
        let mut params: Params = HashMap::new();
        params.insert("vehicle".to_string(), ParamValue::from("V-1"));
        params.insert("begin".to_string(), ParamValue::from("a"));
        params.insert("end".to_string(), ParamValue::from("b"));
        params.insert("handled".to_string(), ParamValue::from(0i64));
        params.insert("alarmType".to_string(), ParamValue::from(""));
        let query = build_query(spec, &params).unwrap();
        assert!(query.contains(&("handle", "0".to_string())));
        assert!(query.contains(&("armType", String::new())));
    }

    #[test]
    fn vendor_names_used_on_the_wire() {
        let spec = FeatureArea::Device.find_action("addDevice").unwrap();
        let mut params: Params = HashMap::new();
        params.insert("device".to_string(), ParamValue::from("869123456789012"));
        params.insert("sim".to_string(), ParamValue::from("89011"));
        let query = build_query(spec, &params).unwrap();
        assert_eq!(
            query,
            vec![
                ("devIdno", "869123456789012".to_string()),
                ("simCard", "89011".to_string()),
            ]
        );
    }
}
