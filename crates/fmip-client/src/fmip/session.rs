//! Partition discovery and device-list refresh.
//!
//! The service shards accounts across regional hosts. `initClient`
//! against the bootstrap host, with the username standing in for the
//! scope, answers with the account's real host and an opaque scope
//! token in response headers; every later call must target that
//! host/scope pair. `refreshClient` then returns the account's devices.

use log::{debug, info};
use serde_json::{json, Value};

use crate::fmip::error::{FmipError, FmipResult};
use crate::fmip::service::FmipClient;
use crate::fmip::types::{FmipDevice, FmipSession};

pub(crate) const MME_HOST_HEADER: &str = "X-Apple-MMe-Host";
pub(crate) const MME_SCOPE_HEADER: &str = "X-Apple-MMe-Scope";

impl FmipClient {
    /// Resolve the account's service partition, then load the device
    /// list. The response body is of no interest here; the partition
    /// comes back in headers.
    pub(crate) async fn discover(&mut self) -> FmipResult<()> {
        let body = json!({ "clientContext": self.client_context });
        let path = format!("/fmipservice/device/{}/initClient", self.config.username);

        let resp = self
            .transport
            .send(&self.config.initial_host, &path, &body, true)
            .await?;

        if !resp.is_success() {
            return Err(FmipError::Upstream {
                status: resp.status,
                body: resp.body,
            });
        }

        let host = required_header(resp.header(MME_HOST_HEADER), MME_HOST_HEADER)?;
        let scope = required_header(resp.header(MME_SCOPE_HEADER), MME_SCOPE_HEADER)?;

        info!("fmip partition resolved: host={} scope={}", host, scope);
        self.session = Some(FmipSession { host, scope });

        self.refresh().await
    }

    /// Reload the device list from the service and merge it into the
    /// registry by device id.
    pub async fn refresh(&mut self) -> FmipResult<()> {
        let session = self
            .session
            .clone()
            .ok_or_else(|| FmipError::Discovery("service partition not resolved".to_string()))?;

        let body = json!({
            "clientContext": self.client_context,
            "serverContext": self.server_context,
        });
        let path = format!("/fmipservice/device/{}/refreshClient", session.scope);

        let resp = self
            .transport
            .send(&session.host, &path, &body, false)
            .await?;

        if !resp.is_success() {
            return Err(FmipError::Upstream {
                status: resp.status,
                body: resp.body,
            });
        }

        let parsed: Value = serde_json::from_str(&resp.body)
            .map_err(|e| FmipError::Protocol(format!("refresh response is not valid JSON: {}", e)))?;
        let content = parsed
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                FmipError::Protocol("refresh response has no content collection".to_string())
            })?;

        let devices: Vec<FmipDevice> = content
            .iter()
            .map(|record| serde_json::from_value(record.clone()))
            .collect::<Result<_, _>>()
            .map_err(|e| FmipError::Protocol(format!("undecodable device record: {}", e)))?;

        debug!("fmip refresh: {} device record(s)", devices.len());
        self.registry.merge(devices);
        Ok(())
    }
}

fn required_header(value: Option<&str>, name: &str) -> FmipResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(FmipError::Discovery(format!(
            "response missing {} header",
            name
        ))),
    }
}
