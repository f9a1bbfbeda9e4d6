//! HTTP transport for the Find My iPhone service.
//!
//! Every operation is a POST with a JSON body against
//! `https://{host}/fmipservice/device/{scope}/{endpoint}`. The service
//! shards accounts across regional hosts, so the transport is addressed
//! with an explicit host on every call rather than a fixed base URL.
//! Response headers matter only during discovery, so capturing them is
//! opt-in per request.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::fmip::error::{FmipError, FmipResult};
use crate::fmip::types::FmipConfig;

/// User agent of the official client build this library identifies as.
pub const USER_AGENT: &str = "FindMyiPhone/376 CFNetwork/672.0.8 Darwin/14.0.0";

/// Raw response handed back by the transport. The status is reported,
/// not interpreted; callers decide what a non-success status means.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Response headers; populated only when capture was requested.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    /// Case-insensitive response-header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ─── Transport trait ────────────────────────────────────────────────────────

/// Pluggable request executor.
///
/// Implementations must be `Send + Sync` so a client can be driven from
/// async tasks behind an `Arc`.
#[async_trait]
pub trait FmipTransport: Send + Sync {
    /// POST `body` to `https://{host}{path}`. Response headers are
    /// captured only when `capture_headers` is set.
    async fn send(
        &self,
        host: &str,
        path: &str,
        body: &Value,
        capture_headers: bool,
    ) -> FmipResult<RawResponse>;
}

#[async_trait]
impl<T: FmipTransport + ?Sized> FmipTransport for Arc<T> {
    async fn send(
        &self,
        host: &str,
        path: &str,
        body: &Value,
        capture_headers: bool,
    ) -> FmipResult<RawResponse> {
        (**self).send(host, path, body, capture_headers).await
    }
}

// ─── HTTP transport ─────────────────────────────────────────────────────────

/// reqwest-backed transport carrying the fixed header set the service
/// requires and HTTP basic auth from the account credentials.
pub struct HttpTransport {
    client: reqwest::Client,
    username: String,
    password: String,
}

impl HttpTransport {
    /// Build a transport from connection configuration.
    pub fn new(config: &FmipConfig) -> FmipResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(USER_AGENT)
            .build()?;

        debug!("fmip transport created (verify_tls={})", config.verify_tls);

        Ok(HttpTransport {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl FmipTransport for HttpTransport {
    async fn send(
        &self,
        host: &str,
        path: &str,
        body: &Value,
        capture_headers: bool,
    ) -> FmipResult<RawResponse> {
        let url = format!("https://{}{}", host, path);
        debug!("fmip → POST {}", url);

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept-Language", "en-us")
            .header("Content-Type", "application/json; charset=utf-8")
            .header("X-Apple-Realm-Support", "1.0")
            .header("X-Apple-Find-Api-Ver", "3.0")
            .header("X-Apple-Authscheme", "UserIdGuest")
            .body(body.to_string())
            .send()
            .await?;

        let status = resp.status().as_u16();
        let headers = if capture_headers {
            resp.headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        v.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect()
        } else {
            HashMap::new()
        };
        let body = resp.text().await?;

        if !(200..300).contains(&status) {
            warn!("fmip ← HTTP {}: {}", status, body);
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

// ─── Scripted transport (for tests and offline use) ─────────────────────────

/// A request recorded by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub host: String,
    pub path: String,
    pub body: Value,
    pub capture_headers: bool,
}

/// An in-memory transport that replays queued responses in order and
/// records every request for assertions.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<RawResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedTransport {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Queue a full raw response.
    pub fn push_response(&self, resp: RawResponse) {
        self.responses.lock().unwrap().push_back(resp);
    }

    /// Queue a headerless JSON response.
    pub fn push_json(&self, status: u16, body: &str) {
        self.push_response(RawResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string(),
        });
    }

    /// Queue the same headerless JSON response `n` times.
    pub fn push_json_times(&self, status: u16, body: &str, n: usize) {
        for _ in 0..n {
            self.push_json(status, body);
        }
    }

    /// Queue a response with the given headers.
    pub fn push_with_headers(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        self.push_response(RawResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
        });
    }

    /// Everything sent through this transport so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl FmipTransport for ScriptedTransport {
    async fn send(
        &self,
        host: &str,
        path: &str,
        body: &Value,
        capture_headers: bool,
    ) -> FmipResult<RawResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            host: host.to_string(),
            path: path.to_string(),
            body: body.clone(),
            capture_headers,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FmipError::Transport("scripted transport exhausted".to_string()))
    }
}
