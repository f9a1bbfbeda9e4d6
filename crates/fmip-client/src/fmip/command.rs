//! Device command descriptors, validation, and dispatch.
//!
//! Every remote command is one POST with the same envelope (client
//! context + server context + device id + command fields) and the same
//! single-element response decoding rule. Commands differ only in
//! endpoint name, payload fields, and which field of `content[0]`
//! carries the result, so they share one dispatcher driven by a
//! descriptor table instead of seven near-duplicate functions.

use log::debug;
use serde_json::{json, Map, Value};

use crate::fmip::error::{FmipError, FmipResult};
use crate::fmip::service::FmipClient;

/// The set of device commands the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SendMessage,
    PlaySound,
    LostDevice,
    NotifyWhenFound,
    LockAndMessage,
    RemoteLock,
    RemoteWipe,
}

/// Wire-level description of one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Endpoint name, the last URL path segment.
    pub endpoint: &'static str,
    /// Field of `content[0]` carrying the command's result.
    pub result_field: &'static str,
    /// Whether the command carries a device passcode.
    pub needs_passcode: bool,
    /// Whether the session-level email preference is injected.
    pub sends_email_updates: bool,
}

impl CommandKind {
    pub fn spec(self) -> CommandSpec {
        match self {
            CommandKind::SendMessage => CommandSpec {
                endpoint: "sendMessage",
                result_field: "msg",
                needs_passcode: false,
                sends_email_updates: true,
            },
            CommandKind::PlaySound => CommandSpec {
                endpoint: "playSound",
                result_field: "snd",
                needs_passcode: false,
                sends_email_updates: false,
            },
            CommandKind::LostDevice => CommandSpec {
                endpoint: "lostDevice",
                result_field: "lostDevice",
                needs_passcode: true,
                sends_email_updates: true,
            },
            CommandKind::NotifyWhenFound => CommandSpec {
                endpoint: "saveLocFoundPref",
                result_field: "locFoundEnabled",
                needs_passcode: false,
                sends_email_updates: false,
            },
            CommandKind::LockAndMessage => CommandSpec {
                endpoint: "lockAndMessage",
                result_field: "remoteLock",
                needs_passcode: true,
                sends_email_updates: true,
            },
            CommandKind::RemoteLock => CommandSpec {
                endpoint: "remoteLock",
                result_field: "remoteLock",
                needs_passcode: true,
                sends_email_updates: true,
            },
            CommandKind::RemoteWipe => CommandSpec {
                endpoint: "remoteWipe",
                result_field: "remoteWipe",
                needs_passcode: true,
                sends_email_updates: true,
            },
        }
    }
}

/// A single validation failure: which field, and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

/// Pre-flight validation for a command invocation. Pure; collects every
/// violation rather than stopping at the first, and is callable
/// independently of dispatch.
pub fn validate(kind: CommandKind, device_id: &str, fields: &Map<String, Value>) -> Vec<Violation> {
    let mut violations = Vec::new();

    if device_id.is_empty() {
        violations.push(Violation {
            field: "device",
            message: "device id must be non-empty".to_string(),
        });
    }

    if kind.spec().needs_passcode {
        match fields.get("passcode").and_then(Value::as_str) {
            Some(passcode) if passcode.chars().count() == 4 => {}
            Some(passcode) => violations.push(Violation {
                field: "passcode",
                message: format!(
                    "passcode must be exactly 4 characters, got {}",
                    passcode.chars().count()
                ),
            }),
            None => violations.push(Violation {
                field: "passcode",
                message: "passcode is required".to_string(),
            }),
        }
    }

    violations
}

/// Decode a command response: a JSON body with a non-empty `content`
/// array whose first element carries `result_field`. The result is
/// passed through verbatim.
pub(crate) fn decode_result(body: &str, result_field: &str) -> FmipResult<Value> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| FmipError::Protocol(format!("response is not valid JSON: {}", e)))?;

    let first = parsed
        .get("content")
        .and_then(Value::as_array)
        .and_then(|content| content.first())
        .ok_or_else(|| FmipError::Protocol("response has no content".to_string()))?;

    first
        .get(result_field)
        .cloned()
        .ok_or_else(|| FmipError::Protocol(format!("content[0] has no '{}' field", result_field)))
}

impl FmipClient {
    /// Build and send one device command, returning the decoded
    /// `content[0][result_field]`.
    pub(crate) async fn dispatch(
        &self,
        kind: CommandKind,
        device_id: &str,
        fields: Map<String, Value>,
    ) -> FmipResult<Value> {
        let spec = kind.spec();

        let violations = validate(kind, device_id, &fields);
        if !violations.is_empty() {
            return Err(FmipError::Validation(violations));
        }

        let session = self.session.as_ref().ok_or_else(|| {
            FmipError::Discovery("service partition not resolved".to_string())
        })?;

        let mut payload = Map::new();
        payload.insert(
            "clientContext".to_string(),
            serde_json::to_value(&self.client_context)?,
        );
        payload.insert(
            "serverContext".to_string(),
            serde_json::to_value(&self.server_context)?,
        );
        payload.insert("device".to_string(), json!(device_id));
        if spec.sends_email_updates {
            payload.insert("emailUpdates".to_string(), json!(self.config.email_updates));
        }
        for (key, value) in fields {
            payload.insert(key, value);
        }

        debug!("fmip command {} → device {}", spec.endpoint, device_id);

        let path = format!("/fmipservice/device/{}/{}", session.scope, spec.endpoint);
        let resp = self
            .transport
            .send(&session.host, &path, &Value::Object(payload), false)
            .await?;

        if !resp.is_success() {
            return Err(FmipError::Upstream {
                status: resp.status,
                body: resp.body,
            });
        }

        decode_result(&resp.body, spec.result_field)
    }
}
