//! High-level client — owns the session, the device registry, and the
//! transport, and exposes the public operations.

use std::sync::Arc;

use log::info;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::fmip::command::CommandKind;
use crate::fmip::devices::DeviceRegistry;
use crate::fmip::error::FmipResult;
use crate::fmip::transport::{FmipTransport, HttpTransport};
use crate::fmip::types::{
    ClientContext, FmipConfig, FmipDevice, FmipSession, LockMessageRequest, LostModeRequest,
    MessageRequest, ServerContext,
};

/// Shared-ownership alias for callers driving one client from several
/// tasks. Refresh, polling, and command dispatch must not interleave,
/// so shared use goes through a single mutex.
pub type FmipClientState = Arc<Mutex<FmipClient>>;

/// Client for one account session.
///
/// Construction resolves the account's service partition eagerly: a
/// client that exists is a client whose session is usable. Command
/// results are the upstream's own result records, passed through
/// verbatim.
pub struct FmipClient {
    pub(crate) config: FmipConfig,
    pub(crate) client_context: ClientContext,
    pub(crate) server_context: ServerContext,
    pub(crate) transport: Box<dyn FmipTransport>,
    pub(crate) session: Option<FmipSession>,
    pub(crate) registry: DeviceRegistry,
}

impl FmipClient {
    /// Connect with the default HTTP transport.
    pub async fn connect(config: FmipConfig) -> FmipResult<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::connect_with(config, transport).await
    }

    /// Connect through a caller-supplied transport (custom TLS policy,
    /// scripted responses in tests).
    pub async fn connect_with(
        config: FmipConfig,
        transport: impl FmipTransport + 'static,
    ) -> FmipResult<Self> {
        let mut client = Self::unresolved(config, transport);
        client.discover().await?;
        info!(
            "fmip session established for {} ({} device(s))",
            client.config.username,
            client.registry.len()
        );
        Ok(client)
    }

    /// A client with no resolved session. Every operation fails with a
    /// discovery error until `discover` succeeds.
    pub(crate) fn unresolved(config: FmipConfig, transport: impl FmipTransport + 'static) -> Self {
        FmipClient {
            client_context: ClientContext::default(),
            server_context: ServerContext::default(),
            transport: Box::new(transport),
            session: None,
            registry: DeviceRegistry::new(),
            config,
        }
    }

    // ─── Session state ───────────────────────────────────────────────

    /// The resolved partition, if discovery has completed.
    pub fn session(&self) -> Option<&FmipSession> {
        self.session.as_ref()
    }

    /// Ask the service to skip (or send) notification emails on the
    /// commands that honour the preference.
    pub fn set_email_updates(&mut self, email_updates: bool) {
        self.config.email_updates = email_updates;
    }

    // ─── Device registry ─────────────────────────────────────────────

    /// Last-known record for a device id.
    pub fn device(&self, id: &str) -> Option<&FmipDevice> {
        self.registry.get(id)
    }

    /// Last-known records for every device seen this session.
    pub fn devices(&self) -> Vec<&FmipDevice> {
        self.registry.all().collect()
    }

    // ─── Commands ────────────────────────────────────────────────────

    /// Display a message on the device.
    pub async fn send_message(
        &self,
        device_id: &str,
        message: &MessageRequest,
    ) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert("sound".to_string(), json!(message.sound));
        fields.insert("subject".to_string(), json!(message.subject));
        fields.insert("text".to_string(), json!(message.text));
        fields.insert("userText".to_string(), json!(true));
        self.dispatch(CommandKind::SendMessage, device_id, fields).await
    }

    /// Play an alert sound on the device.
    pub async fn play_sound(&self, device_id: &str, subject: Option<&str>) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert(
            "subject".to_string(),
            json!(subject.unwrap_or("Find My iPhone Alert")),
        );
        self.dispatch(CommandKind::PlaySound, device_id, fields).await
    }

    /// Enable lost mode: lock with a passcode, show the owner's contact
    /// number and a message, and start tracking.
    pub async fn lost_device(&self, device_id: &str, lost: &LostModeRequest) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert("lostModeEnabled".to_string(), json!(true));
        fields.insert("ownerNbr".to_string(), json!(lost.owner_phone));
        fields.insert("passcode".to_string(), json!(lost.passcode));
        fields.insert("sound".to_string(), json!(lost.sound));
        fields.insert("text".to_string(), json!(lost.text));
        fields.insert("trackingEnabled".to_string(), json!(true));
        fields.insert("userText".to_string(), json!(true));
        self.dispatch(CommandKind::LostDevice, device_id, fields).await
    }

    /// Toggle the notify-when-found preference for a lost device.
    pub async fn notify_when_found(&self, device_id: &str, notify: bool) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert("lostModeEnabled".to_string(), json!(notify));
        self.dispatch(CommandKind::NotifyWhenFound, device_id, fields).await
    }

    /// Remote-lock the device and display a message.
    pub async fn lock_and_message(
        &self,
        device_id: &str,
        lock: &LockMessageRequest,
    ) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert("passcode".to_string(), json!(lock.passcode));
        fields.insert("sound".to_string(), json!(lock.sound));
        fields.insert("text".to_string(), json!(lock.text));
        fields.insert("title".to_string(), json!(lock.title));
        fields.insert("userText".to_string(), json!(true));
        self.dispatch(CommandKind::LockAndMessage, device_id, fields).await
    }

    /// Remote-lock the device with a 4-character passcode.
    pub async fn remote_lock(&self, device_id: &str, passcode: &str) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert("passcode".to_string(), json!(passcode));
        self.dispatch(CommandKind::RemoteLock, device_id, fields).await
    }

    /// Remote-wipe the device. Irreversible upstream; the passcode and
    /// display text are both required by the service.
    pub async fn remote_wipe(
        &self,
        device_id: &str,
        passcode: &str,
        text: &str,
    ) -> FmipResult<Value> {
        let mut fields = Map::new();
        fields.insert("passcode".to_string(), json!(passcode));
        fields.insert("text".to_string(), json!(text));
        self.dispatch(CommandKind::RemoteWipe, device_id, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use crate::fmip::error::FmipError;
    use crate::fmip::transport::ScriptedTransport;

    fn config() -> FmipConfig {
        FmipConfig::new("user@example.com", "hunter2")
    }

    fn push_discovery(transport: &ScriptedTransport) {
        transport.push_with_headers(
            200,
            &[
                ("X-Apple-MMe-Host", "p01-fmipservice.icloud.com"),
                ("X-Apple-MMe-Scope", "abc123"),
            ],
            "{}",
        );
    }

    async fn connected_client(transport: Arc<ScriptedTransport>) -> FmipClient {
        push_discovery(&transport);
        transport.push_json(
            200,
            r#"{"content":[{"id":"d1","location":{"locationFinished":true,"latitude":1.0,"longitude":2.0}}]}"#,
        );
        FmipClient::connect_with(config(), transport).await.unwrap()
    }

    fn body_keys(body: &Value) -> BTreeSet<String> {
        body.as_object().unwrap().keys().cloned().collect()
    }

    #[tokio::test]
    async fn test_end_to_end_send_message() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        assert_eq!(client.session().unwrap().host, "p01-fmipservice.icloud.com");
        assert_eq!(client.session().unwrap().scope, "abc123");
        assert!(client.device("d1").unwrap().location.as_ref().unwrap().location_finished);

        transport.push_json(200, r#"{"content":[{"msg":{"status":200}}]}"#);
        let result = client
            .send_message("d1", &MessageRequest::new("Hi."))
            .await
            .unwrap();
        assert_eq!(result, json!({"status": 200}));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        let command = &requests[2];
        assert_eq!(command.host, "p01-fmipservice.icloud.com");
        assert_eq!(command.path, "/fmipservice/device/abc123/sendMessage");
        assert!(!command.capture_headers);

        let body = command.body.as_object().unwrap();
        assert_eq!(body["device"], json!("d1"));
        assert_eq!(body["text"], json!("Hi."));
        assert_eq!(body["sound"], json!(false));
        assert_eq!(body["subject"], json!("Important Message"));
        assert_eq!(body["userText"], json!(true));
        assert_eq!(body["emailUpdates"], json!(true));
        // exact envelope: contexts + device + command fields, nothing else
        let expected: BTreeSet<String> = [
            "clientContext",
            "serverContext",
            "device",
            "emailUpdates",
            "sound",
            "subject",
            "text",
            "userText",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        assert_eq!(body_keys(&command.body), expected);
    }

    #[tokio::test]
    async fn test_command_before_discovery_fails_fast() {
        let transport = ScriptedTransport::new();
        let client = FmipClient::unresolved(config(), transport.clone());

        let err = client
            .send_message("d1", &MessageRequest::new("Hi."))
            .await
            .unwrap_err();
        assert!(matches!(err, FmipError::Discovery(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_passcode_never_reaches_the_network() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;
        let before = transport.request_count();

        for passcode in ["123", "12345"] {
            let err = client.remote_lock("d1", passcode).await.unwrap_err();
            assert!(matches!(err, FmipError::Validation(_)), "{:?}", passcode);
        }
        let err = client
            .lost_device("d1", &LostModeRequest::new("123"))
            .await
            .unwrap_err();
        assert!(matches!(err, FmipError::Validation(_)));
        let err = client
            .lock_and_message("d1", &LockMessageRequest::new("12345", "Call me."))
            .await
            .unwrap_err();
        assert!(matches!(err, FmipError::Validation(_)));

        assert_eq!(transport.request_count(), before);
    }

    #[tokio::test]
    async fn test_play_sound_omits_email_updates() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        transport.push_json(200, r#"{"content":[{"snd":{"status":"OK"}}]}"#);
        let result = client.play_sound("d1", None).await.unwrap();
        assert_eq!(result, json!({"status": "OK"}));

        let command = transport.requests().pop().unwrap();
        assert_eq!(command.path, "/fmipservice/device/abc123/playSound");
        let body = command.body.as_object().unwrap();
        assert!(!body.contains_key("emailUpdates"));
        assert_eq!(body["subject"], json!("Find My iPhone Alert"));
        let expected: BTreeSet<String> = ["clientContext", "serverContext", "device", "subject"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(body_keys(&command.body), expected);
    }

    #[tokio::test]
    async fn test_email_updates_preference_is_injected() {
        let transport = ScriptedTransport::new();
        let mut client = connected_client(transport.clone()).await;
        client.set_email_updates(false);

        transport.push_json(200, r#"{"content":[{"remoteLock":{"status":200}}]}"#);
        client.remote_lock("d1", "1234").await.unwrap();

        let command = transport.requests().pop().unwrap();
        assert_eq!(command.path, "/fmipservice/device/abc123/remoteLock");
        let body = command.body.as_object().unwrap();
        assert_eq!(body["emailUpdates"], json!(false));
        assert_eq!(body["passcode"], json!("1234"));
    }

    #[tokio::test]
    async fn test_lost_device_payload() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        transport.push_json(200, r#"{"content":[{"lostDevice":{"statusCode":"200"}}]}"#);
        let result = client
            .lost_device("d1", &LostModeRequest::new("1234"))
            .await
            .unwrap();
        assert_eq!(result, json!({"statusCode": "200"}));

        let command = transport.requests().pop().unwrap();
        assert_eq!(command.path, "/fmipservice/device/abc123/lostDevice");
        let body = command.body.as_object().unwrap();
        assert_eq!(body["lostModeEnabled"], json!(true));
        assert_eq!(body["trackingEnabled"], json!(true));
        assert_eq!(body["ownerNbr"], json!("911"));
        assert_eq!(body["passcode"], json!("1234"));
        assert_eq!(body["sound"], json!(true));
        assert_eq!(
            body["text"],
            json!("This iPhone has been lost. Please call me.")
        );
    }

    #[tokio::test]
    async fn test_notify_when_found_payload_and_result() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        transport.push_json(200, r#"{"content":[{"locFoundEnabled":true}]}"#);
        let result = client.notify_when_found("d1", true).await.unwrap();
        assert_eq!(result, json!(true));

        let command = transport.requests().pop().unwrap();
        assert_eq!(command.path, "/fmipservice/device/abc123/saveLocFoundPref");
        let body = command.body.as_object().unwrap();
        assert_eq!(body["lostModeEnabled"], json!(true));
        assert!(!body.contains_key("emailUpdates"));
    }

    #[tokio::test]
    async fn test_remote_wipe_payload() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        transport.push_json(200, r#"{"content":[{"remoteWipe":{"status":200}}]}"#);
        client
            .remote_wipe("d1", "1234", "Property of user@example.com")
            .await
            .unwrap();

        let command = transport.requests().pop().unwrap();
        assert_eq!(command.path, "/fmipservice/device/abc123/remoteWipe");
        let expected: BTreeSet<String> = [
            "clientContext",
            "serverContext",
            "device",
            "emailUpdates",
            "passcode",
            "text",
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();
        assert_eq!(body_keys(&command.body), expected);
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces_status_and_body() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        transport.push_json(503, "Service Unavailable");
        let err = client.play_sound("d1", None).await.unwrap_err();
        assert!(matches!(err, FmipError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_empty_content_is_a_protocol_error() {
        let transport = ScriptedTransport::new();
        let client = connected_client(transport.clone()).await;

        transport.push_json(200, r#"{"content":[]}"#);
        let err = client.play_sound("d1", None).await.unwrap_err();
        assert!(matches!(err, FmipError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_failed_discovery_yields_no_client() {
        let transport = ScriptedTransport::new();
        transport.push_json(500, "boom");

        let result = FmipClient::connect_with(config(), transport).await;
        assert!(result.is_err());
    }
}
