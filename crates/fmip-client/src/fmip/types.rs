//! All data structures and configuration for the Find My iPhone service.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ─── Connection / Config ────────────────────────────────────────────────────

/// Configuration for connecting to the Find My iPhone service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FmipConfig {
    /// iCloud Apple ID.
    pub username: String,
    /// iCloud password.
    pub password: String,
    /// Whether requests ask the service to email the account owner.
    /// Honoured only by some commands. On by default.
    #[serde(default = "default_true")]
    pub email_updates: bool,
    /// Bootstrap host used for partition discovery.
    #[serde(default = "default_host")]
    pub initial_host: String,
    /// Overall request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Whether to verify TLS certificates. The upstream historically
    /// pins its own certificates, so verification is off by default.
    #[serde(default)]
    pub verify_tls: bool,
    /// Seconds between device-list refreshes while polling a location.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "fmipmobile.icloud.com".to_string()
}
fn default_timeout() -> u64 {
    9
}
fn default_connect_timeout() -> u64 {
    5
}
fn default_poll_interval() -> u64 {
    5
}

impl FmipConfig {
    /// Config with the given credentials and every other field defaulted.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        FmipConfig {
            username: username.into(),
            password: password.into(),
            email_updates: default_true(),
            initial_host: default_host(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            verify_tls: false,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

// ─── Request contexts ───────────────────────────────────────────────────────

/// Fixed client-identity context sent on every request. Identifies the
/// caller as an official Find My iPhone app build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContext {
    pub app_name: String,
    pub app_version: String,
    pub build_version: String,
    pub client_timestamp: u64,
    #[serde(rename = "deviceUDID")]
    pub device_udid: Option<String>,
    pub inactive_time: u64,
    pub os_version: String,
    pub product_type: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        ClientContext {
            app_name: "FindMyiPhone".to_string(),
            app_version: "3.0".to_string(),
            build_version: "376".to_string(),
            client_timestamp: 0,
            device_udid: None,
            inactive_time: 1,
            os_version: "7.0.3".to_string(),
            product_type: "iPhone6,1".to_string(),
        }
    }
}

/// Session tuning parameters echoed to the server on every request after
/// discovery. The service may return its own values for these; this
/// client always sends the local defaults (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContext {
    #[serde(rename = "callbackIntervalInMS")]
    pub callback_interval_in_ms: u64,
    pub classic_user: bool,
    pub client_id: Option<String>,
    pub cloud_user: bool,
    pub device_load_status: String,
    pub enable_map_stats: bool,
    #[serde(rename = "isHSA")]
    pub is_hsa: bool,
    pub last_session_extension_time: Option<u64>,
    pub mac_count: u64,
    pub max_device_load_time: u64,
    pub max_locating_time: u64,
    pub preferred_language: String,
    pub prefs_update_time: u64,
    pub session_lifespan: u64,
    pub timezone: Option<String>,
    pub track_info_cache_duration_in_secs: u64,
    pub valid_region: bool,
}

impl Default for ServerContext {
    fn default() -> Self {
        ServerContext {
            callback_interval_in_ms: 10000,
            classic_user: false,
            client_id: None,
            cloud_user: true,
            device_load_status: "200".to_string(),
            enable_map_stats: false,
            is_hsa: false,
            last_session_extension_time: None,
            mac_count: 0,
            max_device_load_time: 60000,
            max_locating_time: 90000,
            preferred_language: "en-us".to_string(),
            prefs_update_time: 0,
            session_lifespan: 900000,
            timezone: None,
            track_info_cache_duration_in_secs: 86400,
            valid_region: true,
        }
    }
}

// ─── Session ────────────────────────────────────────────────────────────────

/// The account's resolved service partition. Write-once output of
/// discovery; all post-discovery requests target this host/scope pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmipSession {
    /// Partition hostname, e.g. `p01-fmipservice.icloud.com`.
    pub host: String,
    /// Opaque path segment identifying the account on that partition.
    pub scope: String,
}

// ─── Devices ────────────────────────────────────────────────────────────────

/// A device registered on the account. Decoded tolerantly: the typed
/// fields below are the ones this client reads; everything else the
/// service returns is carried unmodified in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmipDevice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub device_display_name: Option<String>,
    #[serde(default)]
    pub device_model: Option<String>,
    #[serde(default)]
    pub device_status: Option<String>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub is_locating: Option<bool>,
    #[serde(default)]
    pub location: Option<DeviceLocation>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Geolocation state for a device. `location_finished` flips to true
/// once the service has a fix from the physical device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLocation {
    #[serde(default)]
    pub location_finished: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default)]
    pub position_type: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<i64>,
    #[serde(default)]
    pub is_old: Option<bool>,
    #[serde(default)]
    pub is_inaccurate: Option<bool>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ─── Command parameters ─────────────────────────────────────────────────────

/// Parameters for `send_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Message body displayed on the device.
    pub text: String,
    /// Play an alert sound alongside the message.
    pub sound: bool,
    /// Title shown above the message.
    pub subject: String,
}

impl MessageRequest {
    pub fn new(text: impl Into<String>) -> Self {
        MessageRequest {
            text: text.into(),
            sound: false,
            subject: "Important Message".to_string(),
        }
    }
}

/// Parameters for `lost_device` (enable lost mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LostModeRequest {
    /// 4-character device passcode to set.
    pub passcode: String,
    /// Owner contact number displayed on the lock screen.
    pub owner_phone: String,
    /// Play the lost-mode alarm.
    pub sound: bool,
    /// Message displayed on the lock screen.
    pub text: String,
}

impl LostModeRequest {
    pub fn new(passcode: impl Into<String>) -> Self {
        LostModeRequest {
            passcode: passcode.into(),
            owner_phone: "911".to_string(),
            sound: true,
            text: "This iPhone has been lost. Please call me.".to_string(),
        }
    }
}

/// Parameters for `lock_and_message` (remote lock with a displayed message).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMessageRequest {
    /// 4-character device passcode to set.
    pub passcode: String,
    /// Message displayed on the lock screen.
    pub text: String,
    /// Play an alert sound.
    pub sound: bool,
    /// Title shown above the message.
    pub title: String,
}

impl LockMessageRequest {
    pub fn new(passcode: impl Into<String>, text: impl Into<String>) -> Self {
        LockMessageRequest {
            passcode: passcode.into(),
            text: text.into(),
            sound: true,
            title: "Find My iPhone Alert".to_string(),
        }
    }
}
