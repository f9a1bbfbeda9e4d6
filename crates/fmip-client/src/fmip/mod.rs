//! # fmip — Find My iPhone service client
//!
//! Client for the Find My iPhone device-location and remote-management
//! service. Authenticates with account credentials, resolves the
//! account's service partition, caches the registered devices, and
//! issues device-targeted commands.
//!
//! ## Architecture
//!
//! - `types` — configuration, contexts, session, device records
//! - `error` — crate-wide error type
//! - `transport` — HTTP transport trait, reqwest and scripted backends
//! - `devices` — client-side device registry
//! - `command` — command descriptor table, validation, dispatch
//! - `session` — partition discovery and device-list refresh
//! - `location` — bounded location polling
//! - `service` — high-level client façade

pub mod types;
pub mod error;
pub mod transport;
pub mod devices;
pub mod command;
pub mod session;
pub mod location;
pub mod service;

// Re-exports
pub use command::{CommandKind, CommandSpec, Violation};
pub use devices::DeviceRegistry;
pub use error::{FmipError, FmipResult};
pub use service::{FmipClient, FmipClientState};
pub use transport::{FmipTransport, HttpTransport, RawResponse, RecordedRequest, ScriptedTransport};
pub use types::*;
