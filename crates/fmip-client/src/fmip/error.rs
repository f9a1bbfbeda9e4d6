//! Find My iPhone error types.

use std::fmt;

use crate::fmip::command::Violation;

/// Unified error type for all Find My iPhone operations.
#[derive(Debug)]
pub enum FmipError {
    /// A caller-supplied argument failed a precondition. Nothing was
    /// sent over the network.
    Validation(Vec<Violation>),
    /// Partition discovery failed or has not completed; no device
    /// command can proceed.
    Discovery(String),
    /// The response was not valid JSON or lacked the expected shape.
    Protocol(String),
    /// The service returned a non-success HTTP status.
    Upstream { status: u16, body: String },
    /// Location polling exceeded the caller's timeout budget.
    LocationTimeout { device_id: String, waited_secs: u64 },
    /// Device id unknown to the registry.
    DeviceNotFound(String),
    /// Transport-level failure (DNS, connect, request timeout).
    Transport(String),
}

impl fmt::Display for FmipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(violations) => {
                let detail = violations
                    .iter()
                    .map(|v| format!("{}: {}", v.field, v.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Validation failed: {}", detail)
            }
            Self::Discovery(msg) => write!(f, "Discovery failed: {}", msg),
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::Upstream { status, body } => {
                write!(f, "Upstream error: HTTP {} — {}", status, body)
            }
            Self::LocationTimeout {
                device_id,
                waited_secs,
            } => write!(
                f,
                "Failed to locate device '{}': timed out after {}s",
                device_id, waited_secs
            ),
            Self::DeviceNotFound(id) => write!(f, "Device '{}' not found", id),
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for FmipError {}

impl From<reqwest::Error> for FmipError {
    fn from(e: reqwest::Error) -> Self {
        FmipError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for FmipError {
    fn from(e: serde_json::Error) -> Self {
        FmipError::Protocol(e.to_string())
    }
}

/// Convenience Result alias.
pub type FmipResult<T> = Result<T, FmipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_violations() {
        let err = FmipError::Validation(vec![
            Violation {
                field: "device",
                message: "device id must be non-empty".to_string(),
            },
            Violation {
                field: "passcode",
                message: "passcode must be exactly 4 characters".to_string(),
            },
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("device:"));
        assert!(rendered.contains("passcode:"));
    }

    #[test]
    fn test_upstream_display_carries_status_and_body() {
        let err = FmipError::Upstream {
            status: 401,
            body: "Unauthorized".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Unauthorized"));
    }
}
