use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum WakeError {
    CapabilityUnavailable {
        platform: String,
    },
    CapabilityDenied {
        reason: String,
    },
    PeerUnreachable {
        peer: String,
        message: String,
    },
    OriginMismatch {
        expected: String,
        actual: String,
    },
    ConcurrentOperation {
        operation: String,
    },
    MalformedMessage {
        message: String,
    },
    UnsupportedProtocolVersion {
        version: u32,
    },
    InvalidInput {
        field: String,
        message: String,
    },
    ConfigError {
        key: String,
        message: String,
    },
    IoError {
        operation: String,
        path: String,
        message: String,
    },
}

impl WakeError {
    pub fn io(operation: &str, path: impl ToString, error: impl ToString) -> Self {
        WakeError::IoError {
            operation: operation.to_string(),
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    pub fn config(key: &str, message: impl ToString) -> Self {
        WakeError::ConfigError {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_input(field: &str, message: impl ToString) -> Self {
        WakeError::InvalidInput {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn denied(reason: impl ToString) -> Self {
        WakeError::CapabilityDenied {
            reason: reason.to_string(),
        }
    }

    pub fn unreachable(peer: &str, message: impl ToString) -> Self {
        WakeError::PeerUnreachable {
            peer: peer.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the failure should be reported as a security event rather than a plain error.
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, WakeError::OriginMismatch { .. })
    }
}

impl fmt::Display for WakeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::CapabilityUnavailable { platform } => {
                write!(f, "Keep-awake capability is not available on '{platform}'")
            }
            Self::CapabilityDenied { reason } => {
                write!(f, "Keep-awake request was denied: {reason}")
            }
            Self::PeerUnreachable { peer, message } => {
                write!(f, "Peer '{peer}' is unreachable: {message}")
            }
            Self::OriginMismatch { expected, actual } => {
                write!(
                    f,
                    "Message origin '{actual}' does not match expected origin '{expected}'"
                )
            }
            Self::ConcurrentOperation { operation } => {
                write!(f, "Operation '{operation}' rejected: another one is in flight")
            }
            Self::MalformedMessage { message } => {
                write!(f, "Malformed sync message: {message}")
            }
            Self::UnsupportedProtocolVersion { version } => {
                write!(f, "Unsupported sync protocol version {version}")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::ConfigError { key, message } => {
                write!(f, "Configuration error for key '{key}': {message}")
            }
            Self::IoError {
                operation,
                path,
                message,
            } => {
                write!(f, "I/O error during '{operation}' on '{path}': {message}")
            }
        }
    }
}

impl std::error::Error for WakeError {}

impl From<WakeError> for String {
    fn from(error: WakeError) -> Self {
        error.to_string()
    }
}
