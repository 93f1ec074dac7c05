// ============================================
// WORLDSMITH - Classified Invocation Errors
// ============================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Discriminant of a [`ClassifiedError`], used for logging and matching
/// without borrowing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    RateLimited,
    ServerFault,
    NetworkFault,
    TimedOut,
    MalformedInput,
    Unknown,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServerFault => "server_fault",
            ErrorKind::NetworkFault => "network_fault",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::Unknown => "unknown",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Every failure the invocation engine can surface.
///
/// The set is closed: transport failures, endpoint rejections and caller
/// mistakes all resolve to exactly one variant, and the variant alone
/// decides whether another attempt is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifiedError {
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { message: String, status: u16 },

    #[error("rate limited ({status}): {message}")]
    RateLimited { message: String, status: u16 },

    #[error("server fault ({status}): {message}")]
    ServerFault { message: String, status: u16 },

    #[error("network fault: {message}")]
    NetworkFault { message: String },

    #[error("timed out after {}ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },

    #[error("malformed input{}: {message}", fmt_status(.status))]
    MalformedInput {
        message: String,
        status: Option<u16>,
    },

    #[error("unknown failure{}: {message}", fmt_status(.status))]
    Unknown {
        message: String,
        status: Option<u16>,
    },

    #[error("invocation cancelled")]
    Cancelled,
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}

impl ClassifiedError {
    /// Precondition violation detected before any network call.
    pub fn malformed(message: impl Into<String>) -> Self {
        ClassifiedError::MalformedInput {
            message: message.into(),
            status: None,
        }
    }

    /// Map a non-2xx transport status to its taxonomy member.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ClassifiedError::Unauthorized { message, status },
            429 => ClassifiedError::RateLimited { message, status },
            s if s >= 500 => ClassifiedError::ServerFault { message, status },
            s if (400..500).contains(&s) => ClassifiedError::MalformedInput {
                message,
                status: Some(status),
            },
            _ => ClassifiedError::Unknown {
                message,
                status: Some(status),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassifiedError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ClassifiedError::RateLimited { .. } => ErrorKind::RateLimited,
            ClassifiedError::ServerFault { .. } => ErrorKind::ServerFault,
            ClassifiedError::NetworkFault { .. } => ErrorKind::NetworkFault,
            ClassifiedError::TimedOut { .. } => ErrorKind::TimedOut,
            ClassifiedError::MalformedInput { .. } => ErrorKind::MalformedInput,
            ClassifiedError::Unknown { .. } => ErrorKind::Unknown,
            ClassifiedError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Transport status code, when the failure came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifiedError::Unauthorized { status, .. }
            | ClassifiedError::RateLimited { status, .. }
            | ClassifiedError::ServerFault { status, .. } => Some(*status),
            ClassifiedError::MalformedInput { status, .. }
            | ClassifiedError::Unknown { status, .. } => *status,
            ClassifiedError::NetworkFault { .. }
            | ClassifiedError::TimedOut { .. }
            | ClassifiedError::Cancelled => None,
        }
    }

    /// Whether the kind is eligible for another attempt at all.
    /// The engine additionally bounds `Unknown` to a single retry.
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            ErrorKind::RateLimited
            | ErrorKind::ServerFault
            | ErrorKind::NetworkFault
            | ErrorKind::TimedOut
            | ErrorKind::Unknown => true,
            ErrorKind::Unauthorized | ErrorKind::MalformedInput | ErrorKind::Cancelled => false,
        }
    }

    /// Text suitable for showing to an end user. Diagnostics stay in logs.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Unauthorized => {
                "The API key was rejected. Check your key and try again."
            }
            ErrorKind::RateLimited => {
                "The model provider is rate limiting requests. Wait a moment and try again."
            }
            ErrorKind::TimedOut => {
                "The model took too long to respond. Try again or raise the timeout."
            }
            ErrorKind::ServerFault | ErrorKind::NetworkFault => {
                "The model provider could not be reached. Try again."
            }
            ErrorKind::MalformedInput | ErrorKind::Unknown => {
                "Could not process the request or its response."
            }
            ErrorKind::Cancelled => "The request was cancelled.",
        }
    }
}
