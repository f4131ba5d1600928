//! Unified client error model.
//! Every failed request is normalized into a `ClassifiedError` at the transport boundary;
//! raw server error shapes and transport exceptions never travel past it.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Fixed phrase the backend uses when it blocks writes for a demonstration session.
pub const DEMO_WRITE_BLOCKED_PHRASE: &str = "Write operations (POST, PUT, DELETE) are disabled in Demo Mode.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AuthExpired,
    Forbidden,
    DemoWriteRestricted,
    NetworkUnavailable,
    Unknown,
}

impl ErrorKind {
    pub fn code_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthExpired => "auth_expired",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::DemoWriteRestricted => "demo_write_restricted",
            ErrorKind::NetworkUnavailable => "network_unavailable",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Only an expired session ends the local session; a demo write block or a
    /// server-side denial leaves the user logged in.
    pub fn forces_logout(&self) -> bool {
        matches!(self, ErrorKind::AuthExpired)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NetworkUnavailable)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    /// HTTP status when a response was received.
    #[serde(default)]
    pub status: Option<u16>,
    pub message: String,
}

impl ClassifiedError {
    pub fn new<S: Into<String>>(kind: ErrorKind, status: Option<u16>, message: S) -> Self {
        ClassifiedError { kind, status, message: message.into() }
    }

    pub fn network<S: Into<String>>(msg: S) -> Self { Self::new(ErrorKind::NetworkUnavailable, None, msg) }
    pub fn auth_expired<S: Into<String>>(msg: S) -> Self { Self::new(ErrorKind::AuthExpired, Some(401), msg) }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { Self::new(ErrorKind::Forbidden, Some(403), msg) }
    pub fn demo_write<S: Into<String>>(msg: S) -> Self { Self::new(ErrorKind::DemoWriteRestricted, Some(403), msg) }
    pub fn unknown<S: Into<String>>(status: Option<u16>, msg: S) -> Self { Self::new(ErrorKind::Unknown, status, msg) }

    /// Classify a received HTTP response by status and normalized message.
    pub fn from_response(status: u16, message: String) -> Self {
        let kind = match status {
            401 => ErrorKind::AuthExpired,
            403 if message.contains(DEMO_WRITE_BLOCKED_PHRASE) => ErrorKind::DemoWriteRestricted,
            403 => ErrorKind::Forbidden,
            _ => ErrorKind::Unknown,
        };
        ClassifiedError { kind, status: Some(status), message }
    }

    pub fn code_str(&self) -> &'static str { self.kind.code_str() }

    pub fn message(&self) -> &str { self.message.as_str() }

    /// Map back to an HTTP status for display; network failures have none, so they
    /// report 503 like an unreachable upstream.
    pub fn http_status(&self) -> u16 {
        match (self.status, self.kind) {
            (Some(s), _) => s,
            (None, ErrorKind::AuthExpired) => 401,
            (None, ErrorKind::Forbidden) | (None, ErrorKind::DemoWriteRestricted) => 403,
            (None, ErrorKind::NetworkUnavailable) => 503,
            (None, ErrorKind::Unknown) => 500,
        }
    }

    /// Message a form or screen shows for this failure.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::AuthExpired => "Your session has expired. Please sign in again.".to_string(),
            ErrorKind::Forbidden => format!("You do not have permission to perform this action. {}", self.message).trim_end().to_string(),
            ErrorKind::DemoWriteRestricted => "This action is not available in demo mode.".to_string(),
            ErrorKind::NetworkUnavailable => "The server could not be reached. Check your connection and retry.".to_string(),
            ErrorKind::Unknown => self.message.clone(),
        }
    }
}

impl Display for ClassifiedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(s) => write!(f, "{} ({}): {}", self.code_str(), s, self.message),
            None => write!(f, "{}: {}", self.code_str(), self.message),
        }
    }
}

impl std::error::Error for ClassifiedError {}

pub type AppResult<T> = Result<T, ClassifiedError>;
