//! Error types for listener parsing and validation.

use thiserror::Error;

use crate::model::ListenerKey;

/// The reason a listener declaration was rejected.
///
/// Kinds are compared by equality; the message is derived from the kind.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    /// Health check is on but at least one detail field is unset.
    #[error("health check is on, so uri, domain, connect port, thresholds, timeout, interval and http code are required")]
    HealthCheckIncomplete,

    /// Sticky session is on without a sticky session type.
    #[error("sticky session is on, so sticky_session_type is required")]
    StickySessionTypeMissing,

    /// Insert-type sticky session without a cookie timeout.
    #[error("sticky session type is insert, so cookie_timeout must be greater than zero")]
    CookieTimeoutMissing,

    /// Server-type sticky session without a cookie name.
    #[error("sticky session type is server, so cookie is required")]
    CookieMissing,

    /// HTTPS listener without a server certificate.
    #[error("https listeners require ssl_certificate_id")]
    CertificateRequired,
}

/// A listener failed cross-field validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("listener {listener}: {kind}")]
pub struct ValidationError {
    /// Which listener was rejected.
    pub listener: ListenerKey,

    /// Why it was rejected.
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub fn new(listener: ListenerKey, kind: ValidationErrorKind) -> Self {
        Self { listener, kind }
    }
}

/// A wire or declaration string did not name a known enum value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {field} value: {value:?}")]
pub struct ListenerParseError {
    pub field: &'static str,
    pub value: String,
}

impl ListenerParseError {
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}
