//! Cross-field validation run before any remote call.
//!
//! Only the http family carries conditional fields; tcp and udp listeners
//! always pass. The checks run in a fixed order and report the first
//! failure: health check, then sticky session type, then the cookie field
//! required by that type.

use crate::model::{Listener, Protocol, StickySessionType};
use crate::{ValidationError, ValidationErrorKind};

/// Validate a listener's conditional fields.
pub fn validate(listener: &Listener) -> Result<(), ValidationError> {
    match listener.protocol {
        Protocol::Tcp | Protocol::Udp => Ok(()),
        Protocol::Http | Protocol::Https => validate_http_rules(listener)
            .map_err(|kind| ValidationError::new(listener.key(), kind)),
    }
}

fn validate_http_rules(listener: &Listener) -> Result<(), ValidationErrorKind> {
    if listener.health_check_enabled() && !health_check_complete(listener) {
        return Err(ValidationErrorKind::HealthCheckIncomplete);
    }

    if listener.sticky_session_enabled() {
        match listener.sticky_session_type {
            None => return Err(ValidationErrorKind::StickySessionTypeMissing),
            Some(StickySessionType::Insert) if listener.cookie_timeout == 0 => {
                return Err(ValidationErrorKind::CookieTimeoutMissing);
            }
            Some(StickySessionType::Server) if listener.cookie.is_empty() => {
                return Err(ValidationErrorKind::CookieMissing);
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn health_check_complete(listener: &Listener) -> bool {
    !listener.health_check_uri.is_empty()
        && !listener.health_check_domain.is_empty()
        && listener.health_check_connect_port != 0
        && listener.healthy_threshold != 0
        && listener.unhealthy_threshold != 0
        && listener.health_check_timeout != 0
        && listener.health_check_interval != 0
        && !listener.health_check_http_code.is_empty()
}
