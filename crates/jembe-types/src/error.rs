//! Unified error surface for the Jembe runtime.
//!
//! Every error the core surfaces is a [`JembeError`]. The host maps it
//! to an HTTP response via [`ErrorCode::status`]; components raise the
//! access variants (`Unauthorized`, `Forbidden`, `NotFound`, ...) from
//! guards and actions to deny access or report missing entities.
//!
//! # Error Code Convention
//!
//! All codes use the `JMB_` prefix:
//!
//! | Error | Code | Status |
//! |-------|------|--------|
//! | [`JembeError::BadRequest`] | `JMB_BAD_REQUEST` | 400 |
//! | [`JembeError::Unauthorized`] | `JMB_UNAUTHORIZED` | 401 |
//! | [`JembeError::Forbidden`] | `JMB_FORBIDDEN` | 403 |
//! | [`JembeError::NotFound`] | `JMB_NOT_FOUND` | 404 |
//! | [`JembeError::Conflict`] | `JMB_CONFLICT` | 409 |
//! | [`JembeError::Gone`] | `JMB_GONE` | 410 |
//! | [`JembeError::NotImplemented`] | `JMB_NOT_IMPLEMENTED` | 501 |
//! | [`JembeError::Internal`] | `JMB_INTERNAL` | 500 |
//! | [`JembeError::InvalidName`] | `JMB_INVALID_NAME` | 400 |
//! | [`JembeError::StateShapeViolation`] | `JMB_STATE_SHAPE` | 500 |
//! | [`JembeError::UnsupportedParamType`] | `JMB_UNSUPPORTED_PARAM` | 500 |
//! | [`JembeError::BadParamValue`] | `JMB_BAD_PARAM_VALUE` | 400 |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable code and HTTP mapping for Jembe errors.
///
/// Codes are UPPER_SNAKE_CASE, `JMB_`-prefixed, and stable; they are
/// part of the `_exception` event payload so listeners can match on
/// them without string-scanning messages.
pub trait ErrorCode {
    /// Returns the stable machine-readable code.
    fn code(&self) -> &'static str;

    /// Returns the HTTP status this error maps to at the host edge.
    fn status(&self) -> u16;
}

/// Error surfaced by the component runtime.
///
/// # Example
///
/// ```
/// use jembe_types::{ErrorCode, JembeError};
///
/// let err = JembeError::NotFound("task 999".into());
/// assert_eq!(err.code(), "JMB_NOT_FOUND");
/// assert_eq!(err.status(), 404);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum JembeError {
    /// Malformed JSON, unknown exec name, or unknown action.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Raised by a guard or action to require authentication.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Raised by a guard or action to deny access.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Target entity missing; transparently propagated from application code.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent modification or duplicate entity.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Entity existed but is permanently gone.
    #[error("gone: {0}")]
    Gone(String),

    /// Operation is declared but not available.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Bug or unexpected condition inside the runtime or application.
    #[error("internal error: {0}")]
    Internal(String),

    /// Malformed full or exec name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Write to a state key outside the component's closed state shape.
    #[error("state of {exec_name} has no param {param:?}")]
    StateShapeViolation {
        /// Exec name of the owning instance (or full name at config time).
        exec_name: String,
        /// The offending key.
        param: String,
    },

    /// A state param type the dump/load layer cannot round-trip.
    #[error("param {param:?} has unsupported type {type_name}")]
    UnsupportedParamType {
        /// State param name.
        param: String,
        /// Human-readable type description.
        type_name: String,
    },

    /// A client-supplied value that cannot be loaded into the declared type.
    #[error("param {param:?} rejected: {reason}")]
    BadParamValue {
        /// State param name.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ErrorCode for JembeError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "JMB_BAD_REQUEST",
            Self::Unauthorized(_) => "JMB_UNAUTHORIZED",
            Self::Forbidden(_) => "JMB_FORBIDDEN",
            Self::NotFound(_) => "JMB_NOT_FOUND",
            Self::Conflict(_) => "JMB_CONFLICT",
            Self::Gone(_) => "JMB_GONE",
            Self::NotImplemented(_) => "JMB_NOT_IMPLEMENTED",
            Self::Internal(_) => "JMB_INTERNAL",
            Self::InvalidName(_) => "JMB_INVALID_NAME",
            Self::StateShapeViolation { .. } => "JMB_STATE_SHAPE",
            Self::UnsupportedParamType { .. } => "JMB_UNSUPPORTED_PARAM",
            Self::BadParamValue { .. } => "JMB_BAD_PARAM_VALUE",
        }
    }

    fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::InvalidName(_) | Self::BadParamValue { .. } => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Gone(_) => 410,
            Self::NotImplemented(_) => 501,
            Self::Internal(_)
            | Self::StateShapeViolation { .. }
            | Self::UnsupportedParamType { .. } => 500,
        }
    }
}

impl JembeError {
    /// `true` for the access-denial variants a guard may raise.
    ///
    /// Speculative initialisation converts exactly these into a plain
    /// `false` accessibility answer instead of propagating.
    #[must_use]
    pub fn is_access_denial(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::Forbidden(_) | Self::NotFound(_) | Self::Gone(_)
        )
    }
}

impl From<serde_json::Error> for JembeError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("malformed JSON: {err}"))
    }
}

/// Asserts that every given error carries a well-formed `JMB_` code.
///
/// Intended for exhaustive per-variant tests, mirroring the code-format
/// contract in the module docs.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E]) {
    for err in errors {
        let code = err.code();
        assert!(
            code.starts_with("JMB_")
                && !code.ends_with('_')
                && !code.contains("__")
                && code
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
            "error code {code:?} violates the JMB_ UPPER_SNAKE_CASE convention"
        );
        let status = err.status();
        assert!(
            (400..=599).contains(&status),
            "error code {code:?} maps to non-error status {status}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<JembeError> {
        vec![
            JembeError::BadRequest("x".into()),
            JembeError::Unauthorized("x".into()),
            JembeError::Forbidden("x".into()),
            JembeError::NotFound("x".into()),
            JembeError::Conflict("x".into()),
            JembeError::Gone("x".into()),
            JembeError::NotImplemented("x".into()),
            JembeError::Internal("x".into()),
            JembeError::InvalidName("x".into()),
            JembeError::StateShapeViolation {
                exec_name: "/a".into(),
                param: "b".into(),
            },
            JembeError::UnsupportedParamType {
                param: "b".into(),
                type_name: "Mutex".into(),
            },
            JembeError::BadParamValue {
                param: "b".into(),
                reason: "not an int".into(),
            },
        ]
    }

    #[test]
    fn all_codes_follow_convention() {
        assert_error_codes(&all_variants());
    }

    #[test]
    fn http_mapping_matches_contract() {
        assert_eq!(JembeError::Unauthorized("x".into()).status(), 401);
        assert_eq!(JembeError::Forbidden("x".into()).status(), 403);
        assert_eq!(JembeError::NotFound("x".into()).status(), 404);
        assert_eq!(JembeError::BadRequest("x".into()).status(), 400);
        assert_eq!(JembeError::Internal("x".into()).status(), 500);
    }

    #[test]
    fn access_denial_set() {
        assert!(JembeError::NotFound("x".into()).is_access_denial());
        assert!(JembeError::Forbidden("x".into()).is_access_denial());
        assert!(!JembeError::BadRequest("x".into()).is_access_denial());
        assert!(!JembeError::Internal("x".into()).is_access_denial());
    }

    #[test]
    fn json_error_becomes_bad_request() {
        let err = serde_json::from_str::<serde_json::Value>("{broken")
            .map_err(JembeError::from)
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
