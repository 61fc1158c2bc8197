//! Error types for the authorization engine.
//!
//! Every failure here is a denial. Callers must never turn an error into an
//! "allow" decision; the HTTP layer maps client-side variants to 4xx and the
//! remote ones to 5xx.

use thiserror::Error;

/// Errors that can occur while adapting, generating, compiling or authorizing.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A required input is missing or malformed.
    ///
    /// Raised before any mapping happens, e.g. an empty subject or action.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The resource type, action or policy operator has no mapping.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The caller did not supply the ancestor layers a generator needs.
    #[error("not enough layer: {0}")]
    NotEnoughLayer(String),

    /// A policy value has the wrong type for its operator.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The policy received from the authority is structurally broken.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// A parameter cannot be resolved, e.g. a type without id/name fields.
    #[error("parameter {0} is invalid")]
    ParamInvalid(String),

    /// The policy authority or the resource store failed.
    #[error("remote call failed: {message}, rid: {rid}")]
    Remote { rid: String, message: String },

    /// The request deadline expired before the remote call finished.
    #[error("request cancelled, rid: {rid}")]
    Cancelled { rid: String },

    /// A local store failure not tied to a request.
    #[error("store error: {0}")]
    Store(String),
}

impl AuthzError {
    pub fn remote(rid: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AuthzError::Remote {
            rid: rid.into(),
            message: message.to_string(),
        }
    }

    /// Whether the failure was caused by the caller's input rather than a
    /// collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthzError::Validation(_)
                | AuthzError::Unsupported(_)
                | AuthzError::NotEnoughLayer(_)
                | AuthzError::TypeMismatch(_)
                | AuthzError::InvalidPolicy(_)
                | AuthzError::ParamInvalid(_)
        )
    }
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::NotEnoughLayer("host transfer needs 2 layers".to_string());
        assert_eq!(
            err.to_string(),
            "not enough layer: host transfer needs 2 layers"
        );

        let err = AuthzError::remote("rid-1", "connection refused");
        assert_eq!(
            err.to_string(),
            "remote call failed: connection refused, rid: rid-1"
        );

        let err = AuthzError::ParamInvalid("type".into());
        assert_eq!(err.to_string(), "parameter type is invalid");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AuthzError::TypeMismatch("x".into()).is_client_error());
        assert!(AuthzError::Unsupported("x".into()).is_client_error());
        assert!(!AuthzError::Cancelled { rid: "r".into() }.is_client_error());
        assert!(!AuthzError::Store("x".into()).is_client_error());
    }
}
