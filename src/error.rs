//! Error types for provider waiters.
//!
//! Vendor SDK failures arrive as [`ApiError`]. An [`ErrorClassifier`] sorts them
//! into the [`ErrorKind`] taxonomy, and [`Error`] carries them to the caller with
//! the resource id and action attached.

use std::time::Duration;

use thiserror::Error;

/// How a vendor error should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The resource does not exist. Sometimes this is the desired outcome.
    NotFound,
    /// Throttling or a transient failure. Safe to retry.
    Retryable,
    /// Anything else. Surfaced to the caller unchanged.
    Terminal,
}

/// A failure reported by the vendor SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// The vendor error code, e.g. `Throttling.User` or `InvalidVpcId.NotFound`.
    pub code: String,
    /// The human-readable message returned with the code.
    pub message: String,
    /// The request id echoed by the API, if any.
    pub request_id: Option<String>,
    /// The HTTP status of the failed response, if any.
    pub http_status: Option<u16>,
    /// Set when the request never produced a response.
    pub transport: bool,
}

impl ApiError {
    /// Create an error from a vendor code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
            http_status: None,
            transport: false,
        }
    }

    /// Create a network-level failure with no vendor code.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: "TransportError".to_string(),
            message: message.into(),
            request_id: None,
            http_status: None,
            transport: true,
        }
    }

    /// Attach the request id echoed by the API.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attach the HTTP status of the failed response.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

/// Sorts vendor errors into [`ErrorKind`]s.
///
/// The not-found family is always caller supplied because every resource type
/// uses its own codes. The retryable family starts from the built-in
/// throttling and transient codes and can be extended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorClassifier {
    not_found_codes: Vec<String>,
    retryable_codes: Vec<String>,
}

impl ErrorClassifier {
    /// Create a classifier that only knows the built-in retryable family.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add codes that mean the resource is absent.
    pub fn with_not_found_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_found_codes
            .extend(codes.into_iter().map(Into::into));
        self
    }

    /// Add codes that should be retried on top of the built-in family.
    pub fn with_retryable_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_codes
            .extend(codes.into_iter().map(Into::into));
        self
    }

    /// Classify a vendor error. Not-found codes win over retryable ones.
    pub fn classify(&self, err: &ApiError) -> ErrorKind {
        if self.not_found_codes.iter().any(|c| *c == err.code) {
            ErrorKind::NotFound
        } else if is_builtin_retryable(err) || self.retryable_codes.iter().any(|c| *c == err.code)
        {
            ErrorKind::Retryable
        } else {
            ErrorKind::Terminal
        }
    }
}

fn is_builtin_retryable(err: &ApiError) -> bool {
    err.transport
        || err.code == "ServiceUnavailable"
        || err.code == "Rejected.Throttling"
        || err.code.starts_with("Throttling")
        || matches!(err.http_status, Some(500..=599))
}

/// Errors returned by the waiters and listers.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource does not exist.
    #[error("[ERROR] Resource {id} is not found: {code}")]
    NotFound {
        /// The resource id.
        id: String,
        /// The vendor code that signalled absence.
        code: String,
    },

    /// A vendor call failed, wrapped with the operation context.
    #[error(
        "[ERROR] Resource {id} {action} Failed!!! {source}{}",
        request_echo(.source)
    )]
    Api {
        /// The resource id.
        id: String,
        /// The API action that was called.
        action: String,
        /// Whether the failure was retryable or terminal.
        kind: ErrorKind,
        /// The underlying vendor error.
        source: ApiError,
    },

    /// The resource entered one of the caller's failure states.
    #[error("[ERROR] Resource {id} failed to reach target status. Current status is {state}")]
    TargetStatus {
        /// The resource id.
        id: String,
        /// The observed failure state.
        state: String,
    },

    /// The deadline passed before a goal state was observed.
    #[error(
        "[ERROR] Resource {id} timed out after {elapsed:?} waiting for target status, last status: {}",
        .last_state.as_deref().unwrap_or("<none>")
    )]
    Timeout {
        /// The resource id.
        id: String,
        /// Time spent waiting.
        elapsed: Duration,
        /// The last state seen before giving up.
        last_state: Option<String>,
    },

    /// A response did not contain an expected field.
    #[error("[ERROR] Resource {id} attribute {path} is missing from the response")]
    MissingField {
        /// The resource id.
        id: String,
        /// The path that could not be resolved.
        path: String,
    },

    /// A name filter could not be compiled.
    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn request_echo(err: &ApiError) -> String {
    match &err.request_id {
        Some(request_id) => format!(" (RequestId: {})", request_id),
        None => String::new(),
    }
}

impl Error {
    /// Wrap a vendor error with its operation context, classifying it on the way.
    pub fn from_api(
        classifier: &ErrorClassifier,
        id: impl Into<String>,
        action: impl Into<String>,
        err: ApiError,
    ) -> Self {
        match classifier.classify(&err) {
            ErrorKind::NotFound => Self::NotFound {
                id: id.into(),
                code: err.code,
            },
            kind => Self::Api {
                id: id.into(),
                action: action.into(),
                kind,
                source: err,
            },
        }
    }

    /// The taxonomy bucket this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Api { kind, .. } => *kind,
            _ => ErrorKind::Terminal,
        }
    }

    /// Shorthand for `kind() == ErrorKind::NotFound`.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// The vendor code behind this error, if there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::NotFound { code, .. } => Some(code),
            Self::Api { source, .. } => Some(&source.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_retryable_family() {
        let classifier = ErrorClassifier::new();

        for code in ["Throttling", "Throttling.User", "ServiceUnavailable", "Rejected.Throttling"] {
            let err = ApiError::new(code, "slow down");
            assert_eq!(classifier.classify(&err), ErrorKind::Retryable, "{}", code);
        }

        let err = ApiError::transport("connection reset by peer");
        assert_eq!(classifier.classify(&err), ErrorKind::Retryable);

        let err = ApiError::new("InternalError", "boom").with_http_status(503);
        assert_eq!(classifier.classify(&err), ErrorKind::Retryable);

        let err = ApiError::new("InvalidParameter", "bad").with_http_status(400);
        assert_eq!(classifier.classify(&err), ErrorKind::Terminal);
    }

    #[test]
    fn test_caller_supplied_codes() {
        let classifier = ErrorClassifier::new()
            .with_not_found_codes(["InvalidVpcId.NotFound", "Forbidden.VpcNotFound"])
            .with_retryable_codes(["OperationConflict"]);

        let err = ApiError::new("Forbidden.VpcNotFound", "gone");
        assert_eq!(classifier.classify(&err), ErrorKind::NotFound);

        let err = ApiError::new("OperationConflict", "busy");
        assert_eq!(classifier.classify(&err), ErrorKind::Retryable);

        let err = ApiError::new("IncorrectStatus", "nope");
        assert_eq!(classifier.classify(&err), ErrorKind::Terminal);
    }

    #[test]
    fn test_not_found_wins_over_retryable() {
        let classifier = ErrorClassifier::new().with_not_found_codes(["Throttling.Gone"]);
        let err = ApiError::new("Throttling.Gone", "odd but possible");
        assert_eq!(classifier.classify(&err), ErrorKind::NotFound);
    }

    #[test]
    fn test_from_api_wraps_context() {
        let classifier = ErrorClassifier::new().with_not_found_codes(["InvalidVpcId.NotFound"]);

        let err = Error::from_api(
            &classifier,
            "vpc-123",
            "DescribeVpcAttribute",
            ApiError::new("InvalidVpcId.NotFound", "gone"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.code(), Some("InvalidVpcId.NotFound"));

        let err = Error::from_api(
            &classifier,
            "vpc-123",
            "DeleteVpc",
            ApiError::new("DependencyViolation", "has vswitches").with_request_id("req-1"),
        );
        assert_eq!(err.kind(), ErrorKind::Terminal);
        assert_eq!(
            format!("{}", err),
            "[ERROR] Resource vpc-123 DeleteVpc Failed!!! DependencyViolation: has vswitches (RequestId: req-1)"
        );

        let err = Error::from_api(
            &classifier,
            "vpc-123",
            "DeleteVpc",
            ApiError::new("DependencyViolation", "has vswitches"),
        );
        assert_eq!(
            format!("{}", err),
            "[ERROR] Resource vpc-123 DeleteVpc Failed!!! DependencyViolation: has vswitches"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::TargetStatus {
            id: "i-1".to_string(),
            state: "Failed".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "[ERROR] Resource i-1 failed to reach target status. Current status is Failed"
        );

        let err = Error::Timeout {
            id: "i-1".to_string(),
            elapsed: Duration::from_secs(3),
            last_state: None,
        };
        assert_eq!(
            format!("{}", err),
            "[ERROR] Resource i-1 timed out after 3s waiting for target status, last status: <none>"
        );
        assert_eq!(err.kind(), ErrorKind::Terminal);
        assert_eq!(err.code(), None);
    }
}
