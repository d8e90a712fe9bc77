/// Top-level error for a `brick-volume` run.
use thiserror::Error;

use crate::brick::InitiatorError;
use crate::cinder::ApiError;

/// Anything that can end a run early.
#[derive(Debug, Error)]
pub enum BrickError {
    /// Control-plane failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local initiator failure (probe or device path resolution).
    #[error("Initiator error: {0}")]
    Initiator(#[from] InitiatorError),

    /// Writing to stdout failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Exit code mapping for `BrickError` variants.
impl BrickError {
    /// Return the CLI exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Api(ApiError::Unauthorized { .. }) => 3,
            Self::Api(ApiError::NotFound { .. }) => 4,
            _ => 1,
        }
    }

    /// Machine-readable error code (snake_case).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Api(api) => match api {
                ApiError::Unauthorized { .. } => "auth_failed",
                ApiError::NotFound { .. } => "not_found",
                ApiError::EndpointNotFound { .. } => "endpoint_not_found",
                ApiError::Status { .. } => "api_error",
                ApiError::Decode { .. } => "malformed_response",
                ApiError::Timeout { .. } => "timeout",
                ApiError::InvalidUrl { .. }
                | ApiError::Request(_)
                | ApiError::Transport(_)
                | ApiError::Encode(_)
                | ApiError::Runtime(_) => "transport_error",
            },
            Self::Initiator(InitiatorError::UnsupportedProtocol { .. }) => "unsupported_protocol",
            Self::Initiator(_) => "initiator_error",
            Self::Output(_) => "output_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let auth = BrickError::from(ApiError::Unauthorized {
            message: "bad".to_owned(),
        });
        assert_eq!(auth.exit_code(), 3);
        assert_eq!(auth.code(), "auth_failed");

        let missing = BrickError::from(ApiError::NotFound {
            message: "gone".to_owned(),
        });
        assert_eq!(missing.exit_code(), 4);

        let probe = BrickError::from(InitiatorError::MultipathdNotRunning);
        assert_eq!(probe.exit_code(), 1);
        assert_eq!(probe.code(), "initiator_error");
    }

    #[test]
    fn test_api_error_is_transparent() {
        let err = BrickError::from(ApiError::Unauthorized {
            message: "The request you have made requires authentication.".to_owned(),
        });
        assert_eq!(
            err.to_string(),
            "Authentication failed: The request you have made requires authentication."
        );
    }
}
