/// Shared serializable output types.
///
/// The single-volume report is a plain JSON object (volume fields plus
/// `system-paths`), so only the error envelope needs a dedicated type here.
use serde::{Deserialize, Serialize};

use crate::errors::BrickError;

/// Report key holding the resolved device paths.
pub const SYSTEM_PATHS_KEY: &str = "system-paths";

/// A structured error envelope for JSON error output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    /// Always `false`.
    pub ok: bool,
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail in the JSON error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (snake_case).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Process exit code.
    pub exit_code: i32,
}

impl ErrorOutput {
    /// Construct from a `BrickError`.
    #[must_use]
    pub fn from_error(err: &BrickError) -> Self {
        Self {
            ok: false,
            error: ErrorDetail {
                code: err.code().to_owned(),
                message: err.to_string(),
                exit_code: err.exit_code(),
            },
        }
    }
}
