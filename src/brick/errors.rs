/// Errors from the local initiator layer.
use std::path::PathBuf;

use thiserror::Error;

/// Typed errors from probing the host and resolving device paths.
#[derive(Debug, Error)]
pub enum InitiatorError {
    /// No connector exists for the protocol tag the control plane returned.
    #[error("Unsupported volume transport '{protocol}'")]
    UnsupportedProtocol {
        /// The `driver_volume_type` as returned.
        protocol: String,
    },

    /// Connection data lacks a field the connector needs.
    #[error("Connection data is missing '{field}'")]
    MissingField {
        /// Name of the absent key.
        field: &'static str,
    },

    /// Connection data has a field of the wrong shape.
    #[error("Connection data field '{field}' is invalid: {reason}")]
    InvalidField {
        /// Name of the offending key.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A host command could not be started.
    #[error("Failed to execute '{command}': {source}")]
    Execution {
        /// The command line, root helper included.
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Multipath was enforced but multipathd is not running.
    #[error("multipathd is not running and multipath is enforced")]
    MultipathdNotRunning,

    /// Reading host state failed.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        /// File or directory being read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
