/// Protocol-keyed connector selection.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::errors::InitiatorError;
use super::fibre_channel::FibreChannelConnector;
use super::iscsi::IscsiConnector;
use super::local::LocalConnector;
use crate::config::HostLayout;

/// Volume transports this tool can resolve device paths for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Iscsi,
    FibreChannel,
    Local,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iscsi => "ISCSI",
            Self::FibreChannel => "FIBRE_CHANNEL",
            Self::Local => "LOCAL",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = InitiatorError;

    /// Parse a `driver_volume_type` tag, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ISCSI" => Ok(Self::Iscsi),
            "FIBRE_CHANNEL" => Ok(Self::FibreChannel),
            "LOCAL" => Ok(Self::Local),
            _ => Err(InitiatorError::UnsupportedProtocol {
                protocol: s.to_owned(),
            }),
        }
    }
}

/// A transport-specific connector.
#[derive(Debug)]
pub enum Connector<'a> {
    Iscsi(IscsiConnector<'a>),
    FibreChannel(FibreChannelConnector<'a>),
    Local(LocalConnector),
}

impl<'a> Connector<'a> {
    /// Build the connector for `protocol`.
    #[must_use]
    pub fn factory(protocol: Protocol, layout: &'a HostLayout, use_multipath: bool) -> Self {
        match protocol {
            Protocol::Iscsi => {
                Self::Iscsi(IscsiConnector::new(&layout.by_path_dir, use_multipath))
            }
            Protocol::FibreChannel => {
                Self::FibreChannel(FibreChannelConnector::new(&layout.by_path_dir))
            }
            Protocol::Local => Self::Local(LocalConnector),
        }
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Iscsi(_) => Protocol::Iscsi,
            Self::FibreChannel(_) => Protocol::FibreChannel,
            Self::Local(_) => Protocol::Local,
        }
    }

    /// Resolve connection data to the local device paths that exist now.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError::MissingField` / `InvalidField` if the data
    /// lacks what the transport needs, or `InitiatorError::Io` on host reads.
    pub fn get_volume_paths(
        &self,
        data: &Map<String, Value>,
    ) -> Result<Vec<PathBuf>, InitiatorError> {
        match self {
            Self::Iscsi(c) => c.get_volume_paths(data),
            Self::FibreChannel(c) => c.get_volume_paths(data),
            Self::Local(c) => c.get_volume_paths(data),
        }
    }
}

// --- Connection data helpers ---

pub(super) fn required<'d>(
    data: &'d Map<String, Value>,
    field: &'static str,
) -> Result<&'d Value, InitiatorError> {
    data.get(field)
        .filter(|v| !v.is_null())
        .ok_or(InitiatorError::MissingField { field })
}

pub(super) fn required_str<'d>(
    data: &'d Map<String, Value>,
    field: &'static str,
) -> Result<&'d str, InitiatorError> {
    required(data, field)?
        .as_str()
        .ok_or_else(|| InitiatorError::InvalidField {
            field,
            reason: "expected a string".to_owned(),
        })
}

/// A LUN given as a JSON number or a numeric string.
pub(super) fn lun(value: &Value, field: &'static str) -> Result<u64, InitiatorError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| InitiatorError::InvalidField {
        field,
        reason: format!("expected a non-negative LUN, got {value}"),
    })
}

/// LUN as it appears in `/dev/disk/by-path` names.
///
/// LUNs below 256 are plain decimal; larger ones use the SAM flat addressing
/// form.
#[must_use]
pub fn format_lun(lun: u64) -> String {
    if lun < 256 {
        lun.to_string()
    } else {
        format!("0x{:04x}{:04x}00000000", lun & 0xffff, (lun >> 16) & 0xffff)
    }
}
