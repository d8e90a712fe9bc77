/// Local connector: the control plane already knows the device path.
use std::path::PathBuf;

use serde_json::{Map, Value};

use super::connector::required_str;
use super::errors::InitiatorError;

#[derive(Debug, Clone, Copy)]
pub struct LocalConnector;

impl LocalConnector {
    /// The `device_path` from the connection data, as-is.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError::MissingField` if `device_path` is absent.
    pub fn get_volume_paths(
        &self,
        data: &Map<String, Value>,
    ) -> Result<Vec<PathBuf>, InitiatorError> {
        Ok(vec![PathBuf::from(required_str(data, "device_path")?)])
    }
}
