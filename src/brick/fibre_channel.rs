/// Fibre Channel connector: device paths under `/dev/disk/by-path`.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::connector::{format_lun, lun, required};
use super::errors::InitiatorError;

/// Resolves Fibre Channel connection data to by-path device links.
///
/// FC links are named `<bus>-<hba>-fc-0x<wwn>-lun-<lun>`, where the bus is
/// `pci` on most hosts and `ccw` or `platform` elsewhere. Only the suffix is
/// matched, so the HBA part never has to be rebuilt from sysfs.
#[derive(Debug)]
pub struct FibreChannelConnector<'a> {
    by_path_dir: &'a Path,
}

impl<'a> FibreChannelConnector<'a> {
    #[must_use]
    pub fn new(by_path_dir: &'a Path) -> Self {
        Self { by_path_dir }
    }

    /// Existing device paths for every target WWN at the connection's LUN.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError::MissingField` or `InvalidField` on malformed
    /// data, or `InitiatorError::Io` if the by-path directory is unreadable.
    pub fn get_volume_paths(
        &self,
        data: &Map<String, Value>,
    ) -> Result<Vec<PathBuf>, InitiatorError> {
        let wwns = target_wwns(required(data, "target_wwn")?)?;
        let lun = format_lun(lun(required(data, "target_lun")?, "target_lun")?);
        let suffixes: Vec<String> = wwns
            .iter()
            .map(|wwn| format!("-fc-0x{wwn}-lun-{lun}"))
            .collect();

        let entries = match fs::read_dir(self.by_path_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(InitiatorError::Io {
                    path: self.by_path_dir.to_owned(),
                    source,
                });
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                suffixes.iter().any(|s| name.ends_with(s.as_str()))
            })
            .map(|entry| entry.path())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

/// `target_wwn` is either a single WWN or a list of them.
fn target_wwns(value: &Value) -> Result<Vec<String>, InitiatorError> {
    let invalid = |reason: String| InitiatorError::InvalidField {
        field: "target_wwn",
        reason,
    };
    match value {
        Value::String(s) => Ok(vec![normalize_wwn(s)]),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(normalize_wwn)
                    .ok_or_else(|| invalid(format!("expected a string, got {v}")))
            })
            .collect(),
        other => Err(invalid(format!("expected a string or list, got {other}"))),
    }
}

fn normalize_wwn(wwn: &str) -> String {
    let wwn = wwn.trim().to_ascii_lowercase();
    wwn.strip_prefix("0x").map_or_else(|| wwn.clone(), str::to_owned)
}
