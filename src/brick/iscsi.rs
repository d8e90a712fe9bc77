/// iSCSI connector: device paths under `/dev/disk/by-path`.
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use super::connector::{format_lun, lun, required, required_str};
use super::errors::InitiatorError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    portal: String,
    iqn: String,
    lun: u64,
}

/// Resolves iSCSI connection data to by-path device links.
#[derive(Debug)]
pub struct IscsiConnector<'a> {
    by_path_dir: &'a Path,
    use_multipath: bool,
}

impl<'a> IscsiConnector<'a> {
    #[must_use]
    pub fn new(by_path_dir: &'a Path, use_multipath: bool) -> Self {
        Self {
            by_path_dir,
            use_multipath,
        }
    }

    /// Existing device paths for the connection's targets.
    ///
    /// With multipath every portal/IQN/LUN triple is a candidate; otherwise
    /// only the primary target is. Data without any portal yields no paths.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError::MissingField` or `InvalidField` on malformed data.
    pub fn get_volume_paths(
        &self,
        data: &Map<String, Value>,
    ) -> Result<Vec<PathBuf>, InitiatorError> {
        if !data.contains_key("target_portal") && !data.contains_key("target_portals") {
            debug!("iSCSI connection data names no portal");
            return Ok(Vec::new());
        }
        let targets = if self.use_multipath {
            all_targets(data)?
        } else {
            vec![primary_target(data)?]
        };

        let paths = targets
            .iter()
            .map(|t| self.device_path(t))
            .filter(|p| {
                let exists = p.exists();
                if !exists {
                    debug!(path = %p.display(), "iSCSI device path not present");
                }
                exists
            })
            .collect();
        Ok(paths)
    }

    fn device_path(&self, target: &Target) -> PathBuf {
        self.by_path_dir.join(format!(
            "ip-{}-iscsi-{}-lun-{}",
            target.portal,
            target.iqn,
            format_lun(target.lun)
        ))
    }
}

fn primary_target(data: &Map<String, Value>) -> Result<Target, InitiatorError> {
    Ok(Target {
        portal: required_str(data, "target_portal")?.to_owned(),
        iqn: required_str(data, "target_iqn")?.to_owned(),
        lun: lun(required(data, "target_lun")?, "target_lun")?,
    })
}

/// Every target of a multipath-capable export, falling back to the primary
/// target when the plural keys are absent.
fn all_targets(data: &Map<String, Value>) -> Result<Vec<Target>, InitiatorError> {
    let plural = (
        data.get("target_portals").and_then(Value::as_array),
        data.get("target_iqns").and_then(Value::as_array),
        data.get("target_luns").and_then(Value::as_array),
    );
    let (Some(portals), Some(iqns), Some(luns)) = plural else {
        return Ok(vec![primary_target(data)?]);
    };
    if portals.len() != iqns.len() || portals.len() != luns.len() {
        return Err(InitiatorError::InvalidField {
            field: "target_portals",
            reason: format!(
                "{} portals, {} iqns and {} luns do not line up",
                portals.len(),
                iqns.len(),
                luns.len()
            ),
        });
    }

    portals
        .iter()
        .zip(iqns)
        .zip(luns)
        .map(|((portal, iqn), l)| {
            Ok(Target {
                portal: as_str(portal, "target_portals")?,
                iqn: as_str(iqn, "target_iqns")?,
                lun: lun(l, "target_luns")?,
            })
        })
        .collect()
}

fn as_str(value: &Value, field: &'static str) -> Result<String, InitiatorError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| InitiatorError::InvalidField {
            field,
            reason: format!("expected a string, got {value}"),
        })
}
