/// Single-volume mode: report one volume and the local paths backing it.
use std::io::Write;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::debug;

use crate::brick::{ConnectorProperties, Initiator};
use crate::cinder::{Volume, VolumeApi};
use crate::cli::OutputCtx;
use crate::cli::output::write_report;
use crate::errors::BrickError;
use crate::types::SYSTEM_PATHS_KEY;

/// Run `brick-volume --volume <id>`.
///
/// # Errors
///
/// Returns `BrickError` on API failure, connector failure, or if stdout
/// cannot be written.
pub fn run<W: Write>(
    client: &dyn VolumeApi,
    initiator: &dyn Initiator,
    connector: &ConnectorProperties,
    volume_id: &str,
    ctx: &OutputCtx,
    out: &mut W,
) -> Result<(), BrickError> {
    let _t_get = ctx.timer("get_volume");
    let volume = client.get_volume(volume_id)?;
    drop(_t_get);

    let paths = resolve_system_paths(client, initiator, connector, &volume, ctx)?;
    let report = build_report(&volume, paths.as_deref());
    write_report(out, &report, ctx)?;
    Ok(())
}

/// Ask the control plane for a connection descriptor and resolve it locally.
///
/// Returns `None` without contacting anything when the volume is not in use.
fn resolve_system_paths(
    client: &dyn VolumeApi,
    initiator: &dyn Initiator,
    connector: &ConnectorProperties,
    volume: &Volume,
    ctx: &OutputCtx,
) -> Result<Option<Vec<PathBuf>>, BrickError> {
    if !volume.is_in_use() {
        debug!(volume = %volume.id, status = %volume.status, "volume not in use, skipping path lookup");
        return Ok(None);
    }

    let _t_conn = ctx.timer("initialize_connection");
    let connection = client.initialize_connection(volume, connector)?;
    drop(_t_conn);

    let _t_paths = ctx.timer("get_volume_paths");
    let paths = initiator.volume_paths(&connection, connector.multipath)?;
    drop(_t_paths);

    Ok(Some(paths))
}

/// The fields the server returned (minus `links`) plus `system-paths` when
/// resolved.
fn build_report(volume: &Volume, system_paths: Option<&[PathBuf]>) -> Map<String, Value> {
    let mut report = volume.fields().clone();
    if let Some(paths) = system_paths {
        let paths = paths
            .iter()
            .map(|p| Value::String(p.to_string_lossy().into_owned()))
            .collect();
        report.insert(SYSTEM_PATHS_KEY.to_owned(), Value::Array(paths));
    }
    report
}
