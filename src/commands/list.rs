/// List mode: print every in-use volume visible to the credentials.
use std::io::Write;

use crate::cinder::VolumeApi;
use crate::cli::OutputCtx;
use crate::cli::output::write_volume_list;
use crate::errors::BrickError;

/// Run `brick-volume --list`.
///
/// Volumes are printed in the order the control plane returns them.
///
/// # Errors
///
/// Returns `BrickError` on API failure or if stdout cannot be written.
pub fn run<W: Write>(
    client: &dyn VolumeApi,
    ctx: &OutputCtx,
    out: &mut W,
) -> Result<(), BrickError> {
    let _t_list = ctx.timer("list_volumes");
    let volumes = client.list_volumes(true)?;
    drop(_t_list);

    write_volume_list(out, volumes.iter().filter(|v| v.is_in_use()))?;
    Ok(())
}
