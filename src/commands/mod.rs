/// Command dispatch: probe the initiator, connect, then list or show.
pub mod list;
pub mod show;

use std::io::Write;

use tracing::debug;

use crate::brick::Initiator;
use crate::cinder::{ApiError, VolumeApi};
use crate::cli::{Cli, OutputCtx};
use crate::errors::BrickError;

/// What one invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode<'a> {
    /// Print every in-use volume.
    List,
    /// Report one volume and its local device paths.
    Show { volume_id: &'a str },
}

impl<'a> Mode<'a> {
    /// Pick the mode from parsed args. clap guarantees exactly one is set.
    #[must_use]
    pub fn from_cli(cli: &'a Cli) -> Self {
        match cli.volume.as_deref() {
            Some(volume_id) => Self::Show { volume_id },
            None => Self::List,
        }
    }
}

/// Run one invocation.
///
/// The initiator is probed before the control plane is contacted, so a probe
/// failure ends the run without any API call. `connect` authenticates and
/// returns the volume client.
///
/// # Errors
///
/// Returns `BrickError` from whichever stage failed first.
pub fn dispatch<A, F, W>(
    mode: Mode<'_>,
    initiator: &dyn Initiator,
    connect: F,
    ctx: &OutputCtx,
    out: &mut W,
) -> Result<(), BrickError>
where
    A: VolumeApi,
    F: FnOnce() -> Result<A, ApiError>,
    W: Write,
{
    let _t_probe = ctx.timer("get_connector_properties");
    let connector = initiator.connector_properties()?;
    drop(_t_probe);
    debug!(?connector, "initiator");

    let _t_auth = ctx.timer("authenticate");
    let client = connect()?;
    drop(_t_auth);

    match mode {
        Mode::List => list::run(&client, ctx, out),
        Mode::Show { volume_id } => show::run(&client, initiator, &connector, volume_id, ctx, out),
    }
}
