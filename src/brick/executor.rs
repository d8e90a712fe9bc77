/// Host command execution, optionally through a root helper.
use std::process::{Command, Output};

use tracing::debug;

use super::errors::InitiatorError;

/// Runs commands on the host.
pub trait Executor {
    /// Run `program` with `args` and capture its output.
    ///
    /// A non-zero exit status is not an error; callers inspect `Output::status`.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError::Execution` if the process cannot be spawned.
    fn execute(&self, program: &str, args: &[&str]) -> Result<Output, InitiatorError>;
}

/// Executes commands prefixed by a root helper such as `sudo`.
#[derive(Debug, Clone)]
pub struct RootExecutor {
    root_helper: Vec<String>,
}

impl RootExecutor {
    /// Build from a helper command line. An empty helper runs commands directly.
    #[must_use]
    pub fn new(root_helper: &str) -> Self {
        Self {
            root_helper: root_helper.split_whitespace().map(str::to_owned).collect(),
        }
    }

    fn command(&self, program: &str, args: &[&str]) -> Command {
        match self.root_helper.split_first() {
            Some((helper, helper_args)) => {
                let mut cmd = Command::new(helper);
                cmd.args(helper_args).arg(program).args(args);
                cmd
            }
            None => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        }
    }
}

impl Executor for RootExecutor {
    fn execute(&self, program: &str, args: &[&str]) -> Result<Output, InitiatorError> {
        let mut cmd = self.command(program, args);
        let rendered = render(&cmd);
        debug!(command = %rendered, "executing");
        let output = cmd.output().map_err(|source| InitiatorError::Execution {
            command: rendered.clone(),
            source,
        })?;
        debug!(command = %rendered, status = ?output.status.code(), "executed");
        Ok(output)
    }
}

fn render(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
