/// CLI argument definitions via clap derive.
use std::net::IpAddr;

use clap::{ArgGroup, Args, Parser, ValueEnum};

/// brick-volume: find the local device paths backing an in-use Cinder volume.
#[derive(Debug, Parser)]
#[command(
    name = "brick-volume",
    about = "Find the local device paths backing an in-use Cinder volume",
    version,
    group(ArgGroup::new("mode").required(true).args(["list", "volume"])),
    group(ArgGroup::new("tenant").required(true).multiple(true).args(["os_tenant_name", "os_tenant_id"]))
)]
pub struct Cli {
    #[command(flatten)]
    pub auth: AuthArgs,

    /// List available attached volumes.
    #[arg(short, long)]
    pub list: bool,

    /// Cinder volume id to resolve to local device paths.
    #[arg(short, long, value_name = "CINDER_VOLUME_ID")]
    pub volume: Option<String>,

    /// Output format for the single-volume report.
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output: OutputFormat,

    /// Command prefix used to run privileged probes. Empty runs them directly.
    #[arg(long, value_name = "CMD", default_value = "sudo")]
    pub root_helper: String,

    /// Address to report to the control plane instead of the detected one.
    #[arg(long, value_name = "ADDR")]
    pub my_ip: Option<IpAddr>,

    /// Fail if multipathd is not running.
    #[arg(long)]
    pub enforce_multipath: bool,

    /// Per-request timeout for control-plane calls, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log debug details (initiator properties, HTTP calls, stage timings) to stderr.
    #[arg(long)]
    pub debug: bool,
}

/// Identity-service credentials, with the usual `OS_*` environment fallbacks.
#[derive(Debug, Args)]
pub struct AuthArgs {
    /// Username to authenticate with.
    #[arg(long, env = "OS_USERNAME", value_name = "AUTH_USER_NAME")]
    pub os_username: String,

    /// Password to authenticate with.
    #[arg(long, env = "OS_PASSWORD", value_name = "AUTH_PASSWORD", hide_env_values = true)]
    pub os_password: String,

    /// Tenant (project) name to scope the token to.
    #[arg(long, env = "OS_TENANT_NAME", value_name = "AUTH_TENANT_NAME")]
    pub os_tenant_name: Option<String>,

    /// Tenant (project) id to scope the token to.
    #[arg(long, env = "OS_TENANT_ID", value_name = "AUTH_TENANT_ID")]
    pub os_tenant_id: Option<String>,

    /// Identity service endpoint, e.g. http://keystone:5000/v2.0.
    #[arg(long, env = "OS_AUTH_URL", value_name = "AUTH_URL")]
    pub os_auth_url: String,

    /// Region to pick the volume endpoint from.
    #[arg(long, env = "OS_REGION_NAME", value_name = "REGION_NAME")]
    pub os_region_name: Option<String>,
}

/// Output format variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Two-column property table (human-readable).
    #[default]
    Table,
    /// JSON object (pretty-printed, keys sorted).
    Json,
}
