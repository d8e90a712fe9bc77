//! Runtime configuration.
//!
//! Built once from the parsed command line and passed by reference into the
//! volume client and the initiator layer. Nothing here is global.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

/// Volume API major version the client talks to.
pub const VOLUME_API_VERSION: u32 = 2;

/// Everything one invocation needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub initiator: InitiatorConfig,
    /// Per-request timeout for control-plane calls. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Identity-service credentials and scope.
#[derive(Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub tenant_name: Option<String>,
    pub tenant_id: Option<String>,
    /// Identity endpoint, e.g. `http://keystone:5000/v2.0`.
    pub auth_url: String,
    /// Restrict catalog lookups to this region.
    pub region: Option<String>,
}

impl AuthConfig {
    /// Catalog service type for the configured volume API version.
    #[must_use]
    pub fn volume_service_type(&self) -> String {
        format!("volumev{VOLUME_API_VERSION}")
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tenant_name", &self.tenant_name)
            .field("tenant_id", &self.tenant_id)
            .field("auth_url", &self.auth_url)
            .field("region", &self.region)
            .finish()
    }
}

/// How the local initiator is probed.
#[derive(Debug, Clone)]
pub struct InitiatorConfig {
    /// Command prefix for privileged probes. Empty runs commands directly.
    pub root_helper: String,
    /// Address reported to the control plane. Detected when unset.
    pub my_ip: Option<IpAddr>,
    /// Probe whether multipathd is running.
    pub multipath: bool,
    /// Fail when multipath is requested but multipathd is not running.
    pub enforce_multipath: bool,
    pub layout: HostLayout,
}

/// Host filesystem locations the initiator layer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLayout {
    /// Stable per-transport device symlinks.
    pub by_path_dir: PathBuf,
    /// Fibre Channel HBA attributes.
    pub fc_host_dir: PathBuf,
    pub iscsi_initiator_file: PathBuf,
    pub nvme_hostnqn_file: PathBuf,
    pub hostname_file: PathBuf,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self {
            by_path_dir: PathBuf::from("/dev/disk/by-path"),
            fc_host_dir: PathBuf::from("/sys/class/fc_host"),
            iscsi_initiator_file: PathBuf::from("/etc/iscsi/initiatorname.iscsi"),
            nvme_hostnqn_file: PathBuf::from("/etc/nvme/hostnqn"),
            hostname_file: PathBuf::from("/proc/sys/kernel/hostname"),
        }
    }
}

impl Config {
    /// Construct from CLI args.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let auth = &cli.auth;
        Self {
            auth: AuthConfig {
                username: auth.os_username.clone(),
                password: auth.os_password.clone(),
                tenant_name: auth.os_tenant_name.clone(),
                tenant_id: auth.os_tenant_id.clone(),
                auth_url: auth.os_auth_url.clone(),
                region: auth.os_region_name.clone(),
            },
            initiator: InitiatorConfig {
                root_helper: cli.root_helper.clone(),
                my_ip: cli.my_ip,
                multipath: true,
                enforce_multipath: cli.enforce_multipath,
                layout: HostLayout::default(),
            },
            timeout: cli.timeout.map(Duration::from_secs),
        }
    }
}
