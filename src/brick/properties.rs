/// Connector properties: this host's identity as a storage initiator.
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::InitiatorError;
use super::executor::Executor;
use crate::config::HostLayout;

const OS_TYPE: &str = "linux2";

/// Initiator descriptor sent to the control plane with `os-initialize_connection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorProperties {
    /// Machine architecture, e.g. `x86_64`.
    pub platform: String,
    pub os_type: String,
    /// Address the storage backend should export to.
    pub ip: String,
    pub host: String,
    /// Whether multipathd is running and multipath should be used.
    pub multipath: bool,
    pub enforce_multipath: bool,
    /// iSCSI initiator IQN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator: Option<String>,
    /// Fibre Channel port WWNs of online HBAs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wwpns: Option<Vec<String>>,
    /// Fibre Channel node WWNs of online HBAs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wwnns: Option<Vec<String>>,
    /// NVMe host NQN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nqn: Option<String>,
}

/// What to probe beyond the static identity files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeOptions {
    pub multipath: bool,
    pub enforce_multipath: bool,
}

/// Gather this host's connector properties.
///
/// Identity files that do not exist are skipped; the corresponding key is
/// omitted from the result.
///
/// # Errors
///
/// Returns `InitiatorError::MultipathdNotRunning` when multipath is enforced
/// but not available, `InitiatorError::Execution` if a probe command cannot be
/// started for a reason other than being absent, or `InitiatorError::Io` on
/// unreadable host state.
pub fn get_connector_properties(
    layout: &HostLayout,
    executor: &dyn Executor,
    ip: IpAddr,
    opts: ProbeOptions,
) -> Result<ConnectorProperties, InitiatorError> {
    let multipath = opts.multipath && multipathd_running(executor, opts.enforce_multipath)?;
    let hbas = online_fc_hosts(&layout.fc_host_dir)?;

    let wwpns: Vec<String> = hbas.iter().map(|h| h.port_name.clone()).collect();
    let wwnns: Vec<String> = hbas.into_iter().map(|h| h.node_name).collect();

    Ok(ConnectorProperties {
        platform: std::env::consts::ARCH.to_owned(),
        os_type: OS_TYPE.to_owned(),
        ip: ip.to_string(),
        host: hostname(&layout.hostname_file),
        multipath,
        enforce_multipath: opts.enforce_multipath,
        initiator: iscsi_initiator_name(&layout.iscsi_initiator_file, executor)?,
        wwpns: (!wwpns.is_empty()).then_some(wwpns),
        wwnns: (!wwnns.is_empty()).then_some(wwnns),
        nqn: read_optional(&layout.nvme_hostnqn_file)?.filter(|s| !s.is_empty()),
    })
}

/// This host's primary IPv4 address.
///
/// Uses the source address the kernel would pick to reach a public address;
/// no packet is sent. Falls back to loopback when there is no route.
#[must_use]
pub fn my_ipv4() -> IpAddr {
    let probe = || -> io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or_else(|e| {
        debug!(error = %e, "no route to determine primary address, using loopback");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

fn multipathd_running(executor: &dyn Executor, enforce: bool) -> Result<bool, InitiatorError> {
    let running = match executor.execute("multipathd", &["show", "status"]) {
        Ok(output) => output.status.success(),
        Err(InitiatorError::Execution { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            false
        }
        Err(e) => return Err(e),
    };
    if !running {
        debug!("multipathd is not running");
        if enforce {
            return Err(InitiatorError::MultipathdNotRunning);
        }
    }
    Ok(running)
}

/// Read a file and trim it, treating a missing file as absent.
fn read_optional(path: &Path) -> Result<Option<String>, InitiatorError> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s.trim().to_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(InitiatorError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}

fn hostname(path: &Path) -> String {
    read_optional(path)
        .ok()
        .flatten()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "localhost".to_owned())
}

/// The initiator IQN. The file is usually root-only, so an unreadable file is
/// retried through the root helper.
fn iscsi_initiator_name(
    path: &Path,
    executor: &dyn Executor,
) -> Result<Option<String>, InitiatorError> {
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let path_str = path.to_string_lossy();
            let output = executor.execute("cat", &[path_str.as_ref()])?;
            if !output.status.success() {
                debug!(path = %path.display(), "could not read initiator name");
                return Ok(None);
            }
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
        Err(source) => {
            return Err(InitiatorError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };
    Ok(parse_initiator_name(&contents))
}

fn parse_initiator_name(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .find_map(|l| l.strip_prefix("InitiatorName="))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

struct FcHost {
    port_name: String,
    node_name: String,
}

/// Online Fibre Channel HBAs, in sysfs name order.
fn online_fc_hosts(dir: &Path) -> Result<Vec<FcHost>, InitiatorError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(InitiatorError::Io {
                path: dir.to_owned(),
                source,
            });
        }
    };
    let mut hosts: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    hosts.sort();

    let mut result = Vec::new();
    for host in hosts {
        if read_optional(&host.join("port_state"))?.as_deref() != Some("Online") {
            continue;
        }
        let (Some(port_name), Some(node_name)) = (
            read_optional(&host.join("port_name"))?,
            read_optional(&host.join("node_name"))?,
        ) else {
            continue;
        };
        result.push(FcHost {
            port_name: strip_hex_prefix(&port_name),
            node_name: strip_hex_prefix(&node_name),
        });
    }
    Ok(result)
}

fn strip_hex_prefix(wwn: &str) -> String {
    wwn.strip_prefix("0x").unwrap_or(wwn).to_owned()
}
