/// Local initiator layer: host identity probing and device path resolution.
pub mod connector;
pub mod errors;
pub mod executor;
pub mod fibre_channel;
pub mod iscsi;
pub mod local;
pub mod properties;

use std::path::PathBuf;

use tracing::info;

pub use connector::{Connector, Protocol};
pub use errors::InitiatorError;
pub use executor::{Executor, RootExecutor};
pub use properties::{ConnectorProperties, ProbeOptions, get_connector_properties, my_ipv4};

use crate::cinder::ConnectionInfo;
use crate::config::InitiatorConfig;

/// Initiator operations the tool consumes.
pub trait Initiator {
    /// This host's connector properties.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError` if the host cannot be probed.
    fn connector_properties(&self) -> Result<ConnectorProperties, InitiatorError>;

    /// Resolve a connection descriptor to local device paths.
    ///
    /// # Errors
    ///
    /// Returns `InitiatorError::UnsupportedProtocol` for unknown transports, or
    /// the connector's error for malformed data.
    fn volume_paths(
        &self,
        connection: &ConnectionInfo,
        use_multipath: bool,
    ) -> Result<Vec<PathBuf>, InitiatorError>;
}

/// The real host, probed through its filesystem and the configured root helper.
pub struct HostInitiator<'a> {
    config: &'a InitiatorConfig,
    executor: RootExecutor,
}

impl<'a> HostInitiator<'a> {
    #[must_use]
    pub fn new(config: &'a InitiatorConfig) -> Self {
        Self {
            config,
            executor: RootExecutor::new(&config.root_helper),
        }
    }
}

impl Initiator for HostInitiator<'_> {
    fn connector_properties(&self) -> Result<ConnectorProperties, InitiatorError> {
        let ip = self.config.my_ip.unwrap_or_else(my_ipv4);
        get_connector_properties(
            &self.config.layout,
            &self.executor,
            ip,
            ProbeOptions {
                multipath: self.config.multipath,
                enforce_multipath: self.config.enforce_multipath,
            },
        )
    }

    fn volume_paths(
        &self,
        connection: &ConnectionInfo,
        use_multipath: bool,
    ) -> Result<Vec<PathBuf>, InitiatorError> {
        let protocol: Protocol = connection.driver_volume_type.parse()?;
        let connector = Connector::factory(protocol, &self.config.layout, use_multipath);
        info!(%protocol, use_multipath, "resolving volume paths");
        connector.get_volume_paths(&connection.data)
    }
}
