/// Control-plane layer: volume records, errors, and the API client.
pub mod auth;
pub mod client;
pub mod errors;
pub mod volume;

pub use client::CinderClient;
pub use errors::ApiError;
pub use volume::{ConnectionInfo, Volume, VolumeStatus};

use crate::brick::ConnectorProperties;

/// Volume API operations the tool consumes.
pub trait VolumeApi {
    /// List volume records, across all tenants when `include_all` is set.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on any API or transport failure.
    fn list_volumes(&self, include_all: bool) -> Result<Vec<Volume>, ApiError>;

    /// Fetch one volume record by id.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no such volume exists.
    fn get_volume(&self, id: &str) -> Result<Volume, ApiError>;

    /// Ask the control plane to export `volume` to the given initiator.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on any API or transport failure.
    fn initialize_connection(
        &self,
        volume: &Volume,
        connector: &ConnectorProperties,
    ) -> Result<ConnectionInfo, ApiError>;
}
