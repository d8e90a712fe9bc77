/// Identity (Keystone v2) password authentication and catalog lookup.
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use crate::config::AuthConfig;

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Debug, Serialize)]
struct AuthBody<'a> {
    #[serde(rename = "passwordCredentials")]
    password_credentials: PasswordCredentials<'a>,
    #[serde(rename = "tenantName", skip_serializing_if = "Option::is_none")]
    tenant_name: Option<&'a str>,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    tenant_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    #[serde(rename = "publicURL")]
    public_url: String,
    #[serde(default)]
    region: Option<String>,
}

/// An authenticated session: token plus the volume endpoint it is valid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    /// Volume API base URL, without a trailing slash.
    pub volume_endpoint: String,
}

/// URL of the token-issuing resource under the configured identity endpoint.
#[must_use]
pub fn tokens_url(auth: &AuthConfig) -> String {
    format!("{}/tokens", auth.auth_url.trim_end_matches('/'))
}

/// JSON body for a password-credential token request.
///
/// # Errors
///
/// Returns `serde_json::Error` if serialization fails.
pub fn token_request_body(auth: &AuthConfig) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&AuthRequest {
        auth: AuthBody {
            password_credentials: PasswordCredentials {
                username: &auth.username,
                password: &auth.password,
            },
            tenant_name: auth.tenant_name.as_deref(),
            tenant_id: auth.tenant_id.as_deref(),
        },
    })
}

impl AuthResponse {
    /// Pick the token and the volume endpoint out of a token response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::EndpointNotFound` if the catalog has no matching
    /// endpoint for `service_type` (and `region`, when given).
    pub fn into_session(
        self,
        service_type: &str,
        region: Option<&str>,
    ) -> Result<Session, ApiError> {
        let endpoint = self
            .access
            .service_catalog
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|ep| region.is_none_or(|r| ep.region.as_deref() == Some(r)))
            .ok_or_else(|| ApiError::EndpointNotFound {
                service_type: service_type.to_owned(),
                region: region.map(str::to_owned),
            })?;

        Ok(Session {
            token: self.access.token.id,
            volume_endpoint: endpoint.public_url.trim_end_matches('/').to_owned(),
        })
    }
}
