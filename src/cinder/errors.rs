/// Errors from the control-plane API layer.
use thiserror::Error;

/// Typed errors from authenticating against and calling the volume API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The identity service or the volume API rejected the credentials or token.
    #[error("Authentication failed: {message}")]
    Unauthorized {
        /// Server-supplied message.
        message: String,
    },

    /// The requested resource does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Server-supplied message.
        message: String,
    },

    /// Any other non-success HTTP status.
    #[error("{method} {url} returned HTTP {status}: {message}")]
    Status {
        /// HTTP method of the failed request.
        method: String,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, or the raw body when it is not JSON.
        message: String,
    },

    /// The service catalog has no endpoint for the volume service.
    #[error("No '{service_type}' endpoint in the service catalog{}", .region.as_deref().map(|r| format!(" for region '{r}'")).unwrap_or_default())]
    EndpointNotFound {
        /// Catalog service type that was searched.
        service_type: String,
        /// Region filter, if any.
        region: Option<String>,
    },

    /// A URL built from the configuration or the catalog did not parse.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        #[source]
        source: hyper::http::uri::InvalidUri,
    },

    /// Building the HTTP request failed.
    #[error("Failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    /// Connection-level failure.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] hyper::Error),

    /// The request exceeded the configured timeout.
    #[error("Request to {url} timed out")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// The response body did not match the expected shape.
    #[error("Malformed response from {url}: {source}")]
    Decode {
        /// Request URL.
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The I/O runtime driving the HTTP client could not be started.
    #[error("Failed to start the I/O runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Extract a human-readable message from an API error body.
///
/// Both the identity and volume services wrap errors as
/// `{"<kind>": {"message": "...", "code": N}}`. Falls back to the raw body.
#[must_use]
pub fn error_message(body: &[u8]) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        v.as_object()?
            .values()
            .find_map(|inner| inner.get("message")?.as_str())
            .map(str::to_owned)
    });
    message.unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_owned())
}
