/// Blocking HTTP client for the volume API.
use std::fmt::Write as _;
use std::time::Duration;

use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::VolumeApi;
use super::auth::{self, AuthResponse, Session};
use super::errors::{ApiError, error_message};
use super::volume::{ConnectionInfo, Volume};
use crate::brick::ConnectorProperties;
use crate::config::AuthConfig;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Deserialize)]
struct VolumesEnvelope {
    volumes: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct VolumeEnvelope {
    volume: Volume,
}

#[derive(Debug, Deserialize)]
struct ConnectionEnvelope {
    connection_info: ConnectionInfo,
}

#[derive(Debug, Serialize)]
struct InitializeConnection<'a> {
    #[serde(rename = "os-initialize_connection")]
    action: ConnectorWrapper<'a>,
}

#[derive(Debug, Serialize)]
struct ConnectorWrapper<'a> {
    connector: &'a ConnectorProperties,
}

/// HTTP plumbing: a private current-thread runtime driving a hyper client.
struct Transport {
    runtime: Runtime,
    http: Client<HttpsConnector<HttpConnector>>,
    timeout: Option<Duration>,
}

impl Transport {
    fn new(timeout: Option<Duration>) -> Result<Self, ApiError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ApiError::Runtime)?;
        let http = Client::builder().build(HttpsConnector::new());
        Ok(Self {
            runtime,
            http,
            timeout,
        })
    }

    /// Send one request and return the body of a successful response.
    fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<hyper::body::Bytes, ApiError> {
        let uri: Uri = url.parse().map_err(|source| ApiError::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body))?,
            None => builder.body(Body::empty())?,
        };

        debug!(%method, url, "control-plane request");
        let exchange = async {
            let response = self.http.request(request).await?;
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, hyper::Error>((status, bytes))
        };
        let (status, bytes) = match self.timeout {
            Some(limit) => self
                .runtime
                .block_on(async { tokio::time::timeout(limit, exchange).await })
                .map_err(|_| ApiError::Timeout {
                    url: url.to_owned(),
                })??,
            None => self.runtime.block_on(exchange)?,
        };
        debug!(%method, url, status = status.as_u16(), "control-plane response");

        if status.is_success() {
            return Ok(bytes);
        }
        Err(status_error(&method, url, status, &bytes))
    }

    fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let bytes = self.send(method, url, token, body)?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            url: url.to_owned(),
            source,
        })
    }
}

/// Authenticated volume API client (API version 2).
pub struct CinderClient {
    transport: Transport,
    session: Session,
}

impl CinderClient {
    /// Authenticate against the identity service and locate the volume endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` on bad credentials,
    /// `ApiError::EndpointNotFound` if the catalog lacks a volume service, or a
    /// transport error if the identity service is unreachable.
    pub fn connect(auth: &AuthConfig, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let transport = Transport::new(timeout)?;
        let url = auth::tokens_url(auth);
        let body = auth::token_request_body(auth).map_err(ApiError::Encode)?;
        let response: AuthResponse = transport.json(Method::POST, &url, None, Some(body))?;
        let session =
            response.into_session(&auth.volume_service_type(), auth.region.as_deref())?;
        debug!(endpoint = %session.volume_endpoint, "authenticated");
        Ok(Self { transport, session })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.session.volume_endpoint)
    }
}

impl VolumeApi for CinderClient {
    fn list_volumes(&self, include_all: bool) -> Result<Vec<Volume>, ApiError> {
        let path = if include_all {
            "/volumes/detail?all_tenants=1"
        } else {
            "/volumes/detail"
        };
        let envelope: VolumesEnvelope =
            self.transport
                .json(Method::GET, &self.url(path), Some(&self.session.token), None)?;
        Ok(envelope.volumes)
    }

    fn get_volume(&self, id: &str) -> Result<Volume, ApiError> {
        let envelope: VolumeEnvelope = self.transport.json(
            Method::GET,
            &self.url(&format!("/volumes/{}", path_segment(id))),
            Some(&self.session.token),
            None,
        )?;
        Ok(envelope.volume)
    }

    fn initialize_connection(
        &self,
        volume: &Volume,
        connector: &ConnectorProperties,
    ) -> Result<ConnectionInfo, ApiError> {
        let url = self.url(&format!("/volumes/{}/action", path_segment(&volume.id)));
        let body = initialize_connection_body(connector).map_err(ApiError::Encode)?;
        let envelope: ConnectionEnvelope = self.transport.json(
            Method::POST,
            &url,
            Some(&self.session.token),
            Some(body),
        )?;
        Ok(envelope.connection_info)
    }
}

/// Map a non-success response to an error. 401 and 404 get their own
/// variants because they decide the exit code.
fn status_error(method: &Method, url: &str, status: StatusCode, body: &[u8]) -> ApiError {
    let message = error_message(body);
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        _ => ApiError::Status {
            method: method.to_string(),
            url: url.to_owned(),
            status: status.as_u16(),
            message,
        },
    }
}

/// Percent-encode a user-supplied value for use as one URL path segment.
fn path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'~') {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

fn initialize_connection_body(
    connector: &ConnectorProperties,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&InitializeConnection {
        action: ConnectorWrapper { connector },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use serde_json::{Value, json};

    use crate::errors::BrickError;

    const IDENTITY_401: &str = r#"{"error": {"message": "The request you have made requires authentication.", "code": 401, "title": "Unauthorized"}}"#;
    const VOLUME_404: &str =
        r#"{"itemNotFound": {"message": "Volume no such could not be found.", "code": 404}}"#;

    fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    /// Answer one connection per canned response and return the request lines seen.
    fn serve(listener: TcpListener, responses: Vec<(u16, String)>) -> JoinHandle<Vec<String>> {
        thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request_line(&mut stream));
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
            seen
        })
    }

    /// Consume a whole request (headers and body) and return its first line.
    fn read_request_line(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        head.lines().next().unwrap_or_default().to_owned()
    }

    fn auth_config(base: &str) -> AuthConfig {
        AuthConfig {
            username: "admin".to_owned(),
            password: "secret".to_owned(),
            tenant_name: Some("demo".to_owned()),
            tenant_id: None,
            auth_url: format!("{base}/v2.0"),
            region: None,
        }
    }

    fn token_response(base: &str) -> String {
        json!({
            "access": {
                "token": {"id": "tok-123"},
                "serviceCatalog": [
                    {"type": "volumev2", "endpoints": [
                        {"publicURL": format!("{base}/v2/t1"), "region": "RegionOne"}
                    ]}
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn test_initialize_connection_body() {
        let connector = ConnectorProperties {
            platform: "x86_64".to_owned(),
            os_type: "linux2".to_owned(),
            ip: "10.0.0.5".to_owned(),
            host: "compute-1".to_owned(),
            multipath: true,
            enforce_multipath: false,
            initiator: Some("iqn.1993-08.org.debian:01:abc".to_owned()),
            wwpns: None,
            wwnns: None,
            nqn: None,
        };
        let body: Value =
            serde_json::from_slice(&initialize_connection_body(&connector).unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "os-initialize_connection": {
                    "connector": {
                        "platform": "x86_64",
                        "os_type": "linux2",
                        "ip": "10.0.0.5",
                        "host": "compute-1",
                        "multipath": true,
                        "enforce_multipath": false,
                        "initiator": "iqn.1993-08.org.debian:01:abc"
                    }
                }
            })
        );
    }

    #[test]
    fn test_connection_envelope() {
        let envelope: ConnectionEnvelope = serde_json::from_value(json!({
            "connection_info": {
                "driver_volume_type": "iscsi",
                "data": {
                    "target_portal": "10.0.0.9:3260",
                    "target_iqn": "iqn.2000-05.com.3pardata:21210002ac00383d",
                    "target_lun": 1,
                    "target_discovered": true
                }
            }
        }))
        .unwrap();
        assert_eq!(envelope.connection_info.driver_volume_type, "iscsi");
        assert_eq!(envelope.connection_info.data["target_lun"], json!(1));
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        let transport = Transport::new(Some(Duration::from_secs(5))).unwrap();
        // Port 9 (discard) on loopback is not listening in test environments.
        let err = transport
            .send(Method::GET, "http://127.0.0.1:9/volumes", None, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_) | ApiError::Timeout { .. }));
    }

    #[test]
    fn test_invalid_url() {
        let transport = Transport::new(None).unwrap();
        let err = transport
            .send(Method::GET, "not a url", None, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn test_status_error_unauthorized() {
        let err = status_error(
            &Method::POST,
            "http://keystone:5000/v2.0/tokens",
            StatusCode::UNAUTHORIZED,
            IDENTITY_401.as_bytes(),
        );
        assert!(matches!(
            &err,
            ApiError::Unauthorized { message }
                if message == "The request you have made requires authentication."
        ));
        assert_eq!(BrickError::from(err).exit_code(), 3);
    }

    #[test]
    fn test_status_error_not_found() {
        let err = status_error(
            &Method::GET,
            "http://cinder:8776/v2/t1/volumes/abc",
            StatusCode::NOT_FOUND,
            VOLUME_404.as_bytes(),
        );
        assert!(matches!(
            &err,
            ApiError::NotFound { message } if message == "Volume no such could not be found."
        ));
        assert_eq!(BrickError::from(err).exit_code(), 4);
    }

    #[test]
    fn test_status_error_server_fault() {
        let body = br#"{"computeFault": {"message": "The server has either erred or is incapable of performing the requested operation.", "code": 500}}"#;
        let err = status_error(
            &Method::POST,
            "http://cinder:8776/v2/t1/volumes/abc/action",
            StatusCode::INTERNAL_SERVER_ERROR,
            body,
        );
        match &err {
            ApiError::Status {
                method,
                status,
                message,
                ..
            } => {
                assert_eq!(method, "POST");
                assert_eq!(*status, 500);
                assert!(message.starts_with("The server has either erred"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(BrickError::from(err).exit_code(), 1);
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(
            path_segment("6edbc2f4-1507-44f8-ac0d-eed1d2608d38"),
            "6edbc2f4-1507-44f8-ac0d-eed1d2608d38"
        );
        assert_eq!(path_segment("no such"), "no%20such");
        assert_eq!(path_segment("../a?b/c"), "%2E%2E%2Fa%3Fb%2Fc");
    }

    #[test]
    fn test_connect_rejected_credentials() {
        let (listener, base) = local_listener();
        let server = serve(listener, vec![(401, IDENTITY_401.to_owned())]);

        let err = CinderClient::connect(&auth_config(&base), Some(Duration::from_secs(5)))
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert_eq!(BrickError::from(err).exit_code(), 3);
        assert_eq!(server.join().unwrap(), ["POST /v2.0/tokens HTTP/1.1"]);
    }

    #[test]
    fn test_connect_then_get_volume() {
        let (listener, base) = local_listener();
        let volume = json!({"volume": {"id": "abc", "size": 1, "status": "in-use"}});
        let server = serve(
            listener,
            vec![(200, token_response(&base)), (200, volume.to_string())],
        );

        let client =
            CinderClient::connect(&auth_config(&base), Some(Duration::from_secs(5))).unwrap();
        let volume = client.get_volume("abc").unwrap();
        assert_eq!(volume.id, "abc");
        assert!(volume.is_in_use());
        assert_eq!(
            server.join().unwrap(),
            ["POST /v2.0/tokens HTTP/1.1", "GET /v2/t1/volumes/abc HTTP/1.1"]
        );
    }

    #[test]
    fn test_get_missing_volume_is_not_found() {
        let (listener, base) = local_listener();
        let server = serve(
            listener,
            vec![(200, token_response(&base)), (404, VOLUME_404.to_owned())],
        );

        let client =
            CinderClient::connect(&auth_config(&base), Some(Duration::from_secs(5))).unwrap();
        let err = client.get_volume("no such").unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(BrickError::from(err).exit_code(), 4);
        assert_eq!(
            server.join().unwrap(),
            ["POST /v2.0/tokens HTTP/1.1", "GET /v2/t1/volumes/no%20such HTTP/1.1"]
        );
    }
}
