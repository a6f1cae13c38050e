//! HTTP listener that upgrades authorized clients to port discovery sessions.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{PortPoller, ProcessTable};
use crate::application::{Session, SessionOptions};
use crate::config::RelayConfig;
use crate::domain::RegistrationChange;
use crate::error::Result;

/// Path clients upgrade on.
pub const DISCOVERY_PATH: &str = "/portdisco";

const BASIC_CHALLENGE: &str = r#"Basic realm="restricted", charset="UTF-8""#;

/// What a client needs to connect, printed once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerDetails {
    pub address: String,
    #[serde(serialize_with = "port_as_string")]
    pub port: u16,
    pub nonce: String,
}

/// Clients keep the port as a string and hand it back on restart.
fn port_as_string<S: Serializer>(port: &u16, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(port)
}

/// Generate a fresh 32-character hex nonce.
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// A bound relay listener.
///
/// Every accepted connection must present the nonce as its HTTP Basic auth
/// user and ask for [`DISCOVERY_PATH`]; each one then runs its own
/// [`Session`] with its own poller and state.
pub struct RelayServer {
    listener: TcpListener,
    port: u16,
    nonce: Arc<str>,
    config: Arc<RelayConfig>,
    observer: Option<mpsc::UnboundedSender<RegistrationChange>>,
}

impl RelayServer {
    /// Bind the listener. Use port 0 to let the OS pick one.
    pub async fn bind(
        ip: IpAddr,
        port: u16,
        nonce: impl Into<String>,
        config: RelayConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let port = listener.local_addr()?.port();
        debug!(port, "relay server bound");

        Ok(Self {
            listener,
            port,
            nonce: Arc::from(nonce.into()),
            config: Arc::new(config),
            observer: None,
        })
    }

    #[cfg(test)]
    fn with_observer(mut self, observer: mpsc::UnboundedSender<RegistrationChange>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn details(&self) -> ServerDetails {
        ServerDetails {
            address: format!("http://127.0.0.1:{}", self.port),
            port: self.port,
            nonce: self.nonce.to_string(),
        }
    }

    /// Accept connections until `shutdown` flips to `true` or its sender is
    /// dropped. Running sessions see the same signal and wind down too.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(port = self.port, "relay server listening");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("relay server shutting down");
                        return Ok(());
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(handle_connection(
                            stream,
                            peer,
                            Arc::clone(&self.nonce),
                            Arc::clone(&self.config),
                            shutdown.clone(),
                            self.observer.clone(),
                        ));
                    }
                    Err(e) => warn!(error = %e, "failed to accept connection"),
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    nonce: Arc<str>,
    config: Arc<RelayConfig>,
    shutdown: watch::Receiver<bool>,
    observer: Option<mpsc::UnboundedSender<RegistrationChange>>,
) {
    debug!(%peer, "connection accepted");

    let check = |request: &Request, response: Response| {
        authorize(request, &nonce).map(|()| response)
    };
    let ws = match tokio_tungstenite::accept_hdr_async(stream, check).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "websocket upgrade failed");
            return;
        }
    };
    info!(%peer, "port discovery client connected");

    let session = Session::new(
        ws,
        PortPoller::new(config.include_localhost),
        ProcessTable::new(),
        SessionOptions::from(config.as_ref()),
    )
    .with_observer(observer);

    if let Err(e) = session.run(shutdown).await {
        warn!(%peer, error = %e, "session ended with error");
    }
}

/// Gate the upgrade: the Basic auth user must be the nonce, then the path
/// must be the discovery endpoint.
fn authorize(request: &Request, nonce: &str) -> std::result::Result<(), ErrorResponse> {
    match basic_auth_user(request) {
        Some(user) if user == nonce => {}
        Some(_) => return Err(rejection(StatusCode::UNAUTHORIZED, "unauthorized", false)),
        None => return Err(rejection(StatusCode::UNAUTHORIZED, "unauthorized", true)),
    }

    if request.uri().path() != DISCOVERY_PATH {
        return Err(rejection(StatusCode::NOT_FOUND, "not found", false));
    }
    Ok(())
}

/// User name from an `Authorization: Basic ...` header. The password is
/// ignored.
fn basic_auth_user(request: &Request) -> Option<String> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (user, _password) = credentials.split_once(':')?;
    Some(user.to_string())
}

fn rejection(status: StatusCode, body: &str, challenge: bool) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(body.to_string()));
    *response.status_mut() = status;
    if challenge {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::Error as WsError;

    const NONCE: &str = "123";

    fn request(path: &str, auth: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(path);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(()).unwrap()
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    async fn start_server(
        config: RelayConfig,
    ) -> (
        ServerDetails,
        watch::Sender<bool>,
        mpsc::UnboundedReceiver<RegistrationChange>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = RelayServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, NONCE, config)
            .await
            .expect("bind should succeed")
            .with_observer(tx);
        let details = server.details();
        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(server.serve(shutdown_rx));
        (details, shutdown, rx)
    }

    fn client_request(port: u16, path: &str, auth: Option<String>) -> Request {
        let mut request = format!("ws://127.0.0.1:{port}{path}")
            .into_client_request()
            .unwrap();
        if let Some(auth) = auth {
            request
                .headers_mut()
                .insert(AUTHORIZATION, HeaderValue::from_str(&auth).unwrap());
        }
        request
    }

    fn rejected_status(error: WsError) -> StatusCode {
        match error {
            WsError::Http(response) => response.status(),
            other => panic!("expected HTTP rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_nonce() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(nonce, generate_nonce());
    }

    #[test]
    fn test_basic_auth_user() {
        let req = request("/portdisco", Some(&basic("123", "whatever")));
        assert_eq!(basic_auth_user(&req).as_deref(), Some("123"));

        let req = request("/portdisco", Some(&basic("123", "")));
        assert_eq!(basic_auth_user(&req).as_deref(), Some("123"));

        let req = request("/portdisco", Some("Bearer abc"));
        assert_eq!(basic_auth_user(&req), None);

        let req = request("/portdisco", Some("Basic !!!"));
        assert_eq!(basic_auth_user(&req), None);

        assert_eq!(basic_auth_user(&request("/portdisco", None)), None);
    }

    #[test]
    fn test_authorize() {
        assert!(authorize(&request("/portdisco", Some(&basic(NONCE, ""))), NONCE).is_ok());

        let missing = authorize(&request("/portdisco", None), NONCE).unwrap_err();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        let challenge = missing.headers().get(WWW_AUTHENTICATE).unwrap();
        assert_eq!(challenge.to_str().unwrap(), BASIC_CHALLENGE);

        let wrong = authorize(&request("/portdisco", Some(&basic("nope", ""))), NONCE).unwrap_err();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert!(wrong.headers().get(WWW_AUTHENTICATE).is_none());

        let path = authorize(&request("/other", Some(&basic(NONCE, ""))), NONCE).unwrap_err();
        assert_eq!(path.status(), StatusCode::NOT_FOUND);

        // auth is checked before routing
        let both = authorize(&request("/other", None), NONCE).unwrap_err();
        assert_eq!(both.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_details() {
        let server = RelayServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, "abc", RelayConfig::default())
            .await
            .expect("bind should succeed");

        let details = server.details();
        assert!(details.port > 0);
        assert_eq!(details.address, format!("http://127.0.0.1:{}", details.port));
        assert_eq!(details.nonce, "abc");

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["port"], details.port.to_string());
        assert!(json["port"].is_string());
        assert_eq!(json["address"], details.address);
        assert_eq!(json["nonce"], "abc");
    }

    #[tokio::test]
    async fn test_upgrade_requires_nonce() {
        let (details, shutdown, _changes) = start_server(RelayConfig::default()).await;

        let err = tokio_tungstenite::connect_async(client_request(details.port, DISCOVERY_PATH, None))
            .await
            .unwrap_err();
        assert_eq!(rejected_status(err), StatusCode::UNAUTHORIZED);

        let err = tokio_tungstenite::connect_async(client_request(
            details.port,
            DISCOVERY_PATH,
            Some(basic("wrong", "")),
        ))
        .await
        .unwrap_err();
        assert_eq!(rejected_status(err), StatusCode::UNAUTHORIZED);

        shutdown.send(true).unwrap();
    }

    #[tokio::test]
    async fn test_upgrade_wrong_path() {
        let (details, shutdown, _changes) = start_server(RelayConfig::default()).await;

        let err = tokio_tungstenite::connect_async(client_request(
            details.port,
            "/serve",
            Some(basic(NONCE, "")),
        ))
        .await
        .unwrap_err();
        assert_eq!(rejected_status(err), StatusCode::NOT_FOUND);

        shutdown.send(true).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_notifies_own_listener() {
        use crate::domain::Notification;
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::tungstenite::Message;

        let config = RelayConfig {
            poll_interval_secs: 1,
            ..RelayConfig::default()
        };
        let (details, shutdown, mut changes) = start_server(config).await;

        let (mut ws, _) = tokio_tungstenite::connect_async(client_request(
            details.port,
            DISCOVERY_PATH,
            Some(basic(NONCE, "")),
        ))
        .await
        .expect("upgrade should succeed");

        let pid = std::process::id();
        ws.send(Message::text(format!(r#"{{"type":"addPID","pid":{pid}}}"#)))
            .await
            .unwrap();
        let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .unwrap();
        assert_eq!(change, Some(RegistrationChange::Added(pid)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let want = listener.local_addr().unwrap().port();

        // other tests in this process may open listeners too
        let found = tokio::time::timeout(Duration::from_secs(15), async {
            while let Some(frame) = ws.next().await {
                if let Ok(Message::Text(text)) = frame {
                    let Notification::NewPort { port, message } =
                        serde_json::from_str(text.as_str()).unwrap();
                    if port == want {
                        return Some(message);
                    }
                }
            }
            None
        })
        .await
        .expect("timed out waiting for newPort");

        let message = found.expect("connection closed before newPort");
        assert!(message.starts_with(&format!("Port {want} was started by ")));

        drop(listener);
        shutdown.send(true).unwrap();
    }
}
