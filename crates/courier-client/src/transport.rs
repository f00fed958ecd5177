//! QUIC transport for the client.
//!
//! Provides [`ConnectedClient`] which handles QUIC I/O for envelope
//! transport: the `Hello` handshake, request/response correlation, and
//! the server's push stream. Protocol logic remains in the Sans-IO
//! [`crate::ChatStore`].

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use courier_proto::{ALPN_PROTOCOL, Envelope, PushEvent, Request, Response, UserId, wire};
use quinn::{ClientConfig, Endpoint};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection closed before a response arrived.
    #[error("connection closed")]
    Closed,
}

/// Pending request map: correlation id to response waiter.
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Handle to a connected client with QUIC transport.
///
/// Requests are correlated with responses by id; push events arrive on
/// the [`ConnectedClient::events`] channel in server order.
pub struct ConnectedClient {
    /// Submit requests to the connection task.
    requests: mpsc::Sender<(Request, oneshot::Sender<Response>)>,
    /// Push events from the server.
    pub events: mpsc::Receiver<PushEvent>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Perform one request and wait for its response.
    pub async fn request(&self, request: Request) -> Result<Response, TransportError> {
        let (tx, rx) = oneshot::channel();

        self.requests
            .send((request, tx))
            .await
            .map_err(|_| TransportError::Closed)?;

        rx.await.map_err(|_| TransportError::Closed)
    }

    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to a Courier server via QUIC and perform the `Hello`
/// handshake as `user`.
pub async fn connect(server_addr: &str, user: UserId) -> Result<ConnectedClient, TransportError> {
    let addr: SocketAddr = server_addr
        .parse()
        .map_err(|e| TransportError::Connection(format!("invalid address: {e}")))?;

    let client_config = insecure_client_config()?;
    let local: SocketAddr = "0.0.0.0:0"
        .parse()
        .map_err(|e| TransportError::Connection(format!("invalid local address: {e}")))?;
    let mut endpoint = Endpoint::client(local)
        .map_err(|e| TransportError::Connection(format!("endpoint creation failed: {e}")))?;
    endpoint.set_default_client_config(client_config);

    let connection = endpoint
        .connect(addr, "localhost")
        .map_err(|e| TransportError::Connection(format!("connect failed: {e}")))?
        .await
        .map_err(|e| TransportError::Connection(format!("connection failed: {e}")))?;

    // One bidirectional stream carries the handshake and every
    // request; responses and pushes come back on the server's
    // unidirectional stream.
    let (mut send, _recv) = connection
        .open_bi()
        .await
        .map_err(|e| TransportError::Stream(format!("open_bi failed: {e}")))?;

    write_envelope(&mut send, &Envelope::Hello { user }).await?;

    let (requests_tx, requests_rx) = mpsc::channel::<(Request, oneshot::Sender<Response>)>(32);
    let (events_tx, events_rx) = mpsc::channel::<PushEvent>(32);

    let handle = tokio::spawn(run_connection(connection, send, requests_rx, events_tx));

    Ok(ConnectedClient {
        requests: requests_tx,
        events: events_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and QUIC.
async fn run_connection(
    connection: quinn::Connection,
    mut send: quinn::SendStream,
    mut requests: mpsc::Receiver<(Request, oneshot::Sender<Response>)>,
    events: mpsc::Sender<PushEvent>,
) {
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

    // The server opens exactly one unidirectional stream; everything
    // it sends arrives there in order.
    let pending_recv = Arc::clone(&pending);
    let recv_handle = tokio::spawn(async move {
        match connection.accept_uni().await {
            Ok(recv) => {
                if let Err(e) = handle_incoming_stream(recv, pending_recv, events).await {
                    tracing::debug!("Incoming stream ended: {e}");
                }
            },
            Err(e) => {
                tracing::debug!("Accept uni error: {e}");
            },
        }
    });

    let mut next_request_id: u64 = 1;

    while let Some((request, waiter)) = requests.recv().await {
        let request_id = next_request_id;
        next_request_id += 1;

        {
            let mut pending = pending.lock().await;
            pending.insert(request_id, waiter);
        }

        let envelope = Envelope::Request { request_id, request };
        if let Err(e) = write_envelope(&mut send, &envelope).await {
            tracing::warn!("Send error: {e}");
            let mut pending = pending.lock().await;
            pending.remove(&request_id);
        }
    }

    recv_handle.abort();
}

/// Read envelopes off the server's push stream, routing responses to
/// their waiters and events to the event channel.
async fn handle_incoming_stream(
    mut recv: quinn::RecvStream,
    pending: PendingMap,
    events: mpsc::Sender<PushEvent>,
) -> Result<(), TransportError> {
    loop {
        let Some(envelope) = read_envelope(&mut recv).await? else {
            return Ok(());
        };

        match envelope {
            Envelope::Response { request_id, response } => {
                let waiter = {
                    let mut pending = pending.lock().await;
                    pending.remove(&request_id)
                };
                match waiter {
                    // Waiter dropped: caller gave up on the request.
                    Some(tx) => drop(tx.send(response)),
                    None => tracing::debug!("Response for unknown request {request_id}"),
                }
            },

            Envelope::Event(event) => {
                events
                    .send(event)
                    .await
                    .map_err(|e| TransportError::Stream(format!("channel send failed: {e}")))?;
            },

            Envelope::Hello { .. } | Envelope::Request { .. } => {
                return Err(TransportError::Protocol(
                    "unexpected client-bound envelope".to_string(),
                ));
            },
        }
    }
}

/// Read one length-prefixed envelope; `None` on clean end of stream.
async fn read_envelope(
    recv: &mut quinn::RecvStream,
) -> Result<Option<Envelope>, TransportError> {
    let mut prefix = [0u8; wire::LENGTH_PREFIX_SIZE];
    if recv.read_exact(&mut prefix).await.is_err() {
        return Ok(None);
    }

    let body_len =
        wire::body_len(&prefix).map_err(|e| TransportError::Protocol(e.to_string()))?;

    let mut frame = vec![0u8; wire::LENGTH_PREFIX_SIZE + body_len];
    frame[..wire::LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);
    recv.read_exact(&mut frame[wire::LENGTH_PREFIX_SIZE..])
        .await
        .map_err(|e| TransportError::Stream(format!("truncated envelope: {e}")))?;

    Envelope::decode(&frame)
        .map(Some)
        .map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Write one envelope to a stream.
async fn write_envelope(
    send: &mut quinn::SendStream,
    envelope: &Envelope,
) -> Result<(), TransportError> {
    let mut buf = Vec::new();
    envelope
        .encode(&mut buf)
        .map_err(|e| TransportError::Protocol(format!("encode failed: {e}")))?;

    send.write_all(&buf).await.map_err(|e| TransportError::Stream(format!("write failed: {e}")))?;

    Ok(())
}

/// Create an insecure client config that accepts any certificate.
///
/// WARNING: Development only. Production should verify certificates.
fn insecure_client_config() -> Result<ClientConfig, TransportError> {
    let mut crypto = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier))
        .with_no_client_auth();

    // Must match the server's ALPN protocol.
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let mut config = ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(crypto)
            .map_err(|e| TransportError::Connection(format!("TLS config error: {e}")))?,
    ));

    let mut transport = quinn::TransportConfig::default();
    let idle = quinn::IdleTimeout::try_from(std::time::Duration::from_secs(30))
        .map_err(|e| TransportError::Connection(format!("idle timeout error: {e}")))?;
    transport.max_idle_timeout(Some(idle));
    config.transport_config(Arc::new(transport));

    Ok(config)
}

/// Certificate verifier that accepts any certificate (insecure, for
/// development).
#[derive(Debug)]
struct InsecureCertVerifier;

impl rustls::client::danger::ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
