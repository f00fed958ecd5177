//! Courier production server.
//!
//! Production server for the Courier direct-messaging protocol, using
//! Quinn for QUIC transport, Tokio for the async runtime, and system
//! time with cryptographic RNG.
//!
//! # Architecture
//!
//! The [`ServerDriver`] is a pure state machine: it consumes events
//! and produces actions, with no I/O of its own. [`Server`] is the
//! production glue that feeds it connection and envelope events from
//! Quinn streams and executes the resulting actions.
//!
//! Each client connection carries one client-opened bidirectional
//! stream for the handshake and all requests, and one server-opened
//! unidirectional stream for all responses and push events. The single
//! outbound stream keeps responses and pushes ordered per client.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`Server`]: Production runtime that executes driver actions
//! - [`QuinnTransport`]: QUIC transport via Quinn
//! - [`SystemEnv`]: Production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
pub mod env;
mod error;
pub mod media;
mod presence;
mod registry;
mod router;
pub mod store;
mod system_env;
mod transport;

use std::{collections::HashMap, sync::Arc};

use courier_proto::{Envelope, UserId, wire, wire::LENGTH_PREFIX_SIZE};
pub use driver::{LogLevel, ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
use env::Environment;
pub use error::ServerError;
use media::MemoryObjectStore;
pub use presence::broadcast_online;
pub use registry::ConnectionRegistry;
pub use router::route;
use store::MemoryStore;
pub use system_env::SystemEnv;
use tokio::sync::RwLock;
pub use transport::{QuinnConnection, QuinnTransport};

/// Shared state for all connections.
struct SharedState {
    /// Connection id → QUIC connection (for closing).
    connections: RwLock<HashMap<u64, QuinnConnection>>,
    /// Connection id → persistent outbound stream. All responses and
    /// pushes to a client go through this single stream, ensuring
    /// ordering.
    outbound_streams: RwLock<HashMap<u64, tokio::sync::Mutex<quinn::SendStream>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:4600")
    pub bind_address: String,
    /// Path to TLS certificate (PEM format)
    pub cert_path: Option<String>,
    /// Path to TLS private key (PEM format)
    pub key_path: Option<String>,
    /// Driver configuration (connection limits)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4600".to_string(),
            cert_path: None,
            key_path: None,
            driver: DriverConfig::default(),
        }
    }
}

/// Production driver instantiation.
type ProductionDriver = ServerDriver<SystemEnv, MemoryStore, MemoryObjectStore>;

/// Production Courier server.
///
/// Wraps [`ServerDriver`] with Quinn QUIC transport and the system
/// environment.
pub struct Server {
    /// The action-based server driver
    driver: ProductionDriver,
    /// QUIC endpoint
    transport: QuinnTransport,
    /// Environment
    env: SystemEnv,
}

impl Server {
    /// Create and bind a new server.
    pub fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let store = MemoryStore::new();
        let media = MemoryObjectStore::new();
        let driver = ServerDriver::new(env.clone(), store, media, config.driver);

        let transport =
            QuinnTransport::bind(&config.bind_address, config.cert_path, config.key_path)?;

        Ok(Self { driver, transport, env })
    }

    /// Run the server, accepting connections and processing envelopes.
    ///
    /// Runs until the server is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let env = self.env;
        let driver = Arc::new(tokio::sync::Mutex::new(self.driver));
        let shared = Arc::new(SharedState {
            connections: RwLock::new(HashMap::new()),
            outbound_streams: RwLock::new(HashMap::new()),
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, driver, shared, env).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single QUIC connection.
///
/// The first envelope on the client's bidirectional stream must be
/// `Hello`; anything else closes the connection before any state is
/// registered.
async fn handle_connection(
    conn: QuinnConnection,
    driver: Arc<tokio::sync::Mutex<ProductionDriver>>,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let connection_id = env.random_u64();

    tracing::debug!("New connection: {}", connection_id);

    let outbound_stream = conn
        .open_uni()
        .await
        .map_err(|e| ServerError::Transport(format!("failed to open outbound stream: {e}")))?;

    let (send, mut recv) = conn.accept_bi().await?;
    drop(send);

    let user = match read_envelope(&mut recv).await? {
        Some(Envelope::Hello { user }) => user,
        Some(_) => {
            conn.close(1u32.into(), b"handshake required");
            return Err(ServerError::Protocol("first envelope was not Hello".to_string()));
        },
        None => return Ok(()),
    };

    {
        let mut connections = shared.connections.write().await;
        connections.insert(connection_id, conn.clone());
    }

    {
        let mut streams = shared.outbound_streams.write().await;
        streams.insert(connection_id, tokio::sync::Mutex::new(outbound_stream));
    }

    // From here on the connection is registered in the shared maps, so
    // the cleanup below must run no matter how the read loop ends.
    if let Err(e) = drive_connection(connection_id, user, &mut recv, &driver, &shared).await {
        tracing::warn!("Connection {} terminated: {}", connection_id, e);
    }

    // Unregister first so the disconnect broadcast already excludes
    // this connection, then drop the shared handles.
    {
        let mut driver = driver.lock().await;
        match driver.process_event(ServerEvent::ConnectionClosed {
            connection_id,
            reason: "connection closed".to_string(),
        }) {
            Ok(actions) => {
                if let Err(e) = execute_actions(actions, &shared).await {
                    tracing::warn!("Disconnect broadcast failed for {}: {}", connection_id, e);
                }
            },
            Err(e) => {
                tracing::warn!("Disconnect processing failed for {}: {}", connection_id, e);
            },
        }
    }

    {
        let mut connections = shared.connections.write().await;
        connections.remove(&connection_id);
    }

    {
        let mut streams = shared.outbound_streams.write().await;
        streams.remove(&connection_id);
    }

    Ok(())
}

/// Announce a registered connection and serve its request loop.
///
/// Errors here end the connection but never skip the caller's cleanup.
async fn drive_connection(
    connection_id: u64,
    user: UserId,
    recv: &mut quinn::RecvStream,
    driver: &Arc<tokio::sync::Mutex<ProductionDriver>>,
    shared: &Arc<SharedState>,
) -> Result<(), ServerError> {
    {
        let mut driver = driver.lock().await;
        let actions = driver.process_event(ServerEvent::ConnectionOpened { connection_id, user })?;
        execute_actions(actions, shared).await?;
    }

    while let Some(envelope) = read_envelope(recv).await? {
        let Envelope::Request { request_id, request } = envelope else {
            tracing::warn!("Unexpected envelope from connection {}", connection_id);
            continue;
        };

        let actions = {
            let mut driver = driver.lock().await;
            match driver.process_event(ServerEvent::RequestReceived {
                connection_id,
                request_id,
                request,
            }) {
                Ok(actions) => actions,
                Err(e) => {
                    tracing::warn!("Request processing error: {}", e);
                    continue;
                },
            }
        };

        execute_actions(actions, shared).await?;
    }

    Ok(())
}

/// Read one length-prefixed envelope from a stream.
///
/// Returns `None` when the stream ends cleanly at an envelope
/// boundary.
async fn read_envelope(recv: &mut quinn::RecvStream) -> Result<Option<Envelope>, ServerError> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    if recv.read_exact(&mut prefix).await.is_err() {
        return Ok(None);
    }

    let body_len = wire::body_len(&prefix)?;

    let mut frame = vec![0u8; LENGTH_PREFIX_SIZE + body_len];
    frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);
    recv.read_exact(&mut frame[LENGTH_PREFIX_SIZE..])
        .await
        .map_err(|e| ServerError::Transport(format!("truncated envelope: {e}")))?;

    Ok(Some(Envelope::decode(&frame)?))
}

/// Write one envelope to a connection's outbound stream.
async fn send_envelope(
    shared: &SharedState,
    connection_id: u64,
    envelope: &Envelope,
) -> Result<(), ServerError> {
    let mut buf = Vec::new();
    envelope.encode(&mut buf)?;

    let streams = shared.outbound_streams.read().await;
    match streams.get(&connection_id) {
        Some(stream_mutex) => {
            let mut stream = stream_mutex.lock().await;
            if let Err(e) = stream.write_all(&buf).await {
                tracing::warn!("Envelope write failed for {}: {}", connection_id, e);
            }
        },
        None => {
            tracing::warn!("Send: connection {} not found", connection_id);
        },
    }

    Ok(())
}

/// Execute server actions.
async fn execute_actions(
    actions: Vec<ServerAction>,
    shared: &SharedState,
) -> Result<(), ServerError> {
    for action in actions {
        match action {
            ServerAction::Respond { connection_id, request_id, response } => {
                let envelope = Envelope::Response { request_id, response };
                send_envelope(shared, connection_id, &envelope).await?;
            },

            ServerAction::Push { connection_id, event } => {
                let envelope = Envelope::Event(event);
                send_envelope(shared, connection_id, &envelope).await?;
            },

            ServerAction::CloseConnection { connection_id, reason } => {
                tracing::info!("Closing connection {}: {}", connection_id, reason);
                let mut connections = shared.connections.write().await;
                if let Some(conn) = connections.remove(&connection_id) {
                    conn.close(0u32.into(), reason.as_bytes());
                }
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }

    Ok(())
}
