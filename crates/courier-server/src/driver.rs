//! Server driver.
//!
//! Ties together the connection registry, presence broadcasting,
//! message persistence, media uploads, and event fan-out. The driver
//! is a pure state machine: it consumes [`ServerEvent`] inputs and
//! produces [`ServerAction`] instructions for the runtime to execute,
//! with no I/O of its own. All registry and store mutations for one
//! event happen inside a single `process_event` call, so concurrent
//! lookups never observe half-updated state.

use courier_proto::{
    ApiError, EventKind, ImageUpload, Message, MessageId, PushEvent, Request, Response, UserId,
    UserProfile,
};

use crate::{
    env::Environment,
    error::ServerError,
    media::{MediaError, ObjectStore},
    presence,
    registry::ConnectionRegistry,
    router,
    store::{MessageStore, StoreError},
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// Produced by the external runtime (production transport or tests).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A connection completed its handshake for `user`.
    ConnectionOpened {
        /// Unique connection id assigned by the runtime.
        connection_id: u64,
        /// User the connection authenticated as.
        user: UserId,
    },

    /// A connection was closed (by peer or error).
    ConnectionClosed {
        /// Connection that was closed.
        connection_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// A request envelope was received from a connection.
    RequestReceived {
        /// Connection that sent the request.
        connection_id: u64,
        /// Correlation id to echo in the response.
        request_id: u64,
        /// The operation.
        request: Request,
    },
}

/// Actions that the server driver produces.
///
/// Executed by runtime-specific code. Push and response delivery are
/// decoupled: a failed push never affects the response to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Send an operation result to a connection.
    Respond {
        /// Target connection.
        connection_id: u64,
        /// Correlation id of the triggering request.
        request_id: u64,
        /// The result.
        response: Response,
    },

    /// Push an event to a connection. Best-effort, at-most-once.
    Push {
        /// Target connection.
        connection_id: u64,
        /// The event.
        event: PushEvent,
    },

    /// Close a connection.
    CloseConnection {
        /// Connection to close.
        connection_id: u64,
        /// Reason for closure.
        reason: String,
    },

    /// Log a message.
    Log {
        /// Log level.
        level: LogLevel,
        /// Message to log.
        message: String,
    },
}

/// Log levels for driver actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational message.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Action-based server driver.
///
/// Orchestrates connection lifecycle, presence, request handling, and
/// message-event fan-out.
pub struct ServerDriver<E, S, O>
where
    E: Environment,
    S: MessageStore,
    O: ObjectStore,
{
    /// User/connection registry.
    registry: ConnectionRegistry,
    /// Message and profile persistence.
    store: S,
    /// External object store for image uploads.
    media: O,
    /// Environment (time, RNG).
    env: E,
    /// Server configuration.
    config: ServerConfig,
}

impl<E, S, O> ServerDriver<E, S, O>
where
    E: Environment,
    S: MessageStore,
    O: ObjectStore,
{
    /// Create a new server driver.
    pub fn new(env: E, store: S, media: O, config: ServerConfig) -> Self {
        Self { registry: ConnectionRegistry::new(), store, media, env, config }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, ServerError> {
        match event {
            ServerEvent::ConnectionOpened { connection_id, user } => {
                self.handle_connection_opened(connection_id, user)
            },
            ServerEvent::ConnectionClosed { connection_id, reason } => {
                Ok(self.handle_connection_closed(connection_id, &reason))
            },
            ServerEvent::RequestReceived { connection_id, request_id, request } => {
                Ok(self.handle_request(connection_id, request_id, request))
            },
        }
    }

    /// Handle a connection that completed its handshake.
    ///
    /// Registers the connection (closing any displaced one for the
    /// same user) and broadcasts the new presence set to everyone.
    fn handle_connection_opened(
        &mut self,
        connection_id: u64,
        user: UserId,
    ) -> Result<Vec<ServerAction>, ServerError> {
        if self.registry.len() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                connection_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        let mut actions = Vec::new();

        if let Some(displaced) = self.registry.register(user, connection_id) {
            actions.push(ServerAction::CloseConnection {
                connection_id: displaced,
                reason: "superseded by newer connection".to_string(),
            });
        }

        // First sight of a user creates a placeholder profile so the
        // roster can include them before any profile update.
        self.store.ensure_user(&UserProfile {
            id: user,
            display_name: format!("user-{user}"),
            avatar_url: None,
        })?;

        actions.push(ServerAction::Log {
            level: LogLevel::Info,
            message: format!("connection {connection_id} opened for user {user}"),
        });
        actions.extend(presence::broadcast_online(&self.registry));

        Ok(actions)
    }

    /// Handle a connection being closed.
    fn handle_connection_closed(&mut self, connection_id: u64, reason: &str) -> Vec<ServerAction> {
        let mut actions = Vec::new();

        match self.registry.unregister(connection_id) {
            Some(user) => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("connection {connection_id} (user {user}) closed: {reason}"),
                });
                actions.extend(presence::broadcast_online(&self.registry));
            },
            None => {
                // Already displaced by a reconnect; presence is
                // unchanged.
                actions.push(ServerAction::Log {
                    level: LogLevel::Debug,
                    message: format!("stale disconnect for connection {connection_id}: {reason}"),
                });
            },
        }

        actions
    }

    /// Handle a request from a connection.
    ///
    /// The response action always precedes any fan-out pushes, and
    /// fan-out never affects the response.
    fn handle_request(
        &mut self,
        connection_id: u64,
        request_id: u64,
        request: Request,
    ) -> Vec<ServerAction> {
        let Some(caller) = self.registry.user_for_connection(connection_id) else {
            return vec![ServerAction::Respond {
                connection_id,
                request_id,
                response: Response::Error(ApiError::auth_required()),
            }];
        };

        let (response, fanout) = match self.dispatch(caller, request) {
            Ok((response, fanout)) => (response, fanout),
            Err(error) => (Response::Error(error), Vec::new()),
        };

        let mut actions = vec![ServerAction::Respond { connection_id, request_id, response }];
        actions.extend(fanout);
        actions
    }

    /// Execute one operation for `caller`.
    ///
    /// Returns the response plus the fan-out actions for the
    /// counterpart's connection, if any.
    fn dispatch(
        &mut self,
        caller: UserId,
        request: Request,
    ) -> Result<(Response, Vec<ServerAction>), ApiError> {
        match request {
            Request::ListUsers => {
                let users = self.store.list_users(caller).map_err(store_api_error)?;
                Ok((Response::Users(users), Vec::new()))
            },

            Request::FetchConversation { peer } => {
                let messages =
                    self.store.conversation(caller, peer).map_err(store_api_error)?;
                Ok((Response::Conversation(messages), Vec::new()))
            },

            Request::SendMessage { to, text, image } => self.send_message(caller, to, text, image),

            Request::EditMessage { id, text, image } => self.edit_message(caller, id, text, image),

            Request::DeleteMessage { id } => {
                let deleted = self
                    .store
                    .delete_message(id)
                    .map_err(store_api_error)?
                    .ok_or_else(|| ApiError::not_found(id))?;

                let fanout =
                    router::route(&self.registry, caller, &deleted, EventKind::Deleted);
                Ok((Response::Deleted(id), fanout))
            },

            Request::ReplaceImage { id, image } => {
                let mut message = self.load_message(id)?;
                message.image = Some(self.upload(&image)?);
                message.updated_at_ms = self.env.wall_clock_ms();
                self.store.update_message(&message).map_err(store_api_error)?;

                let fanout =
                    router::route(&self.registry, caller, &message, EventKind::Updated);
                Ok((Response::Message(message), fanout))
            },

            Request::RemoveImage { id } => {
                let mut message = self.load_message(id)?;
                message.image = None;
                message.updated_at_ms = self.env.wall_clock_ms();
                self.finish_mutation(caller, message)
            },
        }
    }

    /// Create and persist a new message, then fan out `Created`.
    fn send_message(
        &mut self,
        caller: UserId,
        to: UserId,
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<(Response, Vec<ServerAction>), ApiError> {
        let has_text = text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_text && image.is_none() {
            return Err(ApiError::validation("message requires text or an image"));
        }

        let image_url = image.as_ref().map(|i| self.upload(i)).transpose()?;
        let now = self.env.wall_clock_ms();

        let message = Message {
            id: MessageId(self.env.random_u64()),
            sender: caller,
            receiver: to,
            text: text.filter(|t| !t.trim().is_empty()),
            image: image_url,
            created_at_ms: now,
            updated_at_ms: now,
        };

        self.store.insert_message(&message).map_err(store_api_error)?;

        let fanout = router::route(&self.registry, caller, &message, EventKind::Created);
        Ok((Response::Message(message), fanout))
    }

    /// Replace text and image of an existing message.
    fn edit_message(
        &mut self,
        caller: UserId,
        id: MessageId,
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> Result<(Response, Vec<ServerAction>), ApiError> {
        let mut message = self.load_message(id)?;

        message.text = text.filter(|t| !t.trim().is_empty());
        message.image = image.as_ref().map(|i| self.upload(i)).transpose()?;
        message.updated_at_ms = self.env.wall_clock_ms();

        self.finish_mutation(caller, message)
    }

    /// Persist a mutated message, or delete it if the mutation left it
    /// with neither text nor image.
    fn finish_mutation(
        &mut self,
        caller: UserId,
        message: Message,
    ) -> Result<(Response, Vec<ServerAction>), ApiError> {
        if message.is_empty() {
            let id = message.id;
            self.store.delete_message(id).map_err(store_api_error)?;

            let fanout = router::route(&self.registry, caller, &message, EventKind::Deleted);
            return Ok((Response::Deleted(id), fanout));
        }

        self.store.update_message(&message).map_err(store_api_error)?;

        let fanout = router::route(&self.registry, caller, &message, EventKind::Updated);
        Ok((Response::Message(message), fanout))
    }

    fn load_message(&self, id: MessageId) -> Result<Message, ApiError> {
        self.store
            .message(id)
            .map_err(store_api_error)?
            .ok_or_else(|| ApiError::not_found(id))
    }

    fn upload(&self, image: &ImageUpload) -> Result<String, ApiError> {
        self.media.upload(&image.0).map_err(|e| match e {
            MediaError::InvalidDataUri(_) => ApiError::validation(e.to_string()),
            MediaError::Upload(_) => ApiError::media_error(e.to_string()),
        })
    }

    /// Registry view, for tests and the runtime.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Message store backend.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

impl<E, S, O> std::fmt::Debug for ServerDriver<E, S, O>
where
    E: Environment,
    S: MessageStore,
    O: ObjectStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver").field("connection_count", &self.registry.len()).finish()
    }
}

/// Map a store failure onto the API error taxonomy.
fn store_api_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(id) => ApiError::not_found(id),
        StoreError::Backend(reason) => ApiError::storage_error(reason),
    }
}
