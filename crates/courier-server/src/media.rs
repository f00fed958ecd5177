//! External object-store interface for image payloads.
//!
//! Images arrive from clients as base64 `data:` URIs, are uploaded to
//! an external object store, and only the returned URL is persisted on
//! a message. The store itself is an external collaborator; this
//! module defines the interface and an in-memory implementation for
//! tests and development.

use std::sync::{Arc, Mutex};

use base64::Engine as _;
use thiserror::Error;

/// Errors from image handling.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The payload is not a well-formed base64 data URI.
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The object store rejected or failed the upload.
    #[error("upload failed: {0}")]
    Upload(String),
}

/// External object store reached via upload/URL-return calls.
///
/// Synchronous like the message store so the driver stays a pure
/// state machine; a cloud-backed implementation would block on or
/// bridge to its own async client.
pub trait ObjectStore: Clone + Send + Sync + 'static {
    /// Upload a base64 data URI; returns the stored object's URL.
    fn upload(&self, data_uri: &str) -> Result<String, MediaError>;
}

/// Decoded data-URI payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// MIME type, e.g. `image/png`.
    pub mime: String,
    /// Decoded image bytes.
    pub bytes: Vec<u8>,
}

/// Parse and decode a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, MediaError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| MediaError::InvalidDataUri("missing data: prefix".to_string()))?;

    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| MediaError::InvalidDataUri("missing ;base64, separator".to_string()))?;

    if mime.is_empty() || !mime.starts_with("image/") {
        return Err(MediaError::InvalidDataUri(format!("unsupported mime type: {mime}")));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| MediaError::InvalidDataUri(format!("bad base64 payload: {e}")))?;

    Ok(DecodedImage { mime: mime.to_string(), bytes })
}

/// In-memory object store.
///
/// Assigns sequential `mem://images/{n}` URLs and keeps the decoded
/// bytes for inspection in tests.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<Mutex<Vec<DecodedImage>>>,
}

impl MemoryObjectStore {
    /// Create a new empty object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for the
    /// in-memory backend.
    #[allow(clippy::expect_used)]
    pub fn object_count(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }
}

impl ObjectStore for MemoryObjectStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn upload(&self, data_uri: &str) -> Result<String, MediaError> {
        let decoded = decode_data_uri(data_uri)?;

        let mut objects = self.inner.lock().expect("mutex poisoned");
        objects.push(decoded);
        Ok(format!("mem://images/{}", objects.len()))
    }
}
