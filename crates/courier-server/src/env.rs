//! Environment abstraction for deterministic testing.
//!
//! Decouples driver logic from system resources (wall-clock time,
//! randomness). Tests supply fixed or seeded environments so message
//! identifiers and timestamps are reproducible; production uses
//! [`crate::SystemEnv`].

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee:
///
/// - `wall_clock_ms()` never goes backwards within one execution
/// - `random_bytes()` uses cryptographically secure entropy in
///   production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in Unix milliseconds.
    ///
    /// Used for message creation and modification timestamps.
    fn wall_clock_ms(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for message and connection identifiers.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
