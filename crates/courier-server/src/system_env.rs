//! Production Environment implementation using system time and RNG.

use crate::env::Environment;

/// Production environment backed by the system clock and OS RNG.
///
/// The RNG uses getrandom, which provides OS-level cryptographic
/// randomness (/dev/urandom on Linux). Suitable for connection and
/// message identifiers.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional: a server without
/// functioning cryptographic randomness cannot mint unique
/// identifiers, and RNG failure indicates OS-level breakage.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn wall_clock_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)")
            .as_millis() as u64
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot mint unique identifiers");
    }
}
