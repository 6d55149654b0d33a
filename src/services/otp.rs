//! One-time code generation and the in-process secret store.
//!
//! Codes are keyed by the email they were issued for. A subject has at most
//! one live code: issuing again overwrites. Verification is a single atomic
//! check-and-consume, and expiry is evaluated at read time; the background
//! sweep only bounds memory.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::{rngs::OsRng, Rng};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;

use crate::services::clock::Clock;

pub const CODE_LENGTH: usize = 6;

/// Generate a 6-digit, zero-padded numeric code.
///
/// Draws from the OS CSPRNG over the full 000000..=999999 range, so every
/// code is equally likely and leading zeros are preserved. An entropy-source
/// fault aborts the process.
pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:06}", n)
}

struct OtpEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

/// In-memory store of live one-time codes.
///
/// Safe for concurrent use: `verify` removes the entry under the map's shard
/// write lock, so two racing calls for the same code see exactly one success.
pub struct OtpStore {
    entries: Arc<DashMap<String, OtpEntry>>,
    clock: Arc<dyn Clock>,
    sweeper: Option<JoinHandle<()>>,
}

impl OtpStore {
    /// Create the store and start its eviction sweep. The sweep interval is
    /// independent of any code's TTL and should be coarser than it.
    pub fn new(clock: Arc<dyn Clock>, sweep_interval: Duration) -> Self {
        let entries: Arc<DashMap<String, OtpEntry>> = Arc::new(DashMap::new());

        let sweeper = {
            let entries = Arc::clone(&entries);
            let clock = Arc::clone(&clock);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(sweep_interval);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let now = clock.now();
                    // Concurrent puts can grow the map mid-sweep, so count
                    // inside the retain pass instead of diffing lengths.
                    let mut evicted = 0usize;
                    entries.retain(|_, entry| {
                        let live = entry.expires_at > now;
                        if !live {
                            evicted += 1;
                        }
                        live
                    });
                    if evicted > 0 {
                        tracing::debug!(evicted, "Swept expired verification codes");
                    }
                }
            })
        };

        Self {
            entries,
            clock,
            sweeper: Some(sweeper),
        }
    }

    /// Store a code for `subject`, superseding any previous one.
    pub fn put(&self, subject: &str, code: &str, ttl: chrono::Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries.insert(
            subject.to_string(),
            OtpEntry {
                code: code.to_string(),
                expires_at,
            },
        );
    }

    /// Atomically check and consume the code for `subject`.
    ///
    /// Returns true only when a live entry exists whose code matches
    /// byte-for-byte; the entry is removed as part of the same operation.
    /// A mismatch, a missing entry, or an expired-but-unswept entry all
    /// return false and change nothing.
    pub fn verify(&self, subject: &str, code: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .remove_if(subject, |_, entry| {
                entry.expires_at > now
                    && bool::from(entry.code.as_bytes().ct_eq(code.as_bytes()))
            })
            .is_some()
    }

    /// Stop the eviction sweep. Called on drop as well.
    pub fn close(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

impl Drop for OtpStore {
    fn drop(&mut self) {
        self.close();
    }
}
