//! Short-lived, single-use storage correlating the two handshake legs.
//!
//! Entries are keyed by an unguessable [`NonceReference`] and hold the
//! [`InitialPayload`] received from Discourse until local login completes.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::{InitialPayload, SsoError};

/// Opaque handle to a pending handshake (random 128-bit UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonceReference(Uuid);

impl NonceReference {
    /// Generate a fresh random reference.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a reference received from a client.
    ///
    /// Anything that is not a UUID is reported as `InvalidReference`, the
    /// same as an unknown reference.
    pub fn parse(s: &str) -> Result<Self, SsoError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| SsoError::InvalidReference)
    }
}

impl fmt::Display for NonceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NonceReference {
    type Err = SsoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Storage for pending handshakes.
///
/// Implementations must make `take_once` atomic: among concurrent callers
/// racing on the same reference, at most one observes the entry.
pub trait NonceStore: Send + Sync {
    /// Store `payload` under `reference` for `ttl`. Overwrites on collision.
    fn put(&self, reference: NonceReference, payload: InitialPayload, ttl: Duration);

    /// Remove and return the entry, or `None` if absent or expired.
    fn take_once(&self, reference: &NonceReference) -> Option<InitialPayload>;

    /// Evict expired entries, returning how many were removed.
    fn purge_expired(&self) -> usize;

    /// Number of entries currently held (including expired, not yet purged).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deadline used when `now + ttl` does not fit in an `Instant` (about 30 years).
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

struct StoredEntry {
    payload: InitialPayload,
    expires_at: Instant,
}

/// In-process nonce store backed by a `DashMap`.
///
/// Expiry is passive on read; call [`NonceStore::purge_expired`]
/// periodically to reclaim memory.
#[derive(Default)]
pub struct MemoryNonceStore {
    entries: DashMap<NonceReference, StoredEntry>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NonceStore for MemoryNonceStore {
    fn put(&self, reference: NonceReference, payload: InitialPayload, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.entries
            .insert(reference, StoredEntry { payload, expires_at });
    }

    fn take_once(&self, reference: &NonceReference) -> Option<InitialPayload> {
        // A single remove decides the winner; an expired entry is dropped
        // on the way out.
        let (_, entry) = self.entries.remove(reference)?;
        if entry.expires_at > Instant::now() {
            Some(entry.payload)
        } else {
            None
        }
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let live = entry.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
