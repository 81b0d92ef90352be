#![allow(clippy::must_use_candidate)]

//! Validated-response cache keyed by prompt fingerprint
//!
//! Only answers that cleared the validation score gate are stored, so a
//! cache hit is always safe to serve without re-validation. Entries
//! expire after a fixed TTL and the store evicts in insertion order
//! once full.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Compute the cache fingerprint for a prompt
///
/// The prompt is trimmed and internal whitespace runs are collapsed to
/// a single space before hashing, so cosmetic reformatting still hits.
/// A user id, when present, is folded into the hash so personalized
/// answers never leak across users.
#[must_use]
pub fn fingerprint(prompt: &str, user_id: Option<&str>) -> String {
    let normalized: Vec<&str> = prompt.split_whitespace().collect();

    let mut hasher = Sha256::new();
    hasher.update(normalized.join(" ").as_bytes());
    if let Some(user) = user_id {
        hasher.update([0x1f]);
        hasher.update(user.as_bytes());
    }
    let hash = hasher.finalize();
    format!("{hash:x}")
}

/// A validated answer as stored in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    /// The generated content
    pub content: String,
    /// Provider that produced it
    pub provider: String,
    /// Model that produced it
    pub model: String,
    /// Validation score the content earned on the way in
    pub score: u8,
}

#[derive(Debug)]
struct Entry {
    answer: CachedAnswer,
    inserted_at: Instant,
}

/// Counters describing cache effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries currently stored
    pub entries: usize,
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that fell through to a provider
    pub misses: u64,
}

/// In-process response cache with TTL expiry and insertion-order eviction
///
/// Concurrent lookups go straight to the [`DashMap`]; the eviction-order
/// lock is taken on insert and when a lookup purges an expired entry.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    min_score: u8,
    entries: DashMap<String, Entry>,
    insertion_order: Mutex<VecDeque<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache with the given TTL, capacity, and admission score
    ///
    /// A zero TTL disables the cache: every lookup misses and nothing
    /// is stored.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize, min_score: u8) -> Self {
        Self {
            ttl,
            max_entries,
            min_score,
            entries: DashMap::new(),
            insertion_order: Mutex::new(VecDeque::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a fingerprint, counting the outcome
    ///
    /// An expired entry is removed on the way out and counts as a miss.
    pub fn get(&self, key: &str) -> Option<CachedAnswer> {
        if self.ttl.is_zero() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let hit = self.entries.get(key).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(entry.answer.clone())
            } else {
                None
            }
        });

        match hit {
            Some(answer) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(answer)
            }
            None => {
                // drop the expired entry so it stops occupying a slot
                let expired = self
                    .entries
                    .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
                if expired.is_some() {
                    // keep the eviction queue in step with the map, or a
                    // later re-insert of this key would inherit the
                    // stale slot and be evicted out of turn
                    let mut order = self
                        .insertion_order
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    order.retain(|k| k != key);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an answer if it clears the admission score
    ///
    /// Answers below the admission score are dropped silently, as is
    /// everything when the TTL is zero. Overwriting an existing key
    /// refreshes its content and timestamp but keeps its eviction slot.
    pub fn put(&self, key: String, answer: CachedAnswer) {
        if self.ttl.is_zero() {
            return;
        }
        if answer.score < self.min_score {
            tracing::debug!(score = answer.score, min = self.min_score, "answer below cache admission score");
            return;
        }

        let entry = Entry {
            answer,
            inserted_at: Instant::now(),
        };

        let replaced = self.entries.insert(key.clone(), entry).is_some();
        if replaced {
            return;
        }

        let mut order = self
            .insertion_order
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        order.push_back(key);
        // the queue holds exactly the map's keys in insertion order, so
        // the front is always the oldest live entry
        while self.entries.len() > self.max_entries {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Current effectiveness counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
