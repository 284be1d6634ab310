//! Correlation store for in-flight funding requests.
//!
//! Maps the correlation id carried in collection-provider metadata to the
//! borrower who asked for the loan. Each checkout gets its own entry, so any
//! number of funding requests can be in flight at once. An entry serves every
//! instalment of its loan and is removed when the instalment schedule closes,
//! or after the TTL.
//!
//! Borrower addresses outlive their entries: repayments arrive long after the
//! funding window and are only accepted from a borrower seen here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("No borrower associated with correlation id {0}")]
    NotFound(String),
}

#[derive(Debug, Clone)]
struct CorrelationEntry {
    borrower: String,
    created_at: Instant,
}

impl CorrelationEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Thread-safe correlation id -> borrower map with bounded lifetime.
pub struct CorrelationStore {
    entries: DashMap<String, CorrelationEntry>,
    /// Lowercased addresses of every associated borrower
    borrowers: DashSet<String>,
    ttl: Duration,
}

impl CorrelationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            borrowers: DashSet::new(),
            ttl,
        }
    }

    /// Associate a borrower with a correlation id. Re-associating overwrites.
    pub fn associate(&self, correlation_id: &str, borrower: &str) {
        self.entries.insert(
            correlation_id.to_string(),
            CorrelationEntry {
                borrower: borrower.to_string(),
                created_at: Instant::now(),
            },
        );
        self.borrowers.insert(borrower.to_ascii_lowercase());
        debug!(correlation_id = correlation_id, borrower = borrower, "Correlation associated");
    }

    /// Borrower for a live correlation id. Expired entries are dropped on read.
    pub fn resolve(&self, correlation_id: &str) -> Result<String, CorrelationError> {
        if let Some(entry) = self.entries.get(correlation_id)
            && !entry.is_expired(self.ttl)
        {
            return Ok(entry.borrower.clone());
        }
        let ttl = self.ttl;
        self.entries
            .remove_if(correlation_id, |_, entry| entry.is_expired(ttl));
        Err(CorrelationError::NotFound(correlation_id.to_string()))
    }

    /// Evict an entry once no further funding can arrive for it.
    pub fn complete(&self, correlation_id: &str) -> Option<String> {
        self.entries
            .remove(correlation_id)
            .map(|(_, entry)| entry.borrower)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
        before.saturating_sub(self.entries.len())
    }

    /// Whether `address` ever opened a funding request (case-insensitive).
    pub fn is_known_borrower(&self, address: &str) -> bool {
        self.borrowers.contains(&address.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Background task running `evict_expired` every `interval`.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.evict_expired();
                if evicted > 0 {
                    info!(evicted = evicted, remaining = self.len(), "Expired correlations evicted");
                }
            }
        })
    }
}
