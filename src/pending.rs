//! Pending Request Table: in-flight probes keyed by their name suffix.
//!
//! The key is the part of the probe name after the configured prefix
//! (normally just the token component). Tokens are canonical decimal, so
//! distinct probes never share a key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::name::Name;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A probe with this suffix is already in flight.
    #[error("duplicate pending request {0}")]
    DuplicateKey(Name),

    /// No probe with this suffix is in flight.
    #[error("no pending request {0}")]
    NotFound(Name),
}

/// A probe that was expressed and is awaiting data or timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub token: u64,
    /// Wall-clock time the probe was handed to the transport.
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<Name, PendingRequest>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a probe sent now.
    pub fn insert(&mut self, key: Name, token: u64) -> Result<&PendingRequest, TableError> {
        self.insert_at(key, token, Utc::now())
    }

    /// Records a probe sent at `sent_at`. Fails if `key` is already pending.
    pub fn insert_at(
        &mut self,
        key: Name,
        token: u64,
        sent_at: DateTime<Utc>,
    ) -> Result<&PendingRequest, TableError> {
        use std::collections::hash_map::Entry;

        match self.entries.entry(key) {
            Entry::Occupied(e) => Err(TableError::DuplicateKey(e.key().clone())),
            Entry::Vacant(e) => Ok(&*e.insert(PendingRequest { token, sent_at })),
        }
    }

    pub fn lookup(&self, key: &Name) -> Result<&PendingRequest, TableError> {
        self.entries
            .get(key)
            .ok_or_else(|| TableError::NotFound(key.clone()))
    }

    pub fn remove(&mut self, key: &Name) -> Result<PendingRequest, TableError> {
        self.entries
            .remove(key)
            .ok_or_else(|| TableError::NotFound(key.clone()))
    }

    pub fn contains(&self, key: &Name) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
