//! Outstanding interests tracked by a face.
//!
//! Each entry carries the interest, its expiry and a per-face payload (the
//! requesting peer on a server face, nothing on a client face).

use std::time::Duration;

use tokio::time::Instant;

use crate::packets::{Data, Interest};

pub struct PitEntry<T> {
    pub interest: Interest,
    pub expires_at: Instant,
    pub payload: T,
}

pub struct PendingInterestTable<T> {
    entries: Vec<PitEntry<T>>,
}

impl<T> PendingInterestTable<T> {
    pub fn new() -> Self {
        PendingInterestTable {
            entries: Vec::new(),
        }
    }

    /// Records `interest`, expiring one lifetime after `now`.
    pub fn insert(&mut self, interest: Interest, now: Instant, payload: T) {
        let lifetime = interest.lifetime();
        self.push(interest, now + lifetime, payload);
    }

    /// Like [`Self::insert`], but the entry never outlives `max_lifetime`
    /// whatever lifetime the interest asks for.
    pub fn insert_capped(
        &mut self,
        interest: Interest,
        now: Instant,
        payload: T,
        max_lifetime: Duration,
    ) {
        let lifetime = interest.lifetime().min(max_lifetime);
        self.push(interest, now + lifetime, payload);
    }

    fn push(&mut self, interest: Interest, expires_at: Instant, payload: T) {
        self.entries.push(PitEntry {
            interest,
            expires_at,
            payload,
        });
    }

    /// Removes and returns every entry whose interest `data` satisfies.
    pub fn satisfy(&mut self, data: &Data) -> Vec<PitEntry<T>> {
        self.drain_where(|e| data.satisfies(&e.interest))
    }

    /// Removes and returns every entry whose lifetime has elapsed at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<PitEntry<T>> {
        self.drain_where(|e| e.expires_at <= now)
    }

    /// Earliest expiry among the outstanding entries.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.expires_at).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn drain_where(&mut self, mut pred: impl FnMut(&PitEntry<T>) -> bool) -> Vec<PitEntry<T>> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if pred(&entry) {
                taken.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        taken
    }
}

impl<T> Default for PendingInterestTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
