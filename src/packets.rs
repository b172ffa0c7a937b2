//! Interest and Data packet structures.
//!
//! The exact network encoding belongs to the transport; these structures
//! carry the fields the ping tools rely on and are serialized with bincode
//! by the datagram face.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::name::Name;

/// Interest lifetime used when none is configured.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// Largest datagram a face will send or accept.
pub const MAX_PACKET_SIZE: usize = 8800;

/// A request for named data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    /// Lifetime in milliseconds after which the requester gives up.
    pub lifetime_ms: u32,
    /// Random value distinguishing retransmissions from loops.
    pub nonce: u32,
}

impl Interest {
    /// Creates an interest with the default lifetime and a random nonce.
    pub fn new(name: Name) -> Self {
        Interest {
            name,
            lifetime_ms: DEFAULT_INTEREST_LIFETIME.as_millis() as u32,
            nonce: rand::random(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime_ms = lifetime.as_millis().min(u32::MAX as u128) as u32;
        self
    }

    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms as u64)
    }
}

/// A named response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    /// Freshness hint in seconds, if any.
    pub freshness_seconds: Option<u32>,
    pub content: Vec<u8>,
}

impl Data {
    pub fn new(name: Name, content: impl Into<Vec<u8>>) -> Self {
        Data {
            name,
            freshness_seconds: None,
            content: content.into(),
        }
    }

    pub fn with_freshness(mut self, seconds: u32) -> Self {
        self.freshness_seconds = Some(seconds);
        self
    }

    /// Returns true if this Data answers `interest`.
    pub fn satisfies(&self, interest: &Interest) -> bool {
        interest.name.is_prefix_of(&self.name)
    }
}

/// Everything that travels between faces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
}

impl Packet {
    /// Serializes the packet for a datagram.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserializes a packet from a received datagram.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(buf)
    }
}
