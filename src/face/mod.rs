//! Transport contract consumed by the ping client and server.
//!
//! A [`Face`] expresses interests, publishes data and registers interest
//! filters. Nothing is delivered until the owner calls [`Face::run`], a
//! bounded cooperative step that dispatches queued network activity to a
//! single [`UpcallHandler`] as tagged [`Upcall`]s.
//!
//! Implementations:
//! - [`memory::MemoryFace`]: two faces wired together in-process
//! - [`udp::UdpFace`]: bincode datagrams over a tokio UDP socket

pub mod memory;
pub mod pit;
pub mod udp;

use std::time::Duration;

use thiserror::Error;

use crate::{
    error::PingError,
    name::Name,
    packets::{Data, Interest},
};

/// Errors reported by a face.
#[derive(Error, Debug)]
pub enum FaceError {
    /// The face cannot accept the packet right now; the caller may retry.
    #[error("face is not ready to send")]
    WouldBlock,

    /// The operation needs a remote endpoint and the face has none.
    #[error("face is not connected")]
    NotConnected,

    #[error("packet encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the transport is reporting to the handler.
#[derive(Debug)]
pub enum Upcall<'a> {
    /// Data arrived for an interest this face expressed.
    Content {
        interest: &'a Interest,
        data: &'a Data,
    },
    /// An expressed interest's lifetime elapsed without matching data.
    InterestTimedOut { interest: &'a Interest },
    /// An incoming interest matched a registered filter.
    Interest { interest: &'a Interest },
    /// The handler is being released; no further upcalls follow.
    Final,
}

/// Handler verdict returned to the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpcallResult {
    Ok,
    /// The incoming interest was answered and must not be offered elsewhere.
    InterestConsumed,
}

/// Outbound side of a face, handed to handlers so they can answer interests.
pub trait Sink {
    /// Publishes a data packet.
    fn put(&mut self, data: Data) -> Result<(), FaceError>;
}

/// Continuation invoked for every upcall.
pub trait UpcallHandler {
    fn upcall(&mut self, sink: &mut dyn Sink, upcall: Upcall<'_>)
        -> Result<UpcallResult, PingError>;
}

/// A connection to the named-data network.
#[allow(async_fn_in_trait)]
pub trait Face: Sink {
    /// Sends an interest; the outcome is delivered by a later [`Face::run`]
    /// as exactly one `Content` or `InterestTimedOut` upcall.
    fn express_interest(&mut self, interest: Interest) -> Result<(), FaceError>;

    /// Registers a prefix; matching incoming interests are delivered as
    /// `Interest` upcalls.
    fn set_interest_filter(&mut self, prefix: &Name) -> Result<(), FaceError>;

    /// Number of expressed interests still awaiting data or timeout.
    fn outstanding(&self) -> usize;

    /// Processes network activity for at most `timeout`, dispatching upcalls
    /// to `handler`. Handler errors abort the step and are returned.
    async fn run<H: UpcallHandler>(
        &mut self,
        timeout: Duration,
        handler: &mut H,
    ) -> Result<(), PingError>;

    /// Releases `handler` by delivering [`Upcall::Final`].
    fn close<H: UpcallHandler>(&mut self, handler: &mut H) -> Result<(), PingError>
    where
        Self: Sized,
    {
        handler.upcall(self, Upcall::Final).map(|_| ())
    }
}
