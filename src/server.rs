//! Ping server: validates probe interests and answers them.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    error::PingError,
    face::{Face, FaceError, Sink, Upcall, UpcallHandler, UpcallResult},
    name::{Name, PING_COMPONENT},
    packets::{Data, Interest},
};

/// Payload of every ping response.
pub const PING_ACK: &str = "ping ack";

/// Default freshness attached to responses, in seconds.
pub const DEFAULT_FRESHNESS: u32 = 1;

const SERVER_STEP: Duration = Duration::from_millis(100);

/// Checks whether `name` is a probe for `prefix`.
///
/// `prefix` already ends with the ping component. Accepted shapes are
/// `<prefix>/<token>` and `<prefix>/<id>/<token>`, where the token is a
/// non-negative decimal integer and nothing else.
pub fn is_valid_probe(prefix: &Name, name: &Name) -> bool {
    let depth = name.len();
    if depth != prefix.len() + 1 && depth != prefix.len() + 2 {
        return false;
    }
    if !prefix.is_prefix_of(name) {
        return false;
    }
    name.last().and_then(|c| c.to_token()).is_some()
}

/// Builds the response for a probe interest: same name, fixed payload.
pub fn construct_response(interest: &Interest, freshness: Option<u32>) -> Data {
    let data = Data::new(interest.name.clone(), PING_ACK);
    match freshness {
        Some(seconds) => data.with_freshness(seconds),
        None => data,
    }
}

/// Server state.
#[derive(Debug)]
pub struct PingServer {
    /// Registered prefix, ping component included.
    prefix: Name,
    freshness: Option<u32>,
    answered: u64,
}

impl PingServer {
    /// Creates a server for `prefix` (without the ping component).
    pub fn new(prefix: &Name, freshness: Option<u32>) -> Self {
        PingServer {
            prefix: prefix.append(PING_COMPONENT),
            freshness,
            answered: 0,
        }
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Number of probes answered so far.
    pub fn answered(&self) -> u64 {
        self.answered
    }

    /// Answers `interest` through `sink`.
    pub fn respond(&mut self, sink: &mut dyn Sink, interest: &Interest) -> Result<(), FaceError> {
        let data = construct_response(interest, self.freshness);
        sink.put(data)?;
        self.answered += 1;
        log::debug!("Answered {} ({} total)", interest.name, self.answered);
        Ok(())
    }
}

impl UpcallHandler for PingServer {
    fn upcall(
        &mut self,
        sink: &mut dyn Sink,
        upcall: Upcall<'_>,
    ) -> Result<UpcallResult, PingError> {
        match upcall {
            Upcall::Interest { interest } => {
                if !is_valid_probe(&self.prefix, &interest.name) {
                    log::debug!("Ignoring malformed probe {}", interest.name);
                    return Ok(UpcallResult::Ok);
                }
                match self.respond(sink, interest) {
                    Ok(()) => Ok(UpcallResult::InterestConsumed),
                    Err(e) => {
                        log::warn!("Failed to answer {}: {}", interest.name, e);
                        Ok(UpcallResult::Ok)
                    }
                }
            }
            Upcall::Final => {
                log::debug!("Server handler released");
                Ok(UpcallResult::Ok)
            }
            Upcall::Content { .. } | Upcall::InterestTimedOut { .. } => Ok(UpcallResult::Ok),
        }
    }
}

/// Registers the server's prefix on `face` and answers probes until `cancel` fires.
pub async fn run_server<F: Face>(
    server: &mut PingServer,
    face: &mut F,
    cancel: &CancellationToken,
) -> Result<(), PingError> {
    face.set_interest_filter(&server.prefix)?;
    log::info!("Serving ping requests under {}", server.prefix);

    while !cancel.is_cancelled() {
        face.run(SERVER_STEP, server).await?;
    }

    face.close(server)?;
    log::info!("Shutting down after answering {} requests", server.answered);
    Ok(())
}
