//! In-process face pair.
//!
//! [`MemoryFace::pair`] returns two faces whose outbound packets land in each
//! other's inbox. Used by tests and for exercising client and server in one
//! process without a network.

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use tokio::time::Instant;

use super::{pit::PendingInterestTable, Face, FaceError, Sink, Upcall, UpcallHandler};
use crate::{
    error::PingError,
    name::Name,
    packets::{Data, Interest, Packet},
};

type Queue = Rc<RefCell<VecDeque<Packet>>>;

pub struct MemoryFace {
    inbox: Queue,
    peer: Queue,
    filters: Vec<Name>,
    pit: PendingInterestTable<()>,
    link_up: bool,
    reject_expressions: usize,
}

impl MemoryFace {
    /// Creates two connected faces.
    pub fn pair() -> (MemoryFace, MemoryFace) {
        let a: Queue = Rc::default();
        let b: Queue = Rc::default();
        (MemoryFace::new(a.clone(), b.clone()), MemoryFace::new(b, a))
    }

    fn new(inbox: Queue, peer: Queue) -> Self {
        MemoryFace {
            inbox,
            peer,
            filters: Vec::new(),
            pit: PendingInterestTable::new(),
            link_up: true,
            reject_expressions: 0,
        }
    }

    /// While down, outbound packets are silently lost. Expressed interests
    /// are still tracked and time out.
    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    /// Makes the next `n` calls to `express_interest` fail with
    /// [`FaceError::WouldBlock`].
    pub fn reject_next_expressions(&mut self, n: usize) {
        self.reject_expressions = n;
    }

    fn transmit(&self, packet: Packet) {
        if self.link_up {
            self.peer.borrow_mut().push_back(packet);
        } else {
            log::trace!("link down, dropping {:?}", packet);
        }
    }

    fn dispatch<H: UpcallHandler>(
        &mut self,
        packet: Packet,
        handler: &mut H,
    ) -> Result<(), PingError> {
        match packet {
            Packet::Interest(interest) => {
                if self.filters.iter().any(|f| f.is_prefix_of(&interest.name)) {
                    let verdict = handler.upcall(self, Upcall::Interest { interest: &interest })?;
                    log::trace!("interest {} -> {:?}", interest.name, verdict);
                } else {
                    log::debug!("no filter for interest {}", interest.name);
                }
            }
            Packet::Data(data) => {
                let satisfied = self.pit.satisfy(&data);
                if satisfied.is_empty() {
                    log::debug!("dropping unsolicited data {}", data.name);
                }
                for entry in satisfied {
                    handler.upcall(
                        self,
                        Upcall::Content {
                            interest: &entry.interest,
                            data: &data,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    fn expire<H: UpcallHandler>(&mut self, handler: &mut H) -> Result<usize, PingError> {
        let expired = self.pit.expire(Instant::now());
        for entry in &expired {
            handler.upcall(
                self,
                Upcall::InterestTimedOut {
                    interest: &entry.interest,
                },
            )?;
        }
        Ok(expired.len())
    }
}

impl Sink for MemoryFace {
    fn put(&mut self, data: Data) -> Result<(), FaceError> {
        self.transmit(Packet::Data(data));
        Ok(())
    }
}

impl Face for MemoryFace {
    fn express_interest(&mut self, interest: Interest) -> Result<(), FaceError> {
        if self.reject_expressions > 0 {
            self.reject_expressions -= 1;
            return Err(FaceError::WouldBlock);
        }
        self.pit.insert(interest.clone(), Instant::now(), ());
        self.transmit(Packet::Interest(interest));
        Ok(())
    }

    fn set_interest_filter(&mut self, prefix: &Name) -> Result<(), FaceError> {
        self.filters.push(prefix.clone());
        Ok(())
    }

    fn outstanding(&self) -> usize {
        self.pit.len()
    }

    async fn run<H: UpcallHandler>(
        &mut self,
        timeout: Duration,
        handler: &mut H,
    ) -> Result<(), PingError> {
        let mut delivered = 0;
        loop {
            let next = self.inbox.borrow_mut().pop_front();
            match next {
                Some(packet) => {
                    self.dispatch(packet, handler)?;
                    delivered += 1;
                }
                None => break,
            }
        }
        delivered += self.expire(handler)?;

        if delivered == 0 {
            // Nothing queued: wait out the step, stopping early for the next expiry.
            let deadline = Instant::now() + timeout;
            let wake = self.pit.next_expiry().map_or(deadline, |e| e.min(deadline));
            tokio::time::sleep_until(wake).await;
            self.expire(handler)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::UpcallResult;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        answer: bool,
    }

    impl UpcallHandler for Recorder {
        fn upcall(
            &mut self,
            sink: &mut dyn Sink,
            upcall: Upcall<'_>,
        ) -> Result<UpcallResult, PingError> {
            match upcall {
                Upcall::Content { interest, data } => self
                    .events
                    .push(format!("content {} {}", interest.name, data.name)),
                Upcall::InterestTimedOut { interest } => {
                    self.events.push(format!("timeout {}", interest.name))
                }
                Upcall::Interest { interest } => {
                    self.events.push(format!("interest {}", interest.name));
                    if self.answer {
                        sink.put(Data::new(interest.name.clone(), "ack"))?;
                        return Ok(UpcallResult::InterestConsumed);
                    }
                }
                Upcall::Final => self.events.push("final".to_string()),
            }
            Ok(UpcallResult::Ok)
        }
    }

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_interest_answered_across_pair() {
        let (mut client, mut server) = MemoryFace::pair();
        let mut requester = Recorder::default();
        let mut responder = Recorder {
            answer: true,
            ..Default::default()
        };
        server.set_interest_filter(&name("/a/ping")).unwrap();

        client
            .express_interest(Interest::new(name("/a/ping/1")))
            .unwrap();
        assert_eq!(client.outstanding(), 1);

        server
            .run(Duration::from_millis(10), &mut responder)
            .await
            .unwrap();
        client
            .run(Duration::from_millis(10), &mut requester)
            .await
            .unwrap();

        assert_eq!(responder.events, vec!["interest /a/ping/1"]);
        assert_eq!(requester.events, vec!["content /a/ping/1 /a/ping/1"]);
        assert_eq!(client.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfiltered_interest_is_not_delivered() {
        let (mut client, mut server) = MemoryFace::pair();
        let mut responder = Recorder::default();
        server.set_interest_filter(&name("/other")).unwrap();

        client
            .express_interest(Interest::new(name("/a/ping/1")))
            .unwrap();
        server
            .run(Duration::from_millis(10), &mut responder)
            .await
            .unwrap();
        assert!(responder.events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_interest_times_out_once() {
        let (mut client, _server) = MemoryFace::pair();
        let mut requester = Recorder::default();
        client.set_link_up(false);
        client
            .express_interest(
                Interest::new(name("/a/ping/7")).with_lifetime(Duration::from_millis(50)),
            )
            .unwrap();

        for _ in 0..10 {
            client
                .run(Duration::from_millis(10), &mut requester)
                .await
                .unwrap();
        }
        assert_eq!(requester.events, vec!["timeout /a/ping/7"]);
        assert_eq!(client.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_rejected_expression() {
        let (mut client, _server) = MemoryFace::pair();
        client.reject_next_expressions(1);
        assert!(matches!(
            client.express_interest(Interest::new(name("/a/ping/1"))),
            Err(FaceError::WouldBlock)
        ));
        assert_eq!(client.outstanding(), 0);
        assert!(client
            .express_interest(Interest::new(name("/a/ping/1")))
            .is_ok());
    }

    #[test]
    fn test_close_delivers_final() {
        let (mut client, _server) = MemoryFace::pair();
        let mut requester = Recorder::default();
        client.close(&mut requester).unwrap();
        assert_eq!(requester.events, vec!["final"]);
    }
}
