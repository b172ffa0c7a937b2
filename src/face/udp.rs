//! Datagram face over a tokio UDP socket.
//!
//! Every datagram holds one bincode-encoded [`Packet`]. A client face is
//! connected to a single forwarder or server address; a server face is bound
//! to a local address and returns each Data to the peers whose interests it
//! satisfies.

use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use tokio::{net::UdpSocket, time::Instant};

use super::{pit::PendingInterestTable, Face, FaceError, Sink, Upcall, UpcallHandler};
use crate::{
    error::PingError,
    name::Name,
    packets::{Data, Interest, Packet, DEFAULT_INTEREST_LIFETIME, MAX_PACKET_SIZE},
};

/// Upper bound on how long a peer's interest is remembered for a reply,
/// whatever lifetime the peer asked for.
pub const IN_RECORD_LIFETIME: Duration = DEFAULT_INTEREST_LIFETIME;

pub struct UdpFace {
    socket: UdpSocket,
    remote: Option<SocketAddr>,
    filters: Vec<Name>,
    /// Interests this face expressed.
    pit: PendingInterestTable<()>,
    /// Interests received from peers, awaiting our data.
    in_records: PendingInterestTable<SocketAddr>,
    recv_buf: Vec<u8>,
}

impl UdpFace {
    /// Opens a face towards `remote` from an ephemeral local port.
    pub async fn connect(remote: SocketAddr) -> Result<Self, FaceError> {
        let unspecified = match remote.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let socket = UdpSocket::bind((unspecified, 0)).await?;
        socket.connect(remote).await?;
        log::info!(
            "Face {} connected to {}",
            socket.local_addr()?,
            remote
        );
        Ok(Self::with_socket(socket, Some(remote)))
    }

    /// Opens a face listening on `local`.
    pub async fn bind(local: SocketAddr) -> Result<Self, FaceError> {
        let socket = UdpSocket::bind(local).await?;
        log::info!("Face listening on {}", socket.local_addr()?);
        Ok(Self::with_socket(socket, None))
    }

    /// Wraps an already bound standard socket. Must be called from within a
    /// tokio runtime.
    pub fn from_std(socket: std::net::UdpSocket) -> Result<Self, FaceError> {
        socket.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket)?;
        Ok(Self::with_socket(socket, None))
    }

    fn with_socket(socket: UdpSocket, remote: Option<SocketAddr>) -> Self {
        UdpFace {
            socket,
            remote,
            filters: Vec::new(),
            pit: PendingInterestTable::new(),
            in_records: PendingInterestTable::new(),
            recv_buf: vec![0u8; MAX_PACKET_SIZE],
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FaceError> {
        Ok(self.socket.local_addr()?)
    }

    fn send(&self, packet: &Packet, target: SocketAddr) -> Result<(), FaceError> {
        let bytes = packet.to_bytes()?;
        let result = if self.remote == Some(target) {
            self.socket.try_send(&bytes)
        } else {
            self.socket.try_send_to(&bytes, target)
        };
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(FaceError::WouldBlock),
            Err(e) => Err(FaceError::Io(e)),
        }
    }

    fn handle_datagram<H: UpcallHandler>(
        &mut self,
        len: usize,
        src: SocketAddr,
        handler: &mut H,
    ) -> Result<(), PingError> {
        let packet = match Packet::from_bytes(&self.recv_buf[..len]) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("Dropping undecodable datagram from {}: {}", src, e);
                return Ok(());
            }
        };

        match packet {
            Packet::Interest(interest) => {
                if !self.filters.iter().any(|f| f.is_prefix_of(&interest.name)) {
                    log::debug!("No filter for interest {} from {}", interest.name, src);
                    return Ok(());
                }
                self.in_records.insert_capped(
                    interest.clone(),
                    Instant::now(),
                    src,
                    IN_RECORD_LIFETIME,
                );
                handler.upcall(self, Upcall::Interest { interest: &interest })?;
            }
            Packet::Data(data) => {
                let satisfied = self.pit.satisfy(&data);
                if satisfied.is_empty() {
                    log::debug!("Dropping unsolicited data {} from {}", data.name, src);
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

    fn expire<H: UpcallHandler>(&mut self, handler: &mut H) -> Result<(), PingError> {
        let now = Instant::now();
        for entry in self.in_records.expire(now) {
            log::trace!("Unanswered interest {} from {}", entry.interest.name, entry.payload);
        }
        for entry in self.pit.expire(now) {
            handler.upcall(
                self,
                Upcall::InterestTimedOut {
                    interest: &entry.interest,
                },
            )?;
        }
        Ok(())
    }
}

impl Sink for UdpFace {
    fn put(&mut self, data: Data) -> Result<(), FaceError> {
        let targets: Vec<SocketAddr> = self
            .in_records
            .satisfy(&data)
            .into_iter()
            .map(|entry| entry.payload)
            .collect();
        if targets.is_empty() {
            log::debug!("No pending interest for data {}, not sent", data.name);
            return Ok(());
        }

        let packet = Packet::Data(data);
        let mut result = Ok(());
        for target in targets {
            if let Err(e) = self.send(&packet, target) {
                log::warn!("Failed to send data to {}: {}", target, e);
                result = Err(e);
            }
        }
        result
    }
}

impl Face for UdpFace {
    fn express_interest(&mut self, interest: Interest) -> Result<(), FaceError> {
        let remote = self.remote.ok_or(FaceError::NotConnected)?;
        self.send(&Packet::Interest(interest.clone()), remote)?;
        self.pit.insert(interest, Instant::now(), ());
        Ok(())
    }

    fn set_interest_filter(&mut self, prefix: &Name) -> Result<(), FaceError> {
        log::info!("Registered interest filter {}", prefix);
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
        let deadline = Instant::now() + timeout;
        let wake = self.pit.next_expiry().map_or(deadline, |e| e.min(deadline));

        let received = tokio::time::timeout_at(wake, self.socket.recv_from(&mut self.recv_buf)).await;
        match received {
            Ok(Ok((len, src))) => {
                self.handle_datagram(len, src, handler)?;
                // Drain whatever else is already queued without waiting.
                loop {
                    match self.socket.try_recv_from(&mut self.recv_buf) {
                        Ok((len, src)) => self.handle_datagram(len, src, handler)?,
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                        Err(e) => {
                            log::warn!("Receive error: {}", e);
                            break;
                        }
                    }
                }
            }
            // ICMP errors from a connected socket surface here; keep running so
            // the affected interests time out.
            Ok(Err(e)) => log::warn!("Receive error: {}", e),
            Err(_) => {}
        }

        self.expire(handler)
    }
}
