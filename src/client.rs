//! Ping client: periodic probe emission and response correlation.
//!
//! [`PingClient`] owns the pending-request table and the run statistics. The
//! emitter ([`PingClient::fire`]) is driven by a [`Schedule`]; responses and
//! timeouts come back through the [`UpcallHandler`] implementation while the
//! face is being run.

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::{
    error::PingError,
    face::{Face, Sink, Upcall, UpcallHandler, UpcallResult},
    name::{probe_name, Name, PING_COMPONENT},
    packets::{Interest, DEFAULT_INTEREST_LIFETIME},
    pending::PendingTable,
    schedule::Schedule,
    stats::RunStatistics,
    time::rtt_millis,
};

/// Shortest interval allowed between probes.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Bound on a single face step so the loop re-checks its exit conditions promptly.
pub const RUN_STEP: Duration = Duration::from_millis(10);

/// Largest token drawn in random mode (31 bits).
const RANDOM_TOKEN_MAX: u64 = i32::MAX as u64;

/// How probe tokens are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    /// Uniformly random, redrawn on collision with a pending probe.
    Random,
    /// Counting up from the given value.
    Sequential(u64),
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Prefix as given by the user, used in output lines.
    pub display_prefix: String,
    /// Parsed prefix, without the ping component.
    pub prefix: Name,
    pub interval: Duration,
    /// Number of probes to send, `None` for unbounded.
    pub total: Option<u64>,
    pub tokens: TokenMode,
    pub lifetime: Duration,
}

impl ClientSettings {
    pub fn new(display_prefix: impl Into<String>, prefix: Name) -> Self {
        ClientSettings {
            display_prefix: display_prefix.into(),
            prefix,
            interval: Duration::from_secs(1),
            total: None,
            tokens: TokenMode::Random,
            lifetime: DEFAULT_INTEREST_LIFETIME,
        }
    }
}

/// One line of per-probe output.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    Content {
        prefix: String,
        token: u64,
        rtt_ms: f64,
    },
    Timeout {
        prefix: String,
        token: u64,
    },
}

impl fmt::Display for ProbeEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProbeEvent::Content {
                prefix,
                token,
                rtt_ms,
            } => write!(
                f,
                "content from {}: number = {} rtt = {:.3} ms",
                prefix, token, rtt_ms
            ),
            ProbeEvent::Timeout { prefix, token } => {
                write!(f, "timeout from {}: number = {}", prefix, token)
            }
        }
    }
}

/// Why [`run_client`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Budget met and every probe settled.
    Completed,
    /// The cancellation token fired first.
    Interrupted,
}

/// Client session state.
pub struct PingClient {
    settings: ClientSettings,
    /// Prefix with the ping component appended.
    probe_prefix: Name,
    next_token: TokenMode,
    sent: u64,
    received: u64,
    table: PendingTable,
    stats: RunStatistics,
    rng: StdRng,
    echo: bool,
}

impl PingClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Creates a client with a caller-supplied random source.
    pub fn with_rng(settings: ClientSettings, rng: StdRng) -> Self {
        let probe_prefix = settings.prefix.append(PING_COMPONENT);
        PingClient {
            probe_prefix,
            next_token: settings.tokens,
            sent: 0,
            received: 0,
            table: PendingTable::new(),
            stats: RunStatistics::new(settings.display_prefix.clone()),
            rng,
            echo: true,
            settings,
        }
    }

    /// Disables printing of per-probe lines to stdout.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn probe_prefix(&self) -> &Name {
        &self.probe_prefix
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn pending(&self) -> &PendingTable {
        &self.table
    }

    /// True while the configured budget still allows sending.
    pub fn wants_more(&self) -> bool {
        self.settings.total.map_or(true, |total| self.sent < total)
    }

    /// True while the run loop has to keep going.
    pub fn is_active(&self) -> bool {
        self.wants_more() || !self.table.is_empty()
    }

    fn draw_token(&mut self) -> u64 {
        match self.next_token {
            TokenMode::Sequential(n) => n,
            TokenMode::Random => loop {
                let token = self.rng.gen_range(0..=RANDOM_TOKEN_MAX);
                let key = probe_name(&Name::new(), token);
                if !self.table.contains(&key) {
                    break token;
                }
            },
        }
    }

    fn correlation_key(&self, interest: &Interest) -> Name {
        // Names outside our prefix cannot be in the table; the empty key
        // makes the lookup fail as it should.
        interest
            .name
            .suffix_after(&self.probe_prefix)
            .unwrap_or_default()
    }

    /// Emits one probe if the budget allows.
    ///
    /// Returns the delay before the next firing, zero if the face refused the
    /// interest (retry right away without advancing), or `None` once the
    /// budget is met.
    pub fn fire<F: Face>(&mut self, face: &mut F) -> Result<Option<Duration>, PingError> {
        if !self.wants_more() {
            return Ok(None);
        }

        let token = self.draw_token();
        let name = probe_name(&self.probe_prefix, token);
        let key = probe_name(&Name::new(), token);
        self.table.insert(key.clone(), token)?;

        let interest = Interest::new(name).with_lifetime(self.settings.lifetime);
        if let Err(e) = face.express_interest(interest) {
            log::warn!("Failed to express interest for number {}: {}", token, e);
            self.table.remove(&key)?;
            return Ok(Some(Duration::ZERO));
        }

        log::debug!("Sent probe {}/{}", self.probe_prefix, token);
        self.sent += 1;
        self.stats.record_sent();
        if let TokenMode::Sequential(n) = self.next_token {
            self.next_token = TokenMode::Sequential(n.wrapping_add(1));
        }
        Ok(Some(self.settings.interval))
    }

    /// Settles a probe that received data at `now`.
    pub fn on_content(
        &mut self,
        interest: &Interest,
        now: DateTime<Utc>,
    ) -> Result<ProbeEvent, PingError> {
        let key = self.correlation_key(interest);
        let entry = self.table.lookup(&key)?;
        let token = entry.token;
        let rtt_ms = rtt_millis(entry.sent_at, now);

        self.received += 1;
        self.stats.record_received(rtt_ms);
        self.table.remove(&key)?;

        Ok(ProbeEvent::Content {
            prefix: self.settings.display_prefix.clone(),
            token,
            rtt_ms,
        })
    }

    /// Settles a probe whose interest timed out.
    pub fn on_timeout(&mut self, interest: &Interest) -> Result<ProbeEvent, PingError> {
        let key = self.correlation_key(interest);
        let entry = self.table.remove(&key)?;
        Ok(ProbeEvent::Timeout {
            prefix: self.settings.display_prefix.clone(),
            token: entry.token,
        })
    }

    fn emit(&self, event: &ProbeEvent) {
        if self.echo {
            println!("{}", event);
        }
    }
}

impl UpcallHandler for PingClient {
    fn upcall(
        &mut self,
        _sink: &mut dyn Sink,
        upcall: Upcall<'_>,
    ) -> Result<UpcallResult, PingError> {
        let now = Utc::now();
        match upcall {
            Upcall::Content { interest, data } => {
                if data.name != interest.name {
                    log::debug!("Data {} answered interest {}", data.name, interest.name);
                }
                let event = self.on_content(interest, now)?;
                self.emit(&event);
            }
            Upcall::InterestTimedOut { interest } => {
                let event = self.on_timeout(interest)?;
                self.emit(&event);
            }
            Upcall::Final => log::debug!("Client handler released"),
            Upcall::Interest { interest } => {
                log::warn!("Unexpected incoming interest {}", interest.name);
            }
        }
        Ok(UpcallResult::Ok)
    }
}

/// Drives `client` over `face` until every probe is sent and settled, or
/// until `cancel` fires.
///
/// Each iteration runs the emitter if it is due, then one bounded face step.
/// The statistics are left in `client` for the caller to report.
pub async fn run_client<F: Face>(
    client: &mut PingClient,
    face: &mut F,
    cancel: &CancellationToken,
) -> Result<RunOutcome, PingError> {
    let mut schedule = Schedule::new();

    while client.is_active() {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::Interrupted);
        }

        if client.wants_more() {
            let mut fired = Ok(());
            schedule.run(tokio::time::Instant::now(), || match client.fire(face) {
                Ok(next) => next,
                Err(e) => {
                    fired = Err(e);
                    None
                }
            });
            fired?;
        }

        face.run(RUN_STEP, client).await?;
    }

    face.close(client)?;
    Ok(RunOutcome::Completed)
}
