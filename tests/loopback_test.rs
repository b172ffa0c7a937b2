//! Integration tests for client-server communication over in-process faces.
//!
//! Client and server run on the same task, joined, with tokio's clock paused
//! so intervals and lifetimes elapse instantly.

use std::time::Duration;

use rand::{rngs::StdRng, SeedableRng};
use tokio_util::sync::CancellationToken;

use ndn_ping::{
    client::{run_client, ClientSettings, PingClient, RunOutcome, TokenMode},
    error::PingError,
    face::{memory::MemoryFace, Face, Sink, Upcall, UpcallHandler, UpcallResult},
    name::Name,
    packets::{Data, Interest},
    server::{run_server, PingServer, PING_ACK},
};

fn name(uri: &str) -> Name {
    Name::from_uri(uri).unwrap()
}

fn settings(total: Option<u64>, tokens: TokenMode) -> ClientSettings {
    let mut s = ClientSettings::new("/a/b", name("/a/b"));
    s.total = total;
    s.tokens = tokens;
    s
}

/// Handler that keeps every upcall it sees.
#[derive(Default)]
struct Recorder {
    data: Vec<Data>,
    timeouts: Vec<Name>,
}

impl UpcallHandler for Recorder {
    fn upcall(
        &mut self,
        _sink: &mut dyn Sink,
        upcall: Upcall<'_>,
    ) -> Result<UpcallResult, PingError> {
        match upcall {
            Upcall::Content { data, .. } => self.data.push(data.clone()),
            Upcall::InterestTimedOut { interest } => self.timeouts.push(interest.name.clone()),
            Upcall::Interest { .. } | Upcall::Final => {}
        }
        Ok(UpcallResult::Ok)
    }
}

/// Runs `client` against a server on the other end of a memory face pair.
async fn ping_pair(
    client: &mut PingClient,
    server: &mut PingServer,
) -> Result<RunOutcome, PingError> {
    let (mut client_face, mut server_face) = MemoryFace::pair();
    let client_cancel = CancellationToken::new();
    let server_cancel = CancellationToken::new();

    let (outcome, served) = tokio::join!(
        async {
            let outcome = run_client(client, &mut client_face, &client_cancel).await;
            server_cancel.cancel();
            outcome
        },
        run_server(server, &mut server_face, &server_cancel),
    );
    served?;
    outcome
}

#[tokio::test(start_paused = true)]
async fn test_sequential_probes_are_all_answered() {
    let mut client = PingClient::new(settings(Some(3), TokenMode::Sequential(5))).quiet();
    let mut server = PingServer::new(&name("/a/b"), Some(4));

    let outcome = ping_pair(&mut client, &mut server).await.unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(client.sent(), 3);
    assert_eq!(client.received(), 3);
    assert!(client.pending().is_empty());
    assert_eq!(server.answered(), 3);

    let report = client.statistics().report();
    assert_eq!(report.sent, 3);
    assert_eq!(report.received, 3);
    assert_eq!(report.summary.as_ref().unwrap().loss_percent, 0.0);
    let rtt = report.rtt.unwrap();
    assert!(rtt.min_ms >= 0.0);
    assert!(rtt.min_ms <= rtt.max_ms);
}

#[tokio::test(start_paused = true)]
async fn test_random_probes_are_answered() {
    let mut s = settings(Some(5), TokenMode::Random);
    s.interval = Duration::from_millis(100);
    let mut client = PingClient::with_rng(s, StdRng::seed_from_u64(42)).quiet();
    let mut server = PingServer::new(&name("/a/b"), None);

    ping_pair(&mut client, &mut server).await.unwrap();

    assert_eq!(client.received(), 5);
    assert_eq!(server.answered(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_budget_stops_emission_with_responses_outstanding() {
    let (mut face, _peer) = MemoryFace::pair();
    face.set_link_up(false);

    let mut s = settings(Some(3), TokenMode::Sequential(5));
    s.lifetime = Duration::from_secs(10);
    let mut client = PingClient::new(s).quiet();

    let outcome = run_client(&mut client, &mut face, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(client.sent(), 3);
    assert_eq!(client.received(), 0);

    let report = client.statistics().report();
    assert_eq!(report.summary.unwrap().loss_percent, 100.0);
    assert!(report.rtt.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_reports_unsettled_probe() {
    let (mut face, _peer) = MemoryFace::pair();
    face.set_link_up(false);

    let mut s = settings(None, TokenMode::Sequential(0));
    s.lifetime = Duration::from_secs(60);
    let mut client = PingClient::new(s).quiet();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = run_client(&mut client, &mut face, &cancel).await.unwrap();

    assert_eq!(outcome, RunOutcome::Interrupted);
    let report = client.statistics().report();
    assert_eq!(report.sent, 1);
    assert_eq!(report.received, 0);
    assert!(report
        .render_text()
        .contains("1 Interests transmitted, 0 Data received, 100.0% packet loss"));
    assert_eq!(client.pending().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_response_echoes_request_name() {
    let (mut requester, mut server_face) = MemoryFace::pair();
    let mut server = PingServer::new(&name("/a/b"), Some(4));
    server_face.set_interest_filter(server.prefix()).unwrap();
    let mut recorder = Recorder::default();

    requester
        .express_interest(Interest::new(name("/a/b/ping/42")))
        .unwrap();
    server_face
        .run(Duration::from_millis(10), &mut server)
        .await
        .unwrap();
    requester
        .run(Duration::from_millis(10), &mut recorder)
        .await
        .unwrap();

    assert_eq!(server.answered(), 1);
    assert_eq!(recorder.data.len(), 1);
    let data = &recorder.data[0];
    assert_eq!(data.name.to_string(), "/a/b/ping/42");
    assert_eq!(data.content, PING_ACK.as_bytes());
    assert_eq!(data.freshness_seconds, Some(4));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_requests_are_not_answered() {
    let (mut requester, mut server_face) = MemoryFace::pair();
    let mut server = PingServer::new(&name("/a/b"), Some(1));
    server_face.set_interest_filter(server.prefix()).unwrap();
    let mut recorder = Recorder::default();

    for uri in [
        "/a/b/ping/-1",
        "/a/b/ping/abc",
        "/a/b/ping/12x",
        "/a/b/ping/x/y/1",
    ] {
        requester
            .express_interest(
                Interest::new(name(uri)).with_lifetime(Duration::from_millis(100)),
            )
            .unwrap();
    }
    requester
        .express_interest(Interest::new(name("/a/b/ping/id/7")))
        .unwrap();

    server_face
        .run(Duration::from_millis(10), &mut server)
        .await
        .unwrap();
    for _ in 0..20 {
        requester
            .run(Duration::from_millis(10), &mut recorder)
            .await
            .unwrap();
    }

    assert_eq!(server.answered(), 1);
    assert_eq!(recorder.data.len(), 1);
    assert_eq!(recorder.data[0].name.to_string(), "/a/b/ping/id/7");
    assert_eq!(recorder.timeouts.len(), 4);
}
