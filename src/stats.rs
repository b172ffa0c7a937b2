//! Run statistics and the final report.
//!
//! [`RunStatistics`] accumulates counts and RTT moments for the whole run.
//! [`RunStatistics::report`] takes a read-only [`StatsReport`] snapshot that
//! renders as ndnping-style text, JSON or CSV.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::time::elapsed_millis;

/// Output format for statistics reporting.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for machine consumption.
    Json,
    /// CSV output for spreadsheet import.
    Csv,
}

/// Seed for the running minimum; any real RTT is smaller.
const MIN_SENTINEL: f64 = i32::MAX as f64;

/// Aggregate counters for one run.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    prefix: String,
    sent: u64,
    received: u64,
    start: DateTime<Utc>,
    min_ms: f64,
    max_ms: f64,
    sum_ms: f64,
    sum_sq_ms: f64,
}

impl RunStatistics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, Utc::now())
    }

    pub fn starting_at(prefix: impl Into<String>, start: DateTime<Utc>) -> Self {
        RunStatistics {
            prefix: prefix.into(),
            sent: 0,
            received: 0,
            start,
            min_ms: MIN_SENTINEL,
            max_ms: 0.0,
            sum_ms: 0.0,
            sum_sq_ms: 0.0,
        }
    }

    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub fn record_received(&mut self, rtt_ms: f64) {
        self.received += 1;
        self.min_ms = self.min_ms.min(rtt_ms);
        self.max_ms = self.max_ms.max(rtt_ms);
        self.sum_ms += rtt_ms;
        self.sum_sq_ms += rtt_ms * rtt_ms;
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Snapshot of the run as of now.
    pub fn report(&self) -> StatsReport {
        self.report_at(Utc::now())
    }

    pub fn report_at(&self, now: DateTime<Utc>) -> StatsReport {
        let summary = (self.sent > 0).then(|| LossSummary {
            transmitted: self.sent,
            received: self.received,
            loss_percent: self.sent.saturating_sub(self.received) as f64 * 100.0
                / self.sent as f64,
            time_ms: elapsed_millis(self.start, now),
        });

        let rtt = (self.received > 0).then(|| {
            let n = self.received as f64;
            let avg = self.sum_ms / n;
            let variance = self.sum_sq_ms / n - avg * avg;
            RttSummary {
                min_ms: self.min_ms,
                avg_ms: avg,
                max_ms: self.max_ms,
                // Floating-point rounding can push a zero variance slightly negative.
                mdev_ms: variance.max(0.0).sqrt(),
            }
        });

        StatsReport {
            prefix: self.prefix.clone(),
            sent: self.sent,
            received: self.received,
            summary,
            rtt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LossSummary {
    pub transmitted: u64,
    pub received: u64,
    pub loss_percent: f64,
    pub time_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RttSummary {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub mdev_ms: f64,
}

/// Serializable statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub prefix: String,
    pub sent: u64,
    pub received: u64,
    /// Present only when something was sent.
    pub summary: Option<LossSummary>,
    /// Present only when something was received.
    pub rtt: Option<RttSummary>,
}

impl StatsReport {
    /// Prints the report in the given format.
    pub fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Text => print!("{}", self.render_text()),
            OutputFormat::Json => self.print_json(),
            OutputFormat::Csv => print!("{}", self.render_csv()),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("\n--- {} ndnping statistics ---\n", self.prefix);
        if let Some(s) = &self.summary {
            out.push_str(&format!(
                "{} Interests transmitted, {} Data received, {:.1}% packet loss, time {} ms\n",
                s.transmitted, s.received, s.loss_percent, s.time_ms
            ));
        }
        if let Some(r) = &self.rtt {
            out.push_str(&format!(
                "rtt min/avg/max/mdev = {:.3}/{:.3}/{:.3}/{:.3} ms\n",
                r.min_ms, r.avg_ms, r.max_ms, r.mdev_ms
            ));
        }
        out
    }

    pub fn render_csv(&self) -> String {
        let summary = self.summary.as_ref();
        let rtt = self.rtt.as_ref();
        format!(
            "prefix,sent,received,loss_percent,time_ms,min_rtt_ms,avg_rtt_ms,max_rtt_ms,mdev_rtt_ms\n\
             {},{},{},{},{},{},{},{},{}\n",
            self.prefix,
            self.sent,
            self.received,
            summary.map_or_else(String::new, |s| format!("{:.1}", s.loss_percent)),
            summary.map_or_else(String::new, |s| s.time_ms.to_string()),
            fmt_opt(rtt.map(|r| r.min_ms)),
            fmt_opt(rtt.map(|r| r.avg_ms)),
            fmt_opt(rtt.map(|r| r.max_ms)),
            fmt_opt(rtt.map(|r| r.mdev_ms)),
        )
    }

    fn print_json(&self) {
        match serde_json::to_string(self) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize statistics: {}", e),
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(String::new, |x| format!("{:.3}", x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("Invalid timestamp")
    }

    #[test]
    fn test_nothing_sent() {
        let stats = RunStatistics::starting_at("/a/b", start());
        let report = stats.report_at(start());
        assert!(report.summary.is_none());
        assert!(report.rtt.is_none());
        assert_eq!(report.render_text(), "\n--- /a/b ndnping statistics ---\n");
    }

    #[test]
    fn test_sent_without_responses() {
        let mut stats = RunStatistics::starting_at("/a/b", start());
        stats.record_sent();

        let report = stats.report_at(start() + Duration::milliseconds(1500));
        assert_eq!(report.sent, 1);
        assert_eq!(report.received, 0);
        assert!(report.rtt.is_none());
        assert_eq!(
            report.render_text(),
            "\n--- /a/b ndnping statistics ---\n\
             1 Interests transmitted, 0 Data received, 100.0% packet loss, time 1500 ms\n"
        );
    }

    #[test]
    fn test_rtt_moments() {
        let mut stats = RunStatistics::starting_at("/a/b", start());
        for rtt in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.record_sent();
            stats.record_received(rtt);
        }
        stats.record_sent();

        let report = stats.report_at(start() + Duration::seconds(6));
        let s = report.summary.as_ref().unwrap();
        assert!((s.loss_percent - 100.0 / 6.0).abs() < 1e-9);

        let r = report.rtt.as_ref().unwrap();
        assert_eq!(r.min_ms, 1.0);
        assert_eq!(r.max_ms, 5.0);
        assert!((r.avg_ms - 3.0).abs() < 1e-9);
        assert!((r.mdev_ms - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!(r.min_ms <= r.avg_ms && r.avg_ms <= r.max_ms);

        assert!(report
            .render_text()
            .ends_with("6 Interests transmitted, 5 Data received, 16.7% packet loss, time 6000 ms\n\
                        rtt min/avg/max/mdev = 1.000/3.000/5.000/1.414 ms\n"));
    }

    #[test]
    fn test_constant_rtt_has_zero_mdev() {
        let mut stats = RunStatistics::starting_at("/p", start());
        for _ in 0..3 {
            stats.record_sent();
            stats.record_received(0.5);
        }
        let rtt = stats.report_at(start()).rtt.unwrap();
        assert_eq!(rtt.mdev_ms, 0.0);
        assert_eq!(rtt.avg_ms, 0.5);
    }

    #[test]
    fn test_report_is_idempotent() {
        let mut stats = RunStatistics::starting_at("/a/b", start());
        stats.record_sent();
        stats.record_sent();
        stats.record_received(12.5);

        let now = start() + Duration::seconds(2);
        let first = stats.report_at(now);
        let second = stats.report_at(now);
        assert_eq!(first, second);
        assert_eq!(stats.sent(), 2);
        assert_eq!(stats.received(), 1);
    }

    #[test]
    fn test_csv_format() {
        let mut stats = RunStatistics::starting_at("/a/b", start());
        stats.record_sent();
        stats.record_received(2.0);
        let csv = stats.report_at(start()).render_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "/a/b,1,1,0.0,0,2.000,2.000,2.000,0.000");
    }

    #[test]
    fn test_json_format() {
        let stats = RunStatistics::starting_at("/a/b", start());
        let json = serde_json::to_value(stats.report_at(start())).unwrap();
        assert_eq!(json["prefix"], "/a/b");
        assert_eq!(json["sent"], 0);
        assert!(json["rtt"].is_null());
        // Should not panic
        stats.report().print(OutputFormat::Json);
    }
}
