//! Command lines of `ndnping` and `ndnpingserver`.
//!
//! clap's built-in help flag is disabled: `-h`, a missing prefix, or any
//! invalid value prints the tool's usage on stderr and exits with status 1.

use std::{net::SocketAddr, time::Duration};

pub use clap::Parser;
use clap::ArgAction;
use thiserror::Error;

use crate::{
    client::{ClientSettings, TokenMode, MIN_INTERVAL},
    name::Name,
    server::DEFAULT_FRESHNESS,
    stats::OutputFormat,
};

/// Default forwarder / server endpoint.
pub const DEFAULT_PORT: u16 = 6363;

/// Errors found while validating a command line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("help requested")]
    HelpRequested,

    #[error("missing name prefix")]
    MissingPrefix,

    #[error("interval {0} is below the minimum of {min} seconds", min = MIN_INTERVAL.as_secs_f64())]
    IntervalTooSmall(f64),

    #[error("interval {0} is too large")]
    IntervalTooLarge(f64),

    #[error("count must be positive, got {0}")]
    CountNotPositive(i64),

    #[error("starting number must not be negative, got {0}")]
    NegativeStartNumber(i64),

    #[error("interest lifetime must be positive")]
    ZeroLifetime,
}

/// `ndnping` command line.
#[derive(Parser, Debug)]
#[command(name = "ndnping", version, about, long_about = None, disable_help_flag = true)]
pub struct ClientConfiguration {
    /// Name prefix to ping, e.g. ndn:/name/prefix
    pub prefix: Option<String>,
    /// Ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,
    /// Ping interval in seconds
    #[arg(short, long, default_value_t = 1.0)]
    pub interval: f64,
    /// Total number of pings
    #[arg(short, long, allow_negative_numbers = true)]
    pub count: Option<i64>,
    /// Starting number, incremented after each Interest
    #[arg(short = 'n', long = "number", allow_negative_numbers = true)]
    pub start_number: Option<i64>,
    /// Interest lifetime in milliseconds
    #[arg(short, long, default_value_t = 4000)]
    pub lifetime: u64,
    /// Forwarder address
    #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
    pub face: SocketAddr,
    /// Statistics output format
    #[arg(long, value_enum, default_value_t)]
    pub output_format: OutputFormat,
    /// Print this message and exit
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub help: bool,
}

impl ClientConfiguration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.help {
            return Err(ConfigurationError::HelpRequested);
        }
        // Written so NaN fails as well.
        if !(self.interval >= MIN_INTERVAL.as_secs_f64()) {
            return Err(ConfigurationError::IntervalTooSmall(self.interval));
        }
        if Duration::try_from_secs_f64(self.interval).is_err() {
            return Err(ConfigurationError::IntervalTooLarge(self.interval));
        }
        if let Some(count) = self.count {
            if count <= 0 {
                return Err(ConfigurationError::CountNotPositive(count));
            }
        }
        if let Some(n) = self.start_number {
            if n < 0 {
                return Err(ConfigurationError::NegativeStartNumber(n));
            }
        }
        if self.lifetime == 0 {
            return Err(ConfigurationError::ZeroLifetime);
        }
        if self.prefix.is_none() {
            return Err(ConfigurationError::MissingPrefix);
        }
        Ok(())
    }

    /// Builds client settings for an already parsed prefix. Call after [`Self::validate`].
    pub fn settings(&self, prefix: Name) -> ClientSettings {
        let mut settings = ClientSettings::new(self.prefix.clone().unwrap_or_default(), prefix);
        settings.interval = Duration::try_from_secs_f64(self.interval).unwrap_or(MIN_INTERVAL);
        settings.total = self.count.map(|c| c.max(0) as u64);
        settings.tokens = match self.start_number {
            Some(n) => TokenMode::Sequential(n.max(0) as u64),
            None => TokenMode::Random,
        };
        settings.lifetime = Duration::from_millis(self.lifetime);
        settings
    }
}

/// `ndnpingserver` command line.
#[derive(Parser, Debug)]
#[command(name = "ndnpingserver", version, about, long_about = None, disable_help_flag = true)]
pub struct ServerConfiguration {
    /// Name prefix to serve, e.g. ndn:/name/prefix
    pub prefix: Option<String>,
    /// Ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,
    /// FreshnessSeconds attached to responses
    #[arg(
        short = 'x',
        long,
        default_value_t = DEFAULT_FRESHNESS,
        value_parser = clap::value_parser!(u32).range(1..),
        allow_negative_numbers = true
    )]
    pub freshness: u32,
    /// Run in daemon mode
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub daemon: bool,
    /// Local address to listen on
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    pub listen: SocketAddr,
    /// Print this message and exit
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub help: bool,
}

impl ServerConfiguration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.help {
            return Err(ConfigurationError::HelpRequested);
        }
        if self.prefix.is_none() {
            return Err(ConfigurationError::MissingPrefix);
        }
        Ok(())
    }

    pub fn freshness_seconds(&self) -> Option<u32> {
        Some(self.freshness)
    }
}

/// Usage text of `ndnping`.
pub fn client_usage(progname: &str) -> String {
    format!(
        "Usage: {progname} ndn:/name/prefix [options]\n\
         Ping a NDN name prefix using Interests with name ndn:/name/prefix/ping/number.\n\
         The numbers in the Interests are randomly generated unless specified.\n  \
         [-i interval] - set ping interval in seconds (minimum {min:.2} second)\n  \
         [-c count] - set total number of pings\n  \
         [-n number] - set the starting number, the number is incremented by 1 after each Interest\n  \
         [-l lifetime] - set Interest lifetime in milliseconds\n  \
         [--face addr:port] - forwarder to connect to (default 127.0.0.1:{port})\n  \
         [--output-format text|json|csv] - statistics format\n  \
         [-h] - print this message and exit\n",
        min = MIN_INTERVAL.as_secs_f64(),
        port = DEFAULT_PORT,
    )
}

/// Usage text of `ndnpingserver`.
pub fn server_usage(progname: &str) -> String {
    format!(
        "Usage: {progname} ndn:/name/prefix [options]\n\
         Starts a NDN ping server that responds to Interests with name ndn:/name/prefix/ping/number.\n  \
         [-x freshness] - set FreshnessSeconds\n  \
         [-d] - run server in daemon mode\n  \
         [--listen addr:port] - local address (default 0.0.0.0:{port})\n  \
         [-h] - print this message and exit\n",
        port = DEFAULT_PORT,
    )
}
