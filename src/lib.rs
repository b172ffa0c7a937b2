//! ndnping - reachability and round-trip latency probing for named-data networks.
//!
//! This crate provides a client-server pair. The client periodically expresses
//! Interests named `<prefix>/ping/<number>` and correlates each Data or
//! timeout with the Interest that caused it; the server answers every
//! well-formed probe under the prefix it registered.
//!
//! # Usage
//!
//! Run the server:
//! ```bash
//! ndnpingserver ndn:/example/host -x 4
//! ```
//!
//! Ping it:
//! ```bash
//! ndnping ndn:/example/host -c 5 -i 0.5 --face 192.168.1.1:6363
//! ```

/// Probe emission, correlation and the client run loop.
pub mod client;
/// Command-line configuration and validation.
pub mod configuration;
/// Crate-level error type.
pub mod error;
/// Transport abstraction and its implementations.
pub mod face;
/// Names and NDN URI handling.
pub mod name;
/// Interest and Data structures.
pub mod packets;
/// Pending Request Table.
pub mod pending;
/// Interrupt handling and daemon mode.
pub mod process;
/// Periodic task scheduling.
pub mod schedule;
/// Probe validation, response construction and the server run loop.
pub mod server;
/// Run statistics and reports.
pub mod stats;
/// Wall-clock helpers.
pub mod time;
