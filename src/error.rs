//! Crate-level error type.

use thiserror::Error;

use crate::{
    configuration::ConfigurationError, face::FaceError, name::NameError, pending::TableError,
};

/// Any failure surfaced by the ping client or server.
#[derive(Error, Debug)]
pub enum PingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("transport failure: {0}")]
    Face(#[from] FaceError),

    /// The correlation table was used against its contract. This indicates a
    /// transport delivering an upcall twice or for a request it never saw.
    #[error("pending request table invariant violated: {0}")]
    Table(#[from] TableError),
}
