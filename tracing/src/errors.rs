//! Error types for slow-path operations
//!
//! The hot path is write-and-forget and never surfaces errors; only flush,
//! dump and sink installation return one of these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
