//! Error types for `pitchside-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid puzzle content: {0}")]
  InvalidPuzzle(String),

  #[error("attempt metadata error: {0}")]
  Metadata(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
