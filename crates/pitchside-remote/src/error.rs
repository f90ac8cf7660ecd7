//! Error type for `pitchside-remote`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The backend answered with a non-success status.
  #[error("backend returned {0}: {1}")]
  Status(u16, String),

  #[error("invalid base url: {0}")]
  Url(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
