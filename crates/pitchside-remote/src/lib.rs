//! HTTP gateways to the Pitchside backend: link validation and attempt sync.

mod client;

pub mod error;

pub use client::{RemoteClient, RemoteConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
