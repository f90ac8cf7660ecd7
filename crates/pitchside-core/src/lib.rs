//! Core types and the game session engine for the Pitchside daily puzzles.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! persistence and link-validation backends are reached only through the
//! traits in [`gateway`]; `pitchside-store-sqlite` and `pitchside-remote`
//! provide the concrete implementations.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attempt;
pub mod countdown;
pub mod error;
pub mod gateway;
pub mod matcher;
pub mod puzzle;
pub mod score;
pub mod session;
pub mod sync;

pub use error::{Error, Result};
