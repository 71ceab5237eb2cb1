//! Core of the SPINE heartbeat stack
//!
//! This crate provides the protocol model, the transport port, the
//! heartbeat liveness sender, and the configuration and logging used by
//! the other SPINE crates.

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod logging;
pub mod model;
pub mod transport;

pub use error::{Error, Result};
