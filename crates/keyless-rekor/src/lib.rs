//! Rekor transparency log client
//!
//! Records the artifact signature and signing certificate as a
//! `hashedrekord` entry and reports where the log put it.

pub mod client;
pub mod entry;
pub mod error;

pub use client::{locator_from_response, RekorClient};
pub use entry::{HashedRekord, LogEntry, LogLocator};
pub use error::{Error, Result};
