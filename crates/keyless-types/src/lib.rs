//! Core types shared across the keyless signing crates
//!
//! This crate holds the vocabulary every other crate speaks: hash functions,
//! key algorithms, wire encodings and the cancellation scope passed to every
//! network-bound call.

pub mod algorithm;
pub mod context;
pub mod encoding;
pub mod error;
pub mod hash;

pub use algorithm::KeyAlgorithm;
pub use context::{CallContext, Cancelled};
pub use encoding::{Base64, Hex};
pub use error::{Error, Result};
pub use hash::{HashFunction, HashOutput};
