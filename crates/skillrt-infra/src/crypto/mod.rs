//! Cryptographic operations for skillrt.
//!
//! - `hash`: SHA-256 digests of skill instruction bodies

pub mod hash;
