//! Infrastructure layer for skillrt.
//!
//! Contains implementations of the port traits defined in `skillrt-core`:
//! the filesystem skill source, the local filesystem reader, the process
//! based script runner, SHA-256 hashing, and the `config.toml` loader.

pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod skill;
