//! Business logic and port trait definitions for skillrt.
//!
//! This crate defines the "ports" (filesystem, hashing, script execution,
//! skill sources) that the infrastructure layer implements, and the runtime
//! components built on top of them. It depends only on `skillrt-types` --
//! never on `skillrt-infra` or any process/disk I/O crate.

pub mod presence;
pub mod prompt;
pub mod service;
pub mod session;
pub mod skill;
pub mod tool;
