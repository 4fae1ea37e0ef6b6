//! Skill indexing: manifest parsing, sources, and the registry snapshot.

pub mod manifest;
pub mod registry;
pub mod source;
