//! Port traits implemented by the infrastructure layer.
//!
//! Runtime components depend on these traits -- never on concrete
//! infrastructure implementations.

pub mod fs;
pub mod hash;
pub mod script;
