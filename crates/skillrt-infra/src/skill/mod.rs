//! Skill adapters: on-disk sources and script execution.

pub mod fs_source;
pub mod script_runner;

pub use fs_source::FsSkillSource;
pub use script_runner::LocalScriptRunner;
