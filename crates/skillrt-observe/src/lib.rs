//! Observability for skillrt: subscriber initialisation and the attribute
//! names recorded on tool-call spans.

pub mod skill_attrs;
pub mod tracing_setup;
