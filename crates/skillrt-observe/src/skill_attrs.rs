//! Span attribute names for skill runtime instrumentation.
//!
//! Use these when recording into spans declared with the same field names,
//! e.g. `span.record(TOOL_OUTCOME, "ok")`.

/// Session the call belongs to (UUID v7).
pub const SESSION_ID: &str = "skillrt.session.id";

/// Wire name of the tool (`skills.load`, `skills.read`, ...).
pub const TOOL_NAME: &str = "skillrt.tool.name";

/// `ok`, or the failure code returned to the model.
pub const TOOL_OUTCOME: &str = "skillrt.tool.outcome";

/// Outcome value for successful calls.
pub const OUTCOME_OK: &str = "ok";
