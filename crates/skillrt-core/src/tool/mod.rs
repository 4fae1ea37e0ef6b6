//! The four model-callable skill tools.

pub mod call;
pub mod dispatcher;
pub mod interpreter;
pub mod path;

pub use call::ToolCall;
pub use dispatcher::{ToolDispatcher, ToolLimits};
pub use interpreter::InterpreterTable;
