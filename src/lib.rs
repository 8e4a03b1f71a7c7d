//! Factor expressions over (symbol, date) panels.
//!
//! An expression such as `cs_rank(ts_mean(close, 20) / close)` is compiled into a [`Node`]
//! tree against a [`FunctionRegistry`] and evaluated into one value per panel row.
//! [`calc_expr`] evaluates a batch of expressions and returns a copy of the panel with the
//! results attached as named columns.

pub mod compile;
mod compile_expr;
pub mod error;
pub mod factors;
pub mod loader;
pub mod ops;
pub mod plan;
pub mod runtime;
pub mod types;

pub use compile::{parse, ExprCompiler, Planner};
pub use error::{CompileError, EngineError, EvalError, PanelError, RegistryError};
pub use factors::NamedFactor;
pub use loader::{MemoryLoader, PanelLoader};
pub use ops::{ArgSpec, Domain, FunctionDescriptor, FunctionRegistry, Kernel, ParamKind, ParamSpec};
pub use plan::{BinaryOp, Node};
pub use runtime::{calc_expr, Evaluator, FactorEngine};
pub use types::{EvalOptions, Panel, PanelBuilder, RowKey, Series, Value};

#[cfg(test)]
mod tests;
