use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("syntax error in `{expr}`: {reason}")]
    Syntax { expr: String, reason: String },
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("function `{name}` expects {expected}, got {actual}")]
    Arity {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("invalid parameter `{param}` for function `{name}`: {reason}")]
    InvalidParam {
        name: String,
        param: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("function `{name}` is already registered")]
    DuplicateFunction { name: String },
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("invalid descriptor for `{name}`: {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("column `{name}` not found in panel")]
    UnknownColumn { name: String },
    #[error("function `{name}` is not registered")]
    UnknownFunction { name: String },
    #[error("function `{name}` received {actual} series, declared {expected}")]
    SeriesCount {
        name: String,
        expected: String,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("panel rows out of order at row {row}: {reason}")]
    Unordered { row: usize, reason: String },
    #[error("column `{column}` has {actual} rows, panel has {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("fields and names differ in length: {fields} fields, {names} names")]
    ArgumentCount { fields: usize, names: usize },
    #[error("failed to compile `{expr}`: {source}")]
    Compile {
        expr: String,
        #[source]
        source: CompileError,
    },
    #[error("failed to evaluate `{expr}`: {source}")]
    Eval {
        expr: String,
        #[source]
        source: EvalError,
    },
    #[error(transparent)]
    Panel(#[from] PanelError),
    #[error("loader failed: {reason}")]
    Load { reason: String },
}
