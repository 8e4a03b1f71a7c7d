//! Function layer entry.
//!
//! Adding a built-in:
//! 1) implement the kernel in `elem.rs` / `ts.rs` / `cs.rs`,
//! 2) add a descriptor to `BUILTINS` in `catalog.rs`,
//! 3) add evaluation tests.
//!
//! Callers can also register their own descriptors on a `FunctionRegistry`.

use crate::types::Value;

/// Per-cell kernel: one value per series argument, then the scalar params.
pub type ElemKernel = fn(args: &[Value], params: &[f64]) -> Value;

/// Group kernel: receives one slice per series argument covering a whole group
/// (one symbol for `Ts`, one date for `Cs`) and fills `out` for the same rows.
pub type GroupKernel = fn(inputs: &[&[Value]], params: &[f64], out: &mut [Value]);

/// Tagged implementation; the tag decides how the evaluator partitions rows.
#[derive(Debug, Clone, Copy)]
pub enum Kernel {
    Elem(ElemKernel),
    Ts(GroupKernel),
    Cs(GroupKernel),
}

impl Kernel {
    #[inline]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Elem(_) => Domain::Elem,
            Self::Ts(_) => Domain::Ts,
            Self::Cs(_) => Domain::Cs,
        }
    }
}

#[inline]
pub(crate) fn finite(value: f64) -> Value {
    value.is_finite().then_some(value)
}

pub mod arg_spec;
pub mod catalog;
pub mod spec;

mod cs;
mod elem;
mod stats;
mod ts;

pub use arg_spec::{ArgSpec, ParamKind, ParamSpec};
pub use catalog::{FunctionDescriptor, FunctionRegistry};
pub use cs::{cs_demean, cs_rank, cs_scale, cs_zscore};
pub use elem::{
    elem_abs, elem_exp, elem_fill_missing, elem_log, elem_max, elem_min, elem_power, elem_sign,
    elem_sqrt,
};
pub use spec::Domain;
pub use ts::{
    ts_argmax, ts_argmin, ts_corr, ts_cov, ts_decay_linear, ts_delay, ts_delta, ts_kurt, ts_max,
    ts_maxmin, ts_mean, ts_median, ts_min, ts_pct_change, ts_product, ts_rank, ts_skew, ts_std,
    ts_sum, ts_var, ts_zscore,
};
