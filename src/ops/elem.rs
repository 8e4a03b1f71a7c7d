//! Element-wise kernels: one output cell from the same row of each argument.

use crate::ops::finite;
use crate::types::Value;

#[inline]
fn unary(args: &[Value], f: impl FnOnce(f64) -> f64) -> Value {
    finite(f(args[0]?))
}

#[inline]
fn binary(args: &[Value], f: impl FnOnce(f64, f64) -> f64) -> Value {
    finite(f(args[0]?, args[1]?))
}

pub fn elem_abs(args: &[Value], _params: &[f64]) -> Value {
    unary(args, f64::abs)
}

pub fn elem_exp(args: &[Value], _params: &[f64]) -> Value {
    unary(args, f64::exp)
}

/// Natural log; non-positive input is missing.
pub fn elem_log(args: &[Value], _params: &[f64]) -> Value {
    let x = args[0]?;
    if x <= 0.0 {
        return None;
    }
    finite(x.ln())
}

pub fn elem_sqrt(args: &[Value], _params: &[f64]) -> Value {
    let x = args[0]?;
    if x < 0.0 {
        return None;
    }
    finite(x.sqrt())
}

/// `-1`, `0` or `1`.
pub fn elem_sign(args: &[Value], _params: &[f64]) -> Value {
    unary(args, |x| if x == 0.0 { 0.0 } else { x.signum() })
}

pub fn elem_power(args: &[Value], _params: &[f64]) -> Value {
    binary(args, f64::powf)
}

pub fn elem_max(args: &[Value], _params: &[f64]) -> Value {
    binary(args, f64::max)
}

pub fn elem_min(args: &[Value], _params: &[f64]) -> Value {
    binary(args, f64::min)
}

/// Replaces a missing cell with the `value` param.
pub fn elem_fill_missing(args: &[Value], params: &[f64]) -> Value {
    args[0].or_else(|| params.first().copied().and_then(finite))
}
