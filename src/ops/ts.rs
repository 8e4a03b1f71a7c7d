//! Time-series kernels. Each call sees one symbol's rows in date order; a window of `w`
//! at row `i` covers rows `[i-w+1, i]` and is missing unless all `w` cells are present.

use crate::ops::finite;
use crate::ops::stats::{pct_rank, BivariateMoments, WindowMoments};
use crate::types::Value;

#[inline]
fn int_param(params: &[f64], idx: usize) -> usize {
    debug_assert!(params.len() > idx, "missing integer param {idx}");
    params.get(idx).map(|p| *p as usize).unwrap_or(0)
}

/// Fills `out[i]` with `f(window)` for every full window of present values.
fn rolling<F>(input: &[Value], window: usize, out: &mut [Value], mut f: F)
where
    F: FnMut(&[f64]) -> f64,
{
    debug_assert_eq!(input.len(), out.len());
    if window == 0 || window > input.len() {
        out.fill(None);
        return;
    }
    let mut buf = Vec::with_capacity(window);
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = None;
        if i + 1 < window {
            continue;
        }
        buf.clear();
        buf.extend(input[i + 1 - window..=i].iter().map_while(|v| *v));
        if buf.len() == window {
            *slot = finite(f(&buf));
        }
    }
}

fn rolling_pair<F>(lhs: &[Value], rhs: &[Value], window: usize, out: &mut [Value], mut f: F)
where
    F: FnMut(&[f64], &[f64]) -> f64,
{
    debug_assert_eq!(lhs.len(), out.len());
    debug_assert_eq!(rhs.len(), out.len());
    if window == 0 || window > out.len() {
        out.fill(None);
        return;
    }
    let mut xs = Vec::with_capacity(window);
    let mut ys = Vec::with_capacity(window);
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = None;
        if i + 1 < window {
            continue;
        }
        xs.clear();
        ys.clear();
        for j in i + 1 - window..=i {
            let (Some(x), Some(y)) = (lhs[j], rhs[j]) else {
                break;
            };
            xs.push(x);
            ys.push(y);
        }
        if xs.len() == window {
            *slot = finite(f(&xs, &ys));
        }
    }
}

/// Combines the current value with the one `lag` rows earlier.
fn lagged<F>(input: &[Value], lag: usize, out: &mut [Value], f: F)
where
    F: Fn(f64, f64) -> f64,
{
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = match (i.checked_sub(lag).and_then(|j| input[j]), input[i]) {
            (Some(old), Some(cur)) => finite(f(cur, old)),
            _ => None,
        };
    }
}

pub fn ts_mean(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        WindowMoments::collect(w, 1).mean()
    });
}

/// Moving average over forward-filled values: a missing cell repeats the last present
/// value of the block, so only the leading gap stays missing.
pub fn ts_ma(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    let mut last = None;
    let filled: Vec<Value> = inputs[0]
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect();
    rolling(&filled, int_param(params, 0), out, |w| {
        WindowMoments::collect(w, 1).mean()
    });
}

pub fn ts_sum(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| w.iter().sum());
}

pub fn ts_product(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| w.iter().product());
}

pub fn ts_std(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        WindowMoments::collect(w, 2).std()
    });
}

pub fn ts_var(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        WindowMoments::collect(w, 2).var()
    });
}

pub fn ts_skew(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        WindowMoments::collect(w, 3).skew()
    });
}

pub fn ts_kurt(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        WindowMoments::collect(w, 4).kurt()
    });
}

pub fn ts_max(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    });
}

pub fn ts_min(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        w.iter().copied().fold(f64::INFINITY, f64::min)
    });
}

pub fn ts_median(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    let mut sorted = Vec::new();
    rolling(inputs[0], int_param(params, 0), out, |w| {
        sorted.clear();
        sorted.extend_from_slice(w);
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) * 0.5
        } else {
            sorted[mid]
        }
    });
}

/// Position of the latest value among its window, as a percentile in `(0, 1]`.
pub fn ts_rank(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        pct_rank(w, w[w.len() - 1])
    });
}

/// Index of the first element that beats every earlier one under `better`.
fn arg_best(w: &[f64], better: fn(f64, f64) -> bool) -> f64 {
    let mut best = 0usize;
    for (idx, v) in w.iter().enumerate().skip(1) {
        if better(*v, w[best]) {
            best = idx;
        }
    }
    best as f64
}

/// Offset of the window maximum from the window start (first occurrence wins).
pub fn ts_argmax(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| arg_best(w, |a, b| a > b));
}

pub fn ts_argmin(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| arg_best(w, |a, b| a < b));
}

/// `ts_argmax - ts_argmin` over the same window.
pub fn ts_argmaxmin(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        arg_best(w, |a, b| a > b) - arg_best(w, |a, b| a < b)
    });
}

pub fn ts_zscore(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        let m = WindowMoments::collect(w, 2);
        let std = m.std();
        if std > 0.0 {
            (w[w.len() - 1] - m.mean()) / std
        } else {
            f64::NAN
        }
    });
}

/// `(x - min) / (max - min)` over the window; a flat window is missing.
pub fn ts_maxmin(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        let (lo, hi) = w
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if hi > lo {
            (w[w.len() - 1] - lo) / (hi - lo)
        } else {
            f64::NAN
        }
    });
}

/// Linearly weighted mean, the newest row weighted `window` and the oldest `1`.
pub fn ts_decay_linear(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling(inputs[0], int_param(params, 0), out, |w| {
        let mut weighted_sum = 0.0_f64;
        let mut weight_sum = 0.0_f64;
        for (idx, v) in w.iter().enumerate() {
            let weight = (idx + 1) as f64;
            weighted_sum += weight * v;
            weight_sum += weight;
        }
        weighted_sum / weight_sum
    });
}

pub fn ts_delay(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    let input = inputs[0];
    let lag = int_param(params, 0);
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = i.checked_sub(lag).and_then(|j| input[j]);
    }
}

pub fn ts_delta(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    lagged(inputs[0], int_param(params, 0), out, |cur, old| cur - old);
}

/// `x / x[lag] - 1`; a zero base is missing.
pub fn ts_pct_change(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    lagged(inputs[0], int_param(params, 0), out, |cur, old| {
        if old == 0.0 {
            f64::NAN
        } else {
            cur / old - 1.0
        }
    });
}

pub fn ts_corr(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling_pair(inputs[0], inputs[1], int_param(params, 0), out, |xs, ys| {
        BivariateMoments::collect(xs, ys).corr()
    });
}

pub fn ts_cov(inputs: &[&[Value]], params: &[f64], out: &mut [Value]) {
    rolling_pair(inputs[0], inputs[1], int_param(params, 0), out, |xs, ys| {
        BivariateMoments::collect(xs, ys).cov()
    });
}
