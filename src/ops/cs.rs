//! Cross-sectional kernels. Each call sees the rows of one date, one per symbol; missing
//! cells are skipped by the statistics and stay missing in the output.

use crate::ops::finite;
use crate::types::Value;

/// `(row, value)` pairs of the present cells.
#[inline]
fn present(input: &[Value]) -> Vec<(usize, f64)> {
    input
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.map(|x| (idx, x)))
        .collect()
}

/// Percentile rank with average ties, in `(0, 1]`.
pub fn cs_rank(inputs: &[&[Value]], _params: &[f64], out: &mut [Value]) {
    out.fill(None);
    let mut pairs = present(inputs[0]);
    if pairs.is_empty() {
        return;
    }
    pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
    let n = pairs.len() as f64;
    let mut start = 0usize;
    while start < pairs.len() {
        let mut end = start + 1;
        while end < pairs.len() && pairs[end].1 == pairs[start].1 {
            end += 1;
        }
        // 1-based ranks start+1..=end share their average.
        let avg_rank = (start + 1 + end) as f64 * 0.5;
        for &(idx, _) in &pairs[start..end] {
            out[idx] = Some(avg_rank / n);
        }
        start = end;
    }
}

/// Population z-score. A degenerate cross-section (one value, or zero spread) maps to 0.
pub fn cs_zscore(inputs: &[&[Value]], _params: &[f64], out: &mut [Value]) {
    out.fill(None);
    let pairs = present(inputs[0]);
    match pairs.len() {
        0 => {}
        1 => out[pairs[0].0] = Some(0.0),
        len => {
            let n = len as f64;
            let mean = pairs.iter().map(|(_, v)| v).sum::<f64>() / n;
            let var = pairs
                .iter()
                .map(|(_, v)| {
                    let d = v - mean;
                    d * d
                })
                .sum::<f64>()
                / n;
            let std = var.sqrt();
            let degenerate = !(std.is_finite() && std > 0.0);
            for &(idx, value) in &pairs {
                out[idx] = if degenerate {
                    Some(0.0)
                } else {
                    finite((value - mean) / std)
                };
            }
        }
    }
}

pub fn cs_demean(inputs: &[&[Value]], _params: &[f64], out: &mut [Value]) {
    out.fill(None);
    let pairs = present(inputs[0]);
    if pairs.is_empty() {
        return;
    }
    let mean = pairs.iter().map(|(_, v)| v).sum::<f64>() / pairs.len() as f64;
    for (idx, value) in pairs {
        out[idx] = finite(value - mean);
    }
}

/// `x / sum(|x|)`; an all-zero cross-section is missing.
pub fn cs_scale(inputs: &[&[Value]], _params: &[f64], out: &mut [Value]) {
    out.fill(None);
    let pairs = present(inputs[0]);
    let gross: f64 = pairs.iter().map(|(_, v)| v.abs()).sum();
    if !(gross.is_finite() && gross > 0.0) {
        return;
    }
    for (idx, value) in pairs {
        out[idx] = finite(value / gross);
    }
}
