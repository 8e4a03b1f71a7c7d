/// Central moments of one full window, accumulated around the window mean.
#[derive(Debug, Clone, Copy)]
pub(super) struct WindowMoments {
    pub(super) n: f64,
    pub(super) mean: f64,
    pub(super) m2: f64,
    pub(super) m3: f64,
    pub(super) m4: f64,
}

impl WindowMoments {
    pub(super) fn collect(values: &[f64], order: u8) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let mut m2 = 0.0;
        let mut m3 = 0.0;
        let mut m4 = 0.0;
        if order >= 2 {
            for &value in values {
                let d = value - mean;
                let sq = d * d;
                m2 += sq;
                if order >= 3 {
                    m3 += sq * d;
                    if order >= 4 {
                        m4 += sq * sq;
                    }
                }
            }
        }
        Self {
            n,
            mean,
            m2,
            m3,
            m4,
        }
    }

    #[inline]
    pub(super) fn mean(self) -> f64 {
        self.mean
    }

    /// Sample variance (ddof = 1).
    #[inline]
    pub(super) fn var(self) -> f64 {
        if self.n <= 1.0 {
            return f64::NAN;
        }
        self.m2 / (self.n - 1.0)
    }

    #[inline]
    pub(super) fn std(self) -> f64 {
        self.var().sqrt()
    }

    pub(super) fn skew(self) -> f64 {
        if self.n <= 2.0 {
            return f64::NAN;
        }
        let std = self.std();
        if !std.is_finite() || std <= 0.0 {
            return f64::NAN;
        }
        let denom = (self.n - 1.0) * (self.n - 2.0) * std.powi(3);
        (self.n * self.m3) / denom
    }

    pub(super) fn kurt(self) -> f64 {
        if self.n <= 3.0 {
            return f64::NAN;
        }
        let std = self.std();
        if !std.is_finite() || std <= 0.0 {
            return f64::NAN;
        }
        let n = self.n;
        let denom = (n - 1.0) * (n - 2.0) * (n - 3.0) * std.powi(4);
        let term1 = (n * (n + 1.0) * self.m4) / denom;
        let term2 = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
        term1 - term2
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) struct BivariateMoments {
    pub(super) n: f64,
    pub(super) sxx: f64,
    pub(super) syy: f64,
    pub(super) sxy: f64,
}

impl BivariateMoments {
    pub(super) fn collect(xs: &[f64], ys: &[f64]) -> Self {
        debug_assert_eq!(xs.len(), ys.len());
        let n = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let mut m = Self {
            n,
            sxx: 0.0,
            syy: 0.0,
            sxy: 0.0,
        };
        for (&x, &y) in xs.iter().zip(ys) {
            let dx = x - mean_x;
            let dy = y - mean_y;
            m.sxx += dx * dx;
            m.syy += dy * dy;
            m.sxy += dx * dy;
        }
        m
    }

    /// Sample covariance (ddof = 1).
    #[inline]
    pub(super) fn cov(self) -> f64 {
        if self.n <= 1.0 {
            return f64::NAN;
        }
        self.sxy / (self.n - 1.0)
    }

    pub(super) fn corr(self) -> f64 {
        if self.n <= 1.0 || self.sxx <= 0.0 || self.syy <= 0.0 {
            return f64::NAN;
        }
        (self.sxy / (self.sxx * self.syy).sqrt()).clamp(-1.0, 1.0)
    }
}

/// Percentile rank of `target` inside `values` with average ties, in `(0, 1]`.
pub(super) fn pct_rank(values: &[f64], target: f64) -> f64 {
    let mut lower = 0usize;
    let mut equal = 0usize;
    for &v in values {
        if v < target {
            lower += 1;
        } else if v == target {
            equal += 1;
        }
    }
    let avg_rank = lower as f64 + (equal as f64 + 1.0) * 0.5;
    avg_rank / values.len() as f64
}
