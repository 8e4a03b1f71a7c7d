use crate::error::CompileError;

/// Largest accepted window/lag; keeps the `f64 -> usize` conversion exact.
const MAX_INTEGER_PARAM: f64 = (1u64 << 32) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Integer window length, at least `min` rows.
    Window { min: u32 },
    /// Integer row offset, `>= 1`.
    Lag,
    /// Any finite number.
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const WINDOW: Self = Self::window(1);
    pub const LAG: Self = Self {
        name: "lag",
        kind: ParamKind::Lag,
    };

    /// Window that must span at least `min` rows for the statistic to be defined.
    pub const fn window(min: u32) -> Self {
        Self {
            name: "window",
            kind: ParamKind::Window { min },
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
        }
    }

    pub fn validate(self, func: &str, value: f64) -> Result<f64, CompileError> {
        let min = match self.kind {
            ParamKind::Window { min } => f64::from(min.max(1)),
            ParamKind::Lag => 1.0,
            ParamKind::Number if value.is_finite() => return Ok(value),
            ParamKind::Number => {
                let reason = format!("{} must be finite, got {value}", self.name);
                return Err(self.invalid(func, reason));
            }
        };
        if value.fract() == 0.0 && (min..=MAX_INTEGER_PARAM).contains(&value) {
            return Ok(value);
        }
        Err(self.invalid(
            func,
            format!("{} must be an integer >= {min}, got {value}", self.name),
        ))
    }

    fn invalid(self, func: &str, reason: String) -> CompileError {
        CompileError::InvalidParam {
            name: func.to_string(),
            param: self.name,
            reason,
        }
    }
}

const WINDOW_PARAMS: &[ParamSpec] = &[ParamSpec::WINDOW];
const LAG_PARAMS: &[ParamSpec] = &[ParamSpec::LAG];
const NO_PARAMS: &[ParamSpec] = &[];

/// Call signature: a range of series arguments followed by a fixed list of scalar params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgSpec {
    pub min_series: usize,
    pub max_series: usize,
    pub params: &'static [ParamSpec],
}

impl ArgSpec {
    pub const fn new(min_series: usize, max_series: usize, params: &'static [ParamSpec]) -> Self {
        Self {
            min_series,
            max_series,
            params,
        }
    }

    pub const fn series(count: usize) -> Self {
        Self::new(count, count, NO_PARAMS)
    }

    pub const fn series_window(count: usize) -> Self {
        Self::new(count, count, WINDOW_PARAMS)
    }

    pub const fn series_lag(count: usize) -> Self {
        Self::new(count, count, LAG_PARAMS)
    }

    #[inline]
    pub fn accepts(&self, series: usize, params: usize) -> bool {
        (self.min_series..=self.max_series).contains(&series) && params == self.params.len()
    }

    /// Number of leading series arguments for a call with `total` arguments.
    pub fn split(&self, func: &str, total: usize) -> Result<usize, CompileError> {
        let series = total.checked_sub(self.params.len());
        match series {
            Some(series) if self.accepts(series, self.params.len()) => Ok(series),
            _ => Err(CompileError::Arity {
                name: func.to_string(),
                expected: self.describe(),
                actual: format!("{total} argument(s)"),
            }),
        }
    }

    /// Human-readable signature, e.g. `1 series + window`.
    pub fn describe(&self) -> String {
        let mut out = if self.min_series == self.max_series {
            format!("{} series", self.min_series)
        } else {
            format!("{}..={} series", self.min_series, self.max_series)
        };
        for param in self.params {
            out.push_str(" + ");
            out.push_str(param.name);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_requires_positive_integer() {
        assert_eq!(ParamSpec::WINDOW.validate("ts_mean", 5.0), Ok(5.0));
        for bad in [0.0, -3.0, 2.5, 1e12] {
            let err = ParamSpec::WINDOW
                .validate("ts_mean", bad)
                .expect_err("bad window");
            assert!(matches!(
                err,
                CompileError::InvalidParam { param: "window", .. }
            ));
        }
    }

    #[test]
    fn window_minimum_is_enforced() {
        let spec = ParamSpec::window(3);
        assert_eq!(spec.validate("ts_skew", 3.0), Ok(3.0));
        match spec.validate("ts_skew", 2.0) {
            Err(CompileError::InvalidParam { name, reason, .. }) => {
                assert_eq!(name, "ts_skew");
                assert_eq!(reason, "window must be an integer >= 3, got 2");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn number_params_accept_negative_and_fractional() {
        let spec = ParamSpec::number("value");
        assert_eq!(spec.validate("fill_missing", -0.5), Ok(-0.5));
    }

    #[test]
    fn split_counts_series_before_params() {
        let spec = ArgSpec::series_window(2);
        assert_eq!(spec.split("ts_corr", 3), Ok(2));
        assert!(matches!(
            spec.split("ts_corr", 2),
            Err(CompileError::Arity { .. })
        ));
        assert!(ArgSpec::series_lag(1).split("ts_delay", 0).is_err());
    }

    #[test]
    fn describe_lists_params() {
        assert_eq!(ArgSpec::series_window(2).describe(), "2 series + window");
        assert_eq!(ArgSpec::new(1, 3, NO_PARAMS).describe(), "1..=3 series");
    }
}
