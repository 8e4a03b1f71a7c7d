use crate::error::RegistryError;
use crate::ops::{cs, elem, ts, ArgSpec, Domain, ElemKernel, GroupKernel, Kernel, ParamSpec};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A callable primitive: name, call signature and tagged kernel.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDescriptor {
    pub name: &'static str,
    pub arg_spec: ArgSpec,
    pub kernel: Kernel,
}

impl FunctionDescriptor {
    pub const fn new(name: &'static str, arg_spec: ArgSpec, kernel: Kernel) -> Self {
        Self {
            name,
            arg_spec,
            kernel,
        }
    }

    #[inline]
    pub const fn domain(&self) -> Domain {
        self.kernel.domain()
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidDescriptor {
            name: self.name.to_string(),
            reason: reason.to_string(),
        };
        let mut chars = self.name.chars();
        let lexable = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !lexable {
            return Err(invalid("name is not a valid identifier"));
        }
        let spec = self.arg_spec;
        if spec.min_series == 0 {
            return Err(invalid("at least one series argument is required"));
        }
        if spec.min_series > spec.max_series {
            return Err(invalid("min_series exceeds max_series"));
        }
        if self.domain() != Domain::Elem && spec.min_series != spec.max_series {
            return Err(invalid("group kernels take a fixed number of series"));
        }
        Ok(())
    }
}

const FILL_PARAMS: &[ParamSpec] = &[ParamSpec::number("value")];
// Shortest windows on which each statistic is defined.
const WINDOW_2: &[ParamSpec] = &[ParamSpec::window(2)];
const WINDOW_3: &[ParamSpec] = &[ParamSpec::window(3)];
const WINDOW_4: &[ParamSpec] = &[ParamSpec::window(4)];

const fn ts_window(name: &'static str, kernel: GroupKernel) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::series_window(1), Kernel::Ts(kernel))
}

const fn ts_window_min(
    name: &'static str,
    params: &'static [ParamSpec],
    kernel: GroupKernel,
) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::new(1, 1, params), Kernel::Ts(kernel))
}

const fn ts_pair_window(name: &'static str, kernel: GroupKernel) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::new(2, 2, WINDOW_2), Kernel::Ts(kernel))
}

const fn ts_lag(name: &'static str, kernel: GroupKernel) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::series_lag(1), Kernel::Ts(kernel))
}

const fn cs_unary(name: &'static str, kernel: GroupKernel) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::series(1), Kernel::Cs(kernel))
}

const fn elem_unary(name: &'static str, kernel: ElemKernel) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::series(1), Kernel::Elem(kernel))
}

const fn elem_binary(name: &'static str, kernel: ElemKernel) -> FunctionDescriptor {
    FunctionDescriptor::new(name, ArgSpec::series(2), Kernel::Elem(kernel))
}

/// Built-in catalog. Aliases are plain entries sharing a kernel.
pub const BUILTINS: &[FunctionDescriptor] = &[
    ts_window_min("ts_mean", WINDOW_2, ts::ts_mean),
    ts_window_min("ma", WINDOW_2, ts::ts_ma),
    ts_window("ts_sum", ts::ts_sum),
    ts_window_min("ts_std", WINDOW_2, ts::ts_std),
    ts_window_min("ts_var", WINDOW_2, ts::ts_var),
    ts_window("ts_max", ts::ts_max),
    ts_window("ts_min", ts::ts_min),
    ts_window_min("ts_median", WINDOW_2, ts::ts_median),
    ts_window("ts_product", ts::ts_product),
    ts_window_min("ts_rank", WINDOW_2, ts::ts_rank),
    ts_window("ts_argmax", ts::ts_argmax),
    ts_window("ts_argmin", ts::ts_argmin),
    ts_window("ts_argmaxmin", ts::ts_argmaxmin),
    ts_window_min("ts_skew", WINDOW_3, ts::ts_skew),
    ts_window_min("ts_kurt", WINDOW_4, ts::ts_kurt),
    ts_window_min("ts_zscore", WINDOW_2, ts::ts_zscore),
    ts_window_min("ts_scale", WINDOW_2, ts::ts_zscore),
    ts_window("ts_maxmin", ts::ts_maxmin),
    ts_window("ts_decay_linear", ts::ts_decay_linear),
    ts_lag("ts_delay", ts::ts_delay),
    ts_lag("ts_lag", ts::ts_delay),
    ts_lag("ts_delta", ts::ts_delta),
    ts_lag("ts_pct_change", ts::ts_pct_change),
    ts_pair_window("ts_corr", ts::ts_corr),
    ts_pair_window("ts_correlation", ts::ts_corr),
    ts_pair_window("ts_cov", ts::ts_cov),
    ts_pair_window("ts_covariance", ts::ts_cov),
    cs_unary("cs_rank", cs::cs_rank),
    cs_unary("rank", cs::cs_rank),
    cs_unary("cs_zscore", cs::cs_zscore),
    cs_unary("cs_demean", cs::cs_demean),
    cs_unary("cs_scale", cs::cs_scale),
    elem_unary("abs", elem::elem_abs),
    elem_unary("log", elem::elem_log),
    elem_unary("sqrt", elem::elem_sqrt),
    elem_unary("exp", elem::elem_exp),
    elem_unary("sign", elem::elem_sign),
    elem_binary("power", elem::elem_power),
    elem_binary("max", elem::elem_max),
    elem_binary("min", elem::elem_min),
    FunctionDescriptor::new(
        "fill_missing",
        ArgSpec::new(1, 1, FILL_PARAMS),
        Kernel::Elem(elem::elem_fill_missing),
    ),
];

/// Name -> descriptor map. Populated up front, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    by_name: HashMap<&'static str, FunctionDescriptor>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<FunctionRegistry>> = OnceLock::new();

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every entry of [`BUILTINS`].
    ///
    /// # Panics
    /// If the built-in table itself is inconsistent.
    pub fn builtin() -> Self {
        let mut registry = Self {
            by_name: HashMap::with_capacity(BUILTINS.len()),
        };
        for desc in BUILTINS {
            if let Err(err) = registry.register(*desc) {
                panic!("invalid built-in function table: {err}");
            }
        }
        registry
    }

    /// Process-wide built-in registry, built on first use.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(Self::builtin())))
    }

    pub fn register(&mut self, desc: FunctionDescriptor) -> Result<(), RegistryError> {
        desc.validate()?;
        if self.by_name.contains_key(desc.name) {
            return Err(RegistryError::DuplicateFunction {
                name: desc.name.to_string(),
            });
        }
        self.by_name.insert(desc.name, desc);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&FunctionDescriptor, RegistryError> {
        self.by_name
            .get(name)
            .ok_or_else(|| RegistryError::UnknownFunction {
                name: name.to_string(),
            })
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ParamKind;
    use crate::types::Value;

    fn noop_group(_inputs: &[&[Value]], _params: &[f64], out: &mut [Value]) {
        out.fill(None);
    }

    #[test]
    fn builtin_registry_covers_catalog() {
        let registry = FunctionRegistry::builtin();
        assert_eq!(registry.len(), BUILTINS.len());
        for name in ["ts_mean", "ts_corr", "cs_rank", "rank", "abs", "fill_missing"] {
            assert!(registry.contains(name), "{name}");
        }
        assert_eq!(registry.lookup("ts_lag").map(|d| d.domain()), Ok(Domain::Ts));
        assert_eq!(registry.lookup("rank").map(|d| d.domain()), Ok(Domain::Cs));
        assert_eq!(registry.lookup("sign").map(|d| d.domain()), Ok(Domain::Elem));
    }

    #[test]
    fn statistics_declare_their_shortest_window() {
        let registry = FunctionRegistry::builtin();
        let min_window = |name: &str| match registry.lookup(name).map(|d| d.arg_spec.params) {
            Ok([ParamSpec {
                kind: ParamKind::Window { min },
                ..
            }]) => *min,
            other => panic!("{name}: {other:?}"),
        };
        for name in ["ts_sum", "ts_max", "ts_argmax", "ts_argmaxmin", "ts_product"] {
            assert_eq!(min_window(name), 1, "{name}");
        }
        for name in ["ts_mean", "ma", "ts_std", "ts_median", "ts_rank", "ts_corr"] {
            assert_eq!(min_window(name), 2, "{name}");
        }
        assert_eq!(min_window("ts_skew"), 3);
        assert_eq!(min_window("ts_kurt"), 4);
    }

    #[test]
    fn names_are_sorted_and_unique() {
        let names = FunctionRegistry::builtin().names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = FunctionRegistry::builtin();
        let err = registry
            .register(ts_window("ts_mean", noop_group))
            .expect_err("duplicate");
        assert_eq!(
            err,
            RegistryError::DuplicateFunction {
                name: "ts_mean".to_string()
            }
        );
    }

    #[test]
    fn custom_function_can_be_registered() {
        let mut registry = FunctionRegistry::empty();
        assert!(registry.is_empty());
        registry
            .register(ts_window("my.smooth", noop_group))
            .expect("register custom");
        assert!(registry.contains("my.smooth"));
        assert!(matches!(
            registry.lookup("nope"),
            Err(RegistryError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn inconsistent_descriptors_are_rejected() {
        let mut registry = FunctionRegistry::empty();
        for desc in [
            FunctionDescriptor::new("zero_series", ArgSpec::series(0), Kernel::Cs(noop_group)),
            FunctionDescriptor::new("bad name", ArgSpec::series(1), Kernel::Cs(noop_group)),
            FunctionDescriptor::new("ranged_ts", ArgSpec::new(1, 2, &[]), Kernel::Ts(noop_group)),
            FunctionDescriptor::new("inverted", ArgSpec::new(2, 1, &[]), Kernel::Cs(noop_group)),
        ] {
            assert!(matches!(
                registry.register(desc),
                Err(RegistryError::InvalidDescriptor { .. })
            ));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn global_registry_is_shared() {
        let a = FunctionRegistry::global();
        let b = FunctionRegistry::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
