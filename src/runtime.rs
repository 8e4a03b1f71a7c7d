use crate::compile::{ExprCompiler, Planner};
use crate::error::{CompileError, EngineError, EvalError};
use crate::factors::NamedFactor;
use crate::ops::{ElemKernel, FunctionRegistry, GroupKernel, Kernel};
use crate::plan::Node;
use crate::types::{EvalOptions, Panel, Series, Value};
use rayon::prelude::*;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, trace, warn};

/// Evaluates operation trees against one panel.
///
/// Every node yields exactly one value per panel row. Time-series kernels run once per
/// symbol block, cross-sectional kernels once per date group, so no window ever spans
/// two symbols.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    registry: &'a FunctionRegistry,
    panel: &'a Panel,
    opts: &'a EvalOptions,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a FunctionRegistry, panel: &'a Panel, opts: &'a EvalOptions) -> Self {
        Self {
            registry,
            panel,
            opts,
        }
    }

    pub fn evaluate(&self, node: &Node) -> Result<Series, EvalError> {
        Ok(self.eval(node)?.into_owned())
    }

    fn eval(&self, node: &Node) -> Result<Cow<'a, [Value]>, EvalError> {
        match node {
            Node::Literal(value) => Ok(Cow::Owned(vec![
                crate::ops::finite(*value);
                self.panel.len()
            ])),
            Node::ColumnRef(name) => {
                let column = self
                    .panel
                    .column(name)
                    .ok_or_else(|| EvalError::UnknownColumn { name: name.clone() })?;
                Ok(clean_column(column))
            }
            Node::BinaryOp { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Ok(Cow::Owned(
                    lhs.iter()
                        .zip(rhs.iter())
                        .map(|(l, r)| op.apply(*l, *r))
                        .collect(),
                ))
            }
            Node::Call { name, args, params } => self.eval_call(name, args, params),
        }
    }

    fn eval_call(
        &self,
        name: &str,
        args: &[Node],
        params: &[f64],
    ) -> Result<Cow<'a, [Value]>, EvalError> {
        let desc = self
            .registry
            .lookup(name)
            .map_err(|_| EvalError::UnknownFunction {
                name: name.to_string(),
            })?;
        if !desc.arg_spec.accepts(args.len(), params.len()) {
            return Err(EvalError::SeriesCount {
                name: name.to_string(),
                expected: desc.arg_spec.describe(),
                actual: args.len(),
            });
        }

        let evaluated = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let inputs: Vec<&[Value]> = evaluated.iter().map(|c| &**c).collect();

        let mut out = match desc.kernel {
            Kernel::Elem(kernel) => self.run_elem(kernel, &inputs, params),
            Kernel::Ts(kernel) => self.run_ts(kernel, &inputs, params),
            Kernel::Cs(kernel) => self.run_cs(kernel, &inputs, params),
        };
        for slot in &mut out {
            if slot.is_some_and(|v| !v.is_finite()) {
                *slot = None;
            }
        }
        Ok(Cow::Owned(out))
    }

    #[inline]
    fn parallel(&self) -> bool {
        self.opts.parallel_for(self.panel.len())
    }

    fn run_elem(&self, kernel: ElemKernel, inputs: &[&[Value]], params: &[f64]) -> Series {
        let rows = self.panel.len();
        let cell = |buf: &mut Vec<Value>, row: usize| {
            buf.clear();
            buf.extend(inputs.iter().map(|series| series[row]));
            kernel(buf, params)
        };
        if self.parallel() {
            (0..rows)
                .into_par_iter()
                .map_init(|| Vec::with_capacity(inputs.len()), cell)
                .collect()
        } else {
            let mut buf = Vec::with_capacity(inputs.len());
            (0..rows).map(|row| cell(&mut buf, row)).collect()
        }
    }

    fn run_ts(&self, kernel: GroupKernel, inputs: &[&[Value]], params: &[f64]) -> Series {
        let ranges = self.panel.symbol_ranges();
        if self.parallel() {
            let blocks: Vec<Series> = ranges
                .par_iter()
                .map(|range| {
                    let slices: Vec<&[Value]> =
                        inputs.iter().map(|s| &s[range.clone()]).collect();
                    let mut buf = vec![None; range.len()];
                    kernel(&slices, params, &mut buf);
                    buf
                })
                .collect();
            return blocks.concat();
        }
        let mut out = vec![None; self.panel.len()];
        let mut slices: Vec<&[Value]> = Vec::with_capacity(inputs.len());
        for range in ranges {
            slices.clear();
            slices.extend(inputs.iter().map(|s| &s[range.clone()]));
            kernel(&slices, params, &mut out[range.clone()]);
        }
        out
    }

    fn run_cs(&self, kernel: GroupKernel, inputs: &[&[Value]], params: &[f64]) -> Series {
        let run_group = |rows: &[usize]| -> Series {
            let gathered: Vec<Series> = inputs
                .iter()
                .map(|s| rows.iter().map(|&row| s[row]).collect())
                .collect();
            let slices: Vec<&[Value]> = gathered.iter().map(Vec::as_slice).collect();
            let mut buf = vec![None; rows.len()];
            kernel(&slices, params, &mut buf);
            buf
        };
        let groups = self.panel.date_groups();
        let results: Vec<Series> = if self.parallel() {
            groups.par_iter().map(|rows| run_group(rows)).collect()
        } else {
            groups.iter().map(|rows| run_group(rows)).collect()
        };

        let mut out = vec![None; self.panel.len()];
        for (rows, values) in groups.iter().zip(results) {
            for (&row, value) in rows.iter().zip(values) {
                out[row] = value;
            }
        }
        out
    }
}

/// Non-finite cells loaded into a panel count as missing.
fn clean_column(column: &[Value]) -> Cow<'_, [Value]> {
    if column.iter().all(|v| v.map_or(true, f64::is_finite)) {
        Cow::Borrowed(column)
    } else {
        Cow::Owned(
            column
                .iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        )
    }
}

/// Compiles and evaluates expressions over panels.
///
/// Holds a shared read-only registry; cloning the engine is cheap.
#[derive(Debug, Clone)]
pub struct FactorEngine {
    registry: Arc<FunctionRegistry>,
    opts: EvalOptions,
}

impl Default for FactorEngine {
    fn default() -> Self {
        Self::new(FunctionRegistry::global(), EvalOptions::default())
    }
}

impl FactorEngine {
    pub fn new(registry: Arc<FunctionRegistry>, opts: EvalOptions) -> Self {
        Self { registry, opts }
    }

    /// Built-in registry with options read from the environment.
    pub fn from_env() -> Self {
        Self::new(FunctionRegistry::global(), EvalOptions::from_env())
    }

    pub fn with_options(mut self, opts: EvalOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EvalOptions {
        &self.opts
    }

    pub fn compile(&self, expr: &str) -> Result<Node, CompileError> {
        ExprCompiler::new(&self.registry).compile(expr)
    }

    pub fn evaluate_node(&self, panel: &Panel, node: &Node) -> Result<Series, EvalError> {
        Evaluator::new(&self.registry, panel, &self.opts).evaluate(node)
    }

    pub fn evaluate(&self, panel: &Panel, expr: &str) -> Result<Series, EngineError> {
        let node = self.compile(expr).map_err(|source| EngineError::Compile {
            expr: expr.to_string(),
            source,
        })?;
        self.evaluate_node(panel, &node)
            .map_err(|source| EngineError::Eval {
                expr: expr.to_string(),
                source,
            })
    }

    /// Evaluates `fields[i]` into column `names[i]` on a copy of `panel`.
    ///
    /// All expressions are compiled before any is evaluated, and nothing is written unless
    /// every expression succeeds. Duplicate names resolve to the last one listed.
    #[instrument(level = "debug", skip_all, fields(exprs = fields.len(), rows = panel.len()))]
    pub fn calc_expr<S, N>(&self, panel: &Panel, fields: &[S], names: &[N]) -> Result<Panel, EngineError>
    where
        S: AsRef<str>,
        N: AsRef<str>,
    {
        if fields.len() != names.len() {
            return Err(EngineError::ArgumentCount {
                fields: fields.len(),
                names: names.len(),
            });
        }
        let started_at = Instant::now();

        let plans = fields
            .iter()
            .map(|field| {
                let expr = field.as_ref();
                self.compile(expr)
                    .map(|node| (expr, node))
                    .map_err(|source| EngineError::Compile {
                        expr: expr.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (expr, node) in &plans {
            if let Some(missing) = node
                .referenced_columns()
                .into_iter()
                .find(|name| !panel.contains_column(name))
            {
                return Err(EngineError::Eval {
                    expr: expr.to_string(),
                    source: EvalError::UnknownColumn {
                        name: missing.to_string(),
                    },
                });
            }
        }

        let run = |(expr, node): &(&str, Node)| -> Result<Series, EngineError> {
            let started_at = Instant::now();
            let series = self
                .evaluate_node(panel, node)
                .map_err(|source| EngineError::Eval {
                    expr: expr.to_string(),
                    source,
                })?;
            trace!(
                expr = *expr,
                elapsed_us = started_at.elapsed().as_micros() as u64,
                "evaluated expression"
            );
            Ok(series)
        };
        let results: Vec<Series> = if plans.len() > 1 && self.opts.parallel_for(panel.len()) {
            plans
                .par_iter()
                .map(run)
                .collect::<Vec<_>>()
                .into_iter()
                .collect::<Result<_, _>>()?
        } else {
            plans.iter().map(run).collect::<Result<_, _>>()?
        };

        let mut out = panel.clone();
        for (name, series) in names.iter().zip(results) {
            let name = name.as_ref();
            if panel.contains_column(name) {
                warn!(column = name, "overwriting existing panel column");
            }
            out.set_column(name, series)?;
        }
        debug!(
            columns = out.column_names().count(),
            elapsed_us = started_at.elapsed().as_micros() as u64,
            "calc_expr finished"
        );
        Ok(out)
    }

    /// Evaluates one of the predefined factors.
    pub fn execute_factor(&self, panel: &Panel, factor: NamedFactor) -> Result<Series, EngineError> {
        self.evaluate(panel, &factor.expression())
    }
}

/// [`FactorEngine::calc_expr`] with the built-in registry and default options.
pub fn calc_expr<S, N>(panel: &Panel, fields: &[S], names: &[N]) -> Result<Panel, EngineError>
where
    S: AsRef<str>,
    N: AsRef<str>,
{
    FactorEngine::default().calc_expr(panel, fields, names)
}
