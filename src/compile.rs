use crate::compile_expr::{parse_expression, ExprAst};
use crate::error::CompileError;
use crate::ops::FunctionRegistry;
use crate::plan::{BinaryOp, Node};
use tracing::trace;

/// Turns an expression string into an operation tree.
pub trait Planner {
    fn compile(&self, expr: &str) -> Result<Node, CompileError>;
}

/// Resolves calls against a [`FunctionRegistry`] while lowering the syntax tree.
///
/// Function names are checked eagerly; column names are left to evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ExprCompiler<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> ExprCompiler<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }
}

impl Planner for ExprCompiler<'_> {
    fn compile(&self, expr: &str) -> Result<Node, CompileError> {
        let ast = parse_expression(expr)?;
        let node = LowerCtx {
            expr,
            registry: self.registry,
        }
        .lower(ast)?;
        trace!(expr, plan = %node, "compiled expression");
        Ok(node)
    }
}

/// Parses `expr` against the built-in registry.
pub fn parse(expr: &str) -> Result<Node, CompileError> {
    let registry = FunctionRegistry::global();
    ExprCompiler::new(&registry).compile(expr)
}

struct LowerCtx<'a> {
    expr: &'a str,
    registry: &'a FunctionRegistry,
}

impl LowerCtx<'_> {
    fn lower(&self, ast: ExprAst) -> Result<Node, CompileError> {
        match ast {
            ExprAst::Number(value) => Ok(Node::Literal(value)),
            ExprAst::Identifier(name) => {
                if self.registry.contains(&name) {
                    return Err(CompileError::Syntax {
                        expr: self.expr.to_string(),
                        reason: format!("function `{name}` used without a call"),
                    });
                }
                Ok(Node::ColumnRef(name))
            }
            ExprAst::Neg(inner) => Ok(Node::binary(
                BinaryOp::Mul,
                Node::Literal(-1.0),
                self.lower(*inner)?,
            )),
            ExprAst::Binary { op, lhs, rhs } => {
                Ok(Node::binary(op, self.lower(*lhs)?, self.lower(*rhs)?))
            }
            ExprAst::Call { name, args } => self.lower_call(name, args),
        }
    }

    fn lower_call(&self, name: String, args: Vec<ExprAst>) -> Result<Node, CompileError> {
        let desc = self
            .registry
            .lookup(&name)
            .map_err(|_| CompileError::UnknownFunction { name: name.clone() })?;
        let spec = desc.arg_spec;
        let series_count = spec.split(&name, args.len())?;

        let mut args = args.into_iter();
        let series = args
            .by_ref()
            .take(series_count)
            .map(|arg| self.lower(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let mut params = Vec::with_capacity(spec.params.len());
        for (param_spec, arg) in spec.params.iter().zip(args) {
            let ExprAst::Number(value) = arg else {
                return Err(CompileError::Arity {
                    name,
                    expected: spec.describe(),
                    actual: format!("a series expression for `{}`", param_spec.name),
                });
            };
            params.push(param_spec.validate(&name, value)?);
        }
        Ok(Node::call(name, series, params))
    }
}
