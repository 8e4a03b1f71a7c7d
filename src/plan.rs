use crate::types::Value;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[inline]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// Missing on either side, division by zero and non-finite results all yield missing.
    #[inline]
    pub fn apply(self, lhs: Value, rhs: Value) -> Value {
        let (lhs, rhs) = (lhs?, rhs?);
        let out = match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => {
                if rhs == 0.0 {
                    return None;
                }
                lhs / rhs
            }
        };
        out.is_finite().then_some(out)
    }
}

/// Operation tree produced by the expression compiler.
///
/// `Call` keeps series-valued arguments (`args`) apart from scalar configuration
/// (`params`, e.g. a window length); the split follows the function's declared signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(f64),
    ColumnRef(String),
    Call {
        name: String,
        args: Vec<Node>,
        params: Vec<f64>,
    },
    BinaryOp {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
}

impl Node {
    pub fn literal(value: f64) -> Self {
        Self::Literal(value)
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::ColumnRef(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>, params: Vec<f64>) -> Self {
        Self::Call {
            name: name.into(),
            args,
            params,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Self {
        Self::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Panel columns the tree reads, deduplicated and sorted.
    pub fn referenced_columns(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::ColumnRef(name) => {
                out.insert(name.as_str());
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
            Self::BinaryOp { lhs, rhs, .. } => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Literal(_) | Self::ColumnRef(_) => 1,
            Self::Call { args, .. } => 1 + args.iter().map(Node::depth).max().unwrap_or(0),
            Self::BinaryOp { lhs, rhs, .. } => 1 + lhs.depth().max(rhs.depth()),
        }
    }
}

/// Canonical form: binary operations fully parenthesised, params after series args.
/// Re-parsing the output yields an equal tree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::ColumnRef(name) => f.write_str(name),
            Self::Call { name, args, params } => {
                write!(f, "{name}(")?;
                let mut first = true;
                for arg in args {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{arg}")?;
                }
                for param in params {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{param}")?;
                }
                f.write_str(")")
            }
            Self::BinaryOp { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_propagates_missing_and_guards_division() {
        assert_eq!(BinaryOp::Add.apply(Some(1.0), Some(2.0)), Some(3.0));
        assert_eq!(BinaryOp::Add.apply(None, Some(2.0)), None);
        assert_eq!(BinaryOp::Mul.apply(Some(2.0), None), None);
        assert_eq!(BinaryOp::Div.apply(Some(1.0), Some(0.0)), None);
        assert_eq!(BinaryOp::Div.apply(Some(1.0), None), None);
        assert_eq!(BinaryOp::Mul.apply(Some(f64::MAX), Some(10.0)), None);
    }

    #[test]
    fn display_is_fully_parenthesised() {
        let node = Node::binary(
            BinaryOp::Add,
            Node::column("a"),
            Node::binary(BinaryOp::Mul, Node::column("b"), Node::literal(2.0)),
        );
        assert_eq!(node.to_string(), "(a + (b * 2))");

        let call = Node::call("ts_corr", vec![Node::column("x"), Node::column("y")], vec![10.0]);
        assert_eq!(call.to_string(), "ts_corr(x, y, 10)");
    }

    #[test]
    fn referenced_columns_are_deduplicated() {
        let node = Node::binary(
            BinaryOp::Sub,
            Node::call("ts_mean", vec![Node::column("close")], vec![5.0]),
            Node::binary(BinaryOp::Div, Node::column("close"), Node::column("open")),
        );
        let cols: Vec<&str> = node.referenced_columns().into_iter().collect();
        assert_eq!(cols, vec!["close", "open"]);
        assert_eq!(node.depth(), 3);
    }
}
