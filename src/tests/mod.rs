use crate::compile::{ExprCompiler, Planner};
use crate::error::{CompileError, EngineError, EvalError};
use crate::ops::{ArgSpec, FunctionDescriptor, FunctionRegistry, Kernel};
use crate::plan::{BinaryOp, Node};
use crate::runtime::{Evaluator, FactorEngine};
use crate::types::{EvalOptions, Panel, PanelBuilder, Value};
use std::sync::Arc;


/// Two symbols over five dates; `BBB` misses `close` on date 3 and has no row for date 5.
fn two_symbol_panel() -> Panel {
    PanelBuilder::new(["close", "volume"])
        .row("AAA", 1, [Some(10.0), Some(100.0)])
        .row("AAA", 2, [Some(11.0), Some(110.0)])
        .row("AAA", 3, [Some(12.0), Some(90.0)])
        .row("AAA", 4, [Some(11.5), Some(120.0)])
        .row("AAA", 5, [Some(13.0), Some(130.0)])
        .row("BBB", 1, [Some(50.0), Some(500.0)])
        .row("BBB", 2, [Some(49.0), Some(510.0)])
        .row("BBB", 3, [None, Some(520.0)])
        .row("BBB", 4, [Some(52.0), Some(530.0)])
        .build()
        .expect("fixture panel should build")
}

fn single_symbol_panel(symbol: &str, close: &[Value]) -> Panel {
    let mut builder = PanelBuilder::new(["close"]);
    for (idx, value) in close.iter().enumerate() {
        builder.push_row(symbol, idx as i64 + 1, [*value]);
    }
    builder.build().expect("single symbol panel should build")
}

/// Deterministic multi-symbol panel for parity checks.
fn synthetic_panel(symbols: usize, dates: usize) -> Panel {
    let mut builder = PanelBuilder::new(["close", "volume"]);
    for s in 0..symbols {
        for d in 0..dates {
            let x = (s * 31 + d * 7) as f64;
            let close = 100.0 + (x * 0.37).sin() * 5.0 + d as f64 * 0.1;
            let volume = 1_000.0 + (x * 0.11).cos() * 200.0;
            let close = if (s + d) % 17 == 0 { None } else { Some(close) };
            builder.push_row(format!("S{s:03}"), d as i64, [close, Some(volume)]);
        }
    }
    builder.build().expect("synthetic panel should build")
}

fn eval(panel: &Panel, expr: &str) -> Vec<Value> {
    FactorEngine::default()
        .evaluate(panel, expr)
        .unwrap_or_else(|err| panic!("`{expr}` should evaluate: {err}"))
}

fn approx_eq(lhs: f64, rhs: f64) -> bool {
    (lhs - rhs).abs() <= 1e-9 * (1.0 + lhs.abs().max(rhs.abs()))
}

fn assert_series_close(actual: &[Value], expected: &[Value]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (row, (a, e)) in actual.iter().zip(expected).enumerate() {
        match (a, e) {
            (None, None) => {}
            (Some(a), Some(e)) => assert!(approx_eq(*a, *e), "row {row}: {a} != {e}"),
            _ => panic!("row {row}: {a:?} != {e:?}"),
        }
    }
}

/// Straightforward trailing mean used as a reference.
fn naive_rolling_mean(values: &[Value], window: usize) -> Vec<Value> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let cells = &values[i + 1 - window..=i];
            let mut sum = 0.0;
            for cell in cells {
                sum += (*cell)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}
