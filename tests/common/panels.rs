use factor_expr::{Panel, PanelBuilder, Value};

#[allow(dead_code)]
pub const TOL: f64 = 1e-9;

/// Daily bars for a few symbols with staggered listing dates; the second symbol has a
/// few missing closes.
///
/// Rows are pushed date-major (as a loader reading one file per date would) so the
/// builder has to reorder them.
#[allow(dead_code)]
pub fn ohlcv_panel(symbols: &[&str], dates: i64) -> Panel {
    let mut builder = PanelBuilder::new(["open", "high", "low", "close", "volume"]);
    for date in 0..dates {
        for (s, symbol) in symbols.iter().enumerate() {
            let listed_from = s as i64 * 3;
            if date < listed_from {
                continue;
            }
            let base = 20.0 + s as f64 * 15.0;
            let wave = ((date as f64) * 0.45 + s as f64).sin();
            let close = base + wave * 2.0 + date as f64 * 0.05;
            let open = close - wave * 0.4;
            let high = open.max(close) + 0.3;
            let low = open.min(close) - 0.3;
            let volume = 10_000.0 + ((date * 13 + s as i64 * 7) % 29) as f64 * 150.0;
            let close = if s == 1 && date % 23 == 5 {
                None
            } else {
                Some(close)
            };
            builder.push_row(
                *symbol,
                20_240_101 + date,
                [Some(open), Some(high), Some(low), close, Some(volume)],
            );
        }
    }
    builder.build().expect("ohlcv panel should build")
}

#[allow(dead_code)]
pub fn closes(symbol: &str, values: &[Value]) -> Panel {
    let mut builder = PanelBuilder::new(["close"]);
    for (idx, value) in values.iter().enumerate() {
        builder.push_row(symbol, idx as i64, [*value]);
    }
    builder.build().expect("close panel should build")
}

/// Values of `column` restricted to the rows of `symbol`.
#[allow(dead_code)]
pub fn symbol_slice(panel: &Panel, column: &str, symbol: &str) -> Vec<Value> {
    let values = panel.column(column).expect("column should exist");
    panel
        .keys()
        .iter()
        .zip(values)
        .filter(|(key, _)| key.symbol == symbol)
        .map(|(_, v)| *v)
        .collect()
}

#[allow(dead_code)]
pub fn assert_close(actual: &[Value], expected: &[Value]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (row, (a, e)) in actual.iter().zip(expected).enumerate() {
        match (a, e) {
            (None, None) => {}
            (Some(a), Some(e)) => assert!((a - e).abs() <= TOL, "row {row}: {a} != {e}"),
            _ => panic!("row {row}: {a:?} != {e:?}"),
        }
    }
}
