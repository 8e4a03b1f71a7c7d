use crate::error::PanelError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

/// One panel cell. `None` is the missing-value marker.
pub type Value = Option<f64>;

/// One value per panel row, in panel row order.
pub type Series = Vec<Value>;

const PARALLEL_ENV: &str = "FACTOR_EXPR_PARALLEL";
const DEFAULT_PARALLEL_MIN_ROWS: usize = 16_384;

/// Row identity inside a panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub symbol: String,
    /// Date-like ordinal (e.g. `20240102` or epoch days); only its ordering matters.
    pub date: i64,
}

impl RowKey {
    pub fn new(symbol: impl Into<String>, date: i64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Evaluate independent expressions and per-symbol groups on the rayon pool.
    pub parallel: bool,
    /// Panels smaller than this stay sequential even when `parallel` is set.
    pub parallel_min_rows: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            parallel_min_rows: DEFAULT_PARALLEL_MIN_ROWS,
        }
    }
}

impl EvalOptions {
    /// Defaults, with `FACTOR_EXPR_PARALLEL=1|true|yes|on` switching parallelism on.
    pub fn from_env() -> Self {
        let parallel = std::env::var(PARALLEL_ENV)
            .ok()
            .map(|raw| {
                let v = raw.trim().to_ascii_lowercase();
                matches!(v.as_str(), "1" | "true" | "yes" | "on")
            })
            .unwrap_or(false);
        Self {
            parallel,
            ..Self::default()
        }
    }

    #[inline]
    pub fn parallel_for(&self, rows: usize) -> bool {
        self.parallel && rows >= self.parallel_min_rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PanelLayout {
    /// Contiguous row ranges, one per symbol, in panel order.
    symbol_ranges: Vec<Range<usize>>,
    /// Row indices sharing one date, ordered by date; rows inside a group follow panel order.
    date_groups: Vec<Vec<usize>>,
}

impl PanelLayout {
    fn build(keys: &[RowKey]) -> Result<Self, PanelError> {
        let mut symbol_ranges = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut by_date: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        let mut start = 0usize;

        for (row, key) in keys.iter().enumerate() {
            if row > 0 {
                let prev = &keys[row - 1];
                if prev.symbol == key.symbol {
                    if key.date <= prev.date {
                        return Err(PanelError::Unordered {
                            row,
                            reason: format!(
                                "dates for symbol `{}` are not strictly ascending ({} after {})",
                                key.symbol, key.date, prev.date
                            ),
                        });
                    }
                } else {
                    symbol_ranges.push(start..row);
                    start = row;
                }
            }
            if row == start && !seen.insert(key.symbol.as_str()) {
                return Err(PanelError::Unordered {
                    row,
                    reason: format!("symbol `{}` appears in more than one block", key.symbol),
                });
            }
            by_date.entry(key.date).or_default().push(row);
        }
        if !keys.is_empty() {
            symbol_ranges.push(start..keys.len());
        }

        Ok(Self {
            symbol_ranges,
            date_groups: by_date.into_values().collect(),
        })
    }
}

/// Rows keyed by `(symbol, date)`, grouped by symbol and date-ascending within a symbol,
/// with named numeric columns shared by all symbols.
///
/// Cloning is cheap: keys and column buffers are shared, and replacing a column on a clone
/// never touches the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    keys: Arc<[RowKey]>,
    layout: Arc<PanelLayout>,
    columns: IndexMap<String, Arc<[Value]>>,
}

impl Panel {
    /// Creates a column-less panel. Fails if `keys` break the ordering invariant.
    pub fn new(keys: Vec<RowKey>) -> Result<Self, PanelError> {
        let layout = PanelLayout::build(&keys)?;
        Ok(Self {
            keys: keys.into(),
            layout: Arc::new(layout),
            columns: IndexMap::new(),
        })
    }

    pub fn builder<I, S>(columns: I) -> PanelBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PanelBuilder::new(columns)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(|col| col.as_ref())
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.layout
            .symbol_ranges
            .iter()
            .map(|range| self.keys[range.start].symbol.as_str())
    }

    #[inline]
    pub(crate) fn symbol_ranges(&self) -> &[Range<usize>] {
        &self.layout.symbol_ranges
    }

    #[inline]
    pub(crate) fn date_groups(&self) -> &[Vec<usize>] {
        &self.layout.date_groups
    }

    /// Inserts or replaces a column. A replaced column keeps its position.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        values: impl Into<Arc<[Value]>>,
    ) -> Result<Option<Arc<[Value]>>, PanelError> {
        let name = name.into();
        let values = values.into();
        if values.len() != self.len() {
            return Err(PanelError::ColumnLength {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        Ok(self.columns.insert(name, values))
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: impl Into<Arc<[Value]>>,
    ) -> Result<Self, PanelError> {
        self.set_column(name, values)?;
        Ok(self)
    }

    /// Keeps the rows matching `keep`, preserving order and all columns.
    pub fn filter_rows<F>(&self, mut keep: F) -> Result<Self, PanelError>
    where
        F: FnMut(&RowKey) -> bool,
    {
        let rows: Vec<usize> = (0..self.len()).filter(|&i| keep(&self.keys[i])).collect();
        let keys: Vec<RowKey> = rows.iter().map(|&i| self.keys[i].clone()).collect();
        let layout = PanelLayout::build(&keys)?;
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                let values: Arc<[Value]> = rows.iter().map(|&i| col[i]).collect();
                (name.clone(), values)
            })
            .collect();
        Ok(Self {
            keys: keys.into(),
            layout: Arc::new(layout),
            columns,
        })
    }
}

/// Collects rows in any order and sorts them into panel order on `build`.
///
/// Symbols keep the order of their first appearance; rows inside a symbol are sorted by date.
#[derive(Debug, Clone, Default)]
pub struct PanelBuilder {
    columns: Vec<String>,
    rows: Vec<(RowKey, Vec<Value>)>,
}

impl PanelBuilder {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I>(&mut self, symbol: impl Into<String>, date: i64, values: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.rows
            .push((RowKey::new(symbol, date), values.into_iter().collect()));
        self
    }

    pub fn row<I>(mut self, symbol: impl Into<String>, date: i64, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.push_row(symbol, date, values);
        self
    }

    pub fn build(self) -> Result<Panel, PanelError> {
        let Self { columns, mut rows } = self;

        let mut symbol_order: HashMap<String, usize> = HashMap::new();
        for (key, values) in &rows {
            if values.len() != columns.len() {
                return Err(PanelError::ColumnLength {
                    column: format!("<row {}@{}>", key.symbol, key.date),
                    expected: columns.len(),
                    actual: values.len(),
                });
            }
            let next = symbol_order.len();
            symbol_order.entry(key.symbol.clone()).or_insert(next);
        }
        rows.sort_by(|(a, _), (b, _)| {
            symbol_order[&a.symbol]
                .cmp(&symbol_order[&b.symbol])
                .then(a.date.cmp(&b.date))
        });

        let mut col_bufs: Vec<Vec<Value>> = columns
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        let mut keys = Vec::with_capacity(rows.len());
        for (key, values) in rows {
            for (buf, value) in col_bufs.iter_mut().zip(values) {
                buf.push(value);
            }
            keys.push(key);
        }

        let mut panel = Panel::new(keys)?;
        for (name, buf) in columns.into_iter().zip(col_bufs) {
            panel.set_column(name, buf)?;
        }
        Ok(panel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(rows: &[(&str, i64)]) -> Vec<RowKey> {
        rows.iter().map(|(s, d)| RowKey::new(*s, *d)).collect()
    }

    #[test]
    fn layout_groups_symbols_and_dates() {
        let panel = Panel::new(keys(&[("a", 1), ("a", 2), ("b", 1), ("b", 3)]))
            .expect("ordered keys");
        assert_eq!(panel.symbol_ranges(), &[0..2, 2..4]);
        assert_eq!(panel.date_groups(), &[vec![0, 2], vec![1], vec![3]]);
        assert_eq!(panel.symbols().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn rejects_non_ascending_dates() {
        let err = Panel::new(keys(&[("a", 2), ("a", 2)])).expect_err("duplicate date");
        assert!(matches!(err, PanelError::Unordered { row: 1, .. }));
    }

    #[test]
    fn rejects_split_symbol_blocks() {
        let err = Panel::new(keys(&[("a", 1), ("b", 1), ("a", 2)])).expect_err("split block");
        assert!(matches!(err, PanelError::Unordered { row: 2, .. }));
    }

    #[test]
    fn builder_sorts_rows_into_panel_order() {
        let panel = Panel::builder(["close"])
            .row("b", 2, [Some(4.0)])
            .row("a", 2, [Some(2.0)])
            .row("b", 1, [Some(3.0)])
            .row("a", 1, [Some(1.0)])
            .build()
            .expect("build should succeed");
        assert_eq!(panel.symbols().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(
            panel.column("close").expect("close"),
            &[Some(3.0), Some(4.0), Some(1.0), Some(2.0)]
        );
    }

    #[test]
    fn set_column_checks_length_and_keeps_position() {
        let mut panel = Panel::builder(["open", "close"])
            .row("a", 1, [Some(1.0), Some(2.0)])
            .build()
            .expect("build should succeed");
        let err = panel
            .set_column("x", vec![None, None])
            .expect_err("length mismatch");
        assert!(matches!(err, PanelError::ColumnLength { expected: 1, actual: 2, .. }));

        let prev = panel
            .set_column("open", vec![Some(9.0)])
            .expect("replace open");
        assert!(prev.is_some());
        assert_eq!(panel.column_names().collect::<Vec<_>>(), vec!["open", "close"]);
    }

    #[test]
    fn filter_rows_keeps_columns_aligned() {
        let panel = Panel::builder(["close"])
            .row("a", 1, [Some(1.0)])
            .row("a", 2, [Some(2.0)])
            .row("b", 1, [Some(3.0)])
            .build()
            .expect("build should succeed");
        let sub = panel
            .filter_rows(|key| key.date >= 2 || key.symbol == "b")
            .expect("subsequence stays ordered");
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.column("close").expect("close"), &[Some(2.0), Some(3.0)]);
        assert_eq!(sub.symbol_ranges(), &[0..1, 1..2]);
    }

    #[test]
    fn eval_options_default_is_sequential() {
        let opts = EvalOptions::default();
        assert!(!opts.parallel_for(1_000_000));
        let opts = EvalOptions {
            parallel: true,
            parallel_min_rows: 10,
        };
        assert!(opts.parallel_for(10));
        assert!(!opts.parallel_for(9));
    }
}
