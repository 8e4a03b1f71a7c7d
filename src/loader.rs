use crate::error::EngineError;
use crate::runtime::FactorEngine;
use crate::types::Panel;
use std::collections::HashSet;
use tracing::debug;

/// Source of panels. Implementations own the I/O; expression evaluation is provided.
pub trait PanelLoader {
    /// Rows for `symbols` (all symbols when empty) with `start <= date` and, when given,
    /// `date <= end`.
    fn load(&self, symbols: &[&str], start: i64, end: Option<i64>) -> Result<Panel, EngineError>;

    fn calc_expr<S, N>(&self, panel: &Panel, fields: &[S], names: &[N]) -> Result<Panel, EngineError>
    where
        Self: Sized,
        S: AsRef<str>,
        N: AsRef<str>,
    {
        FactorEngine::default().calc_expr(panel, fields, names)
    }
}

/// Serves filtered views of a panel held in memory.
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    panel: Panel,
}

impl MemoryLoader {
    pub fn new(panel: Panel) -> Self {
        Self { panel }
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }
}

impl PanelLoader for MemoryLoader {
    fn load(&self, symbols: &[&str], start: i64, end: Option<i64>) -> Result<Panel, EngineError> {
        let known: HashSet<&str> = self.panel.symbols().collect();
        if let Some(unknown) = symbols.iter().find(|s| !known.contains(**s)) {
            return Err(EngineError::Load {
                reason: format!("unknown symbol `{unknown}`"),
            });
        }
        let wanted: HashSet<&str> = symbols.iter().copied().collect();
        let panel = self.panel.filter_rows(|key| {
            (wanted.is_empty() || wanted.contains(key.symbol.as_str()))
                && key.date >= start
                && end.map_or(true, |end| key.date <= end)
        })?;
        debug!(
            symbols = symbols.len(),
            start,
            end = ?end,
            rows = panel.len(),
            "loaded panel from memory"
        );
        Ok(panel)
    }
}
