//! Table formatting for CLI output

use comfy_table::{Cell, Color, ContentArrangement, Table as ComfyTable};
use routeplane_kernel::ProviderPhase;

/// Table builder for CLI output
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set table headers
    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of plain text cells
    pub fn add_row(mut self, row: &[&str]) -> Self {
        self.rows.push(row.iter().map(|s| Cell::new(s)).collect());
        self
    }

    /// Add a row of pre-styled cells
    pub fn add_cells(mut self, row: Vec<Cell>) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn build(self) -> Table {
        let mut inner = ComfyTable::new();
        inner
            .set_header(&self.headers)
            .set_content_arrangement(ContentArrangement::Dynamic);
        for row in self.rows {
            inner.add_row(row);
        }
        Table { inner }
    }
}

/// Table for CLI output
#[derive(Debug, Clone)]
pub struct Table {
    inner: ComfyTable,
}

impl Table {
    pub fn builder() -> TableBuilder {
        TableBuilder::new()
    }

    pub fn row_count(&self) -> usize {
        self.inner.row_iter().count()
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Cell showing a provider phase, colored by outcome.
pub fn phase_cell(phase: ProviderPhase) -> Cell {
    let cell = Cell::new(phase.as_str());
    match phase {
        ProviderPhase::Succeeded => cell.fg(Color::Green),
        ProviderPhase::Partial => cell.fg(Color::Yellow),
        ProviderPhase::RolledBack => cell.fg(Color::Magenta),
        ProviderPhase::Failed => cell.fg(Color::Red),
        ProviderPhase::Planned => cell.fg(Color::Cyan),
        _ => cell,
    }
}
