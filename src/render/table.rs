use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// How long a touched row stays visually marked. Cosmetic only.
const HIGHLIGHT_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    Strong,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub style: CellStyle,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: CellStyle::Plain,
        }
    }

    pub fn strong(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: CellStyle::Strong,
        }
    }

    /// Green for gains, red for losses.
    pub fn signed(text: impl Into<String>, up: bool) -> Self {
        Self {
            text: text.into(),
            style: if up { CellStyle::Up } else { CellStyle::Down },
        }
    }
}

#[derive(Debug)]
struct Row {
    key: String,
    cells: Vec<Cell>,
    highlight_until: Option<Instant>,
}

/// Table whose rows are addressed by a stable key. An update rewrites the
/// cells of the existing row in place, so row identity and on-screen order
/// survive any number of updates; a key never produces a second row.
#[derive(Debug)]
pub struct KeyedTable {
    columns: Vec<&'static str>,
    rows: Vec<Row>,
    index: HashMap<String, usize>,
}

impl KeyedTable {
    pub fn new(columns: Vec<&'static str>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Update-in-place when the key exists, append otherwise. Either way the
    /// row is marked changed until `now + 1s`.
    pub fn upsert(&mut self, key: &str, cells: Vec<Cell>, now: Instant) {
        match self.index.get(key) {
            Some(&slot) => {
                let row = &mut self.rows[slot];
                row.cells = cells;
                row.highlight_until = Some(now + HIGHLIGHT_TTL);
            }
            None => {
                self.index.insert(key.to_string(), self.rows.len());
                self.rows.push(Row {
                    key: key.to_string(),
                    cells,
                    highlight_until: Some(now + HIGHLIGHT_TTL),
                });
            }
        }
    }

    pub fn clear_expired(&mut self, now: Instant) {
        for row in &mut self.rows {
            if matches!(row.highlight_until, Some(until) if until <= now) {
                row.highlight_until = None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &str) -> Option<&[Cell]> {
        self.index
            .get(key)
            .map(|&slot| self.rows[slot].cells.as_slice())
    }

    pub fn is_highlighted(&self, key: &str, now: Instant) -> bool {
        self.index
            .get(key)
            .and_then(|&slot| self.rows[slot].highlight_until)
            .map(|until| until > now)
            .unwrap_or(false)
    }

    pub fn render_into(&self, out: &mut String, now: Instant) {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.text.chars().count());
                }
            }
        }

        for (i, column) in self.columns.iter().enumerate() {
            let _ = write!(out, "  {:width$}", column, width = widths[i]);
        }
        out.push('\n');

        for row in &self.rows {
            let highlighted = matches!(row.highlight_until, Some(until) if until > now);
            if highlighted {
                out.push_str("\x1b[7m");
            }
            for (i, cell) in row.cells.iter().enumerate() {
                let width = widths.get(i).copied().unwrap_or(0);
                let pad = width.saturating_sub(cell.text.chars().count());
                out.push_str("  ");
                out.push_str(style_code(cell.style));
                out.push_str(&cell.text);
                out.push_str(reset_code(cell.style));
                for _ in 0..pad {
                    out.push(' ');
                }
            }
            if highlighted {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }
    }
}

fn style_code(style: CellStyle) -> &'static str {
    match style {
        CellStyle::Plain => "",
        CellStyle::Strong => "\x1b[1m",
        CellStyle::Up => "\x1b[32m",
        CellStyle::Down => "\x1b[31m",
    }
}

fn reset_code(style: CellStyle) -> &'static str {
    match style {
        CellStyle::Plain => "",
        _ => "\x1b[22;39m",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(text: &str) -> Vec<Cell> {
        vec![Cell::strong("KEY"), Cell::plain(text)]
    }

    #[test]
    fn repeated_upserts_keep_a_single_row() {
        let mut table = KeyedTable::new(vec!["Symbol", "Price"]);
        let now = Instant::now();

        table.upsert("SBIN", cells("600.00"), now);
        table.upsert("SBIN", cells("612.50"), now);
        table.upsert("SBIN", cells("598.00"), now);

        assert_eq!(table.len(), 1);
        assert_eq!(table.row("SBIN").unwrap()[1].text, "598.00");
    }

    #[test]
    fn new_keys_append_in_arrival_order() {
        let mut table = KeyedTable::new(vec!["Symbol", "Price"]);
        let now = Instant::now();

        table.upsert("TCS", cells("3400.00"), now);
        table.upsert("SBIN", cells("600.00"), now);
        table.upsert("TCS", cells("3410.00"), now);

        assert_eq!(table.len(), 2);
        let rendered = {
            let mut out = String::new();
            table.render_into(&mut out, now + Duration::from_secs(2));
            out
        };
        let tcs = rendered.find("3410.00").unwrap();
        let sbin = rendered.find("600.00").unwrap();
        assert!(tcs < sbin, "updated row must keep its original position");
    }

    #[test]
    fn highlight_expires_after_one_second() {
        let mut table = KeyedTable::new(vec!["Symbol", "Price"]);
        let now = Instant::now();
        table.upsert("TCS", cells("3400.00"), now);

        assert!(table.is_highlighted("TCS", now));
        assert!(table.is_highlighted("TCS", now + Duration::from_millis(999)));

        let later = now + Duration::from_millis(1001);
        table.clear_expired(later);
        assert!(!table.is_highlighted("TCS", later));
    }
}
