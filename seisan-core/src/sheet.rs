//! In-memory worksheet writes with merged-region resolution.
//!
//! Only the top-left anchor of a merged region is writable in the output
//! workbook, so every address is resolved to its anchor before a value is
//! stored. The model holds the final (row, col) → value map that the xlsx
//! patcher applies to the template.

use std::collections::BTreeMap;

use crate::aggregate::{AggregatedSlot, AggregationResult};
use crate::layout::{Placement, TemplateLayout, plan};

/// A merged cell region, 1-indexed, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl MergedRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }

    /// Top-left cell, the only writable cell of the region.
    pub fn anchor(&self) -> (u32, u32) {
        (self.min_row, self.min_col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

/// Pending writes against one worksheet. Later writes to the same resolved
/// cell win, matching direct assignment into a workbook.
#[derive(Debug, Clone, Default)]
pub struct SheetModel {
    merges: Vec<MergedRange>,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl SheetModel {
    pub fn new(merges: Vec<MergedRange>) -> Self {
        Self { merges, cells: BTreeMap::new() }
    }

    /// Anchor of the merged region containing the address, or the address
    /// itself when unmerged.
    pub fn resolve(&self, row: u32, col: u32) -> (u32, u32) {
        self.merges
            .iter()
            .find(|m| m.contains(row, col))
            .map(|m| m.anchor())
            .unwrap_or((row, col))
    }

    /// Write through merged regions, like assigning to the visible cell.
    pub fn smart_write(&mut self, row: u32, col: u32, value: CellValue) {
        let target = self.resolve(row, col);
        self.cells.insert(target, value);
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&self.resolve(row, col))
    }

    /// Final anchor-resolved writes, ordered by (row, col).
    pub fn cells(&self) -> &BTreeMap<(u32, u32), CellValue> {
        &self.cells
    }
}

/// Write one slot at `row`: date and store label only when present,
/// amounts only when strictly positive. The derived 10% amount can be
/// negative on bad extractions; it is skipped, not clamped.
pub fn write_slot(model: &mut SheetModel, row: u32, slot: &AggregatedSlot, layout: &TemplateLayout) {
    let cols = layout.columns;
    if let Some(date) = &slot.date {
        model.smart_write(row, cols.date, CellValue::Text(date.clone()));
    }
    if !slot.store_name.is_empty() {
        model.smart_write(row, cols.store_name, CellValue::Text(slot.store_name.clone()));
    }
    if slot.amount_8_percent > 0.0 {
        model.smart_write(row, cols.amount_8, CellValue::Number(slot.amount_8_percent));
    }
    let standard = slot.amount_10_percent();
    if standard > 0.0 {
        model.smart_write(row, cols.amount_10, CellValue::Number(standard));
    }
}

/// Plan and apply every write for an aggregation result.
pub fn fill_sheet(model: &mut SheetModel, result: &AggregationResult, layout: &TemplateLayout) {
    for Placement { row, slot } in plan(result, layout) {
        write_slot(model, row, slot, layout);
    }
}
