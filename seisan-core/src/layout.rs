//! Row and column assignment against the physical template.

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregatedSlot, AggregationResult};

/// Columns that receive values, 1-indexed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: u32,
    pub store_name: u32,
    pub amount_8: u32,
    pub amount_10: u32,
}

/// Rows `[start, resume)` hold the printed page footer/header and never
/// receive data; a detail row landing inside is forced to `resume`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowBand {
    pub start: u32,
    pub resume: u32,
}

impl RowBand {
    pub fn shift(&self, row: u32) -> u32 {
        if row >= self.start && row < self.resume {
            self.resume
        } else {
            row
        }
    }
}

/// Where the expense template expects each value. This is a property of
/// the target workbook, not of the data; override it to aim at a
/// different template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateLayout {
    /// Reserved for the transport rollup; untouched when the slot is absent.
    pub transport_row: u32,
    /// Reserved for the parking rollup.
    pub parking_row: u32,
    /// First row of the highway/general detail sequence.
    pub detail_start_row: u32,
    pub footer_band: RowBand,
    pub columns: ColumnMap,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            transport_row: 9,
            parking_row: 10,
            detail_start_row: 11,
            footer_band: RowBand { start: 30, resume: 41 },
            columns: ColumnMap {
                date: 2,
                store_name: 5,
                amount_8: 16,
                amount_10: 19,
            },
        }
    }
}

/// One slot pinned to its output row.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub row: u32,
    pub slot: &'a AggregatedSlot,
}

/// Assign rows: fixed slots at their reserved rows, then the highway slot
/// and the general list from `detail_start_row`, one row per item with the
/// footer-band shift applied. There is no upper bound; rows past the
/// template's physical capacity are still produced.
pub fn plan<'a>(result: &'a AggregationResult, layout: &TemplateLayout) -> Vec<Placement<'a>> {
    let mut placements = Vec::new();
    if let Some(slot) = &result.transport {
        placements.push(Placement { row: layout.transport_row, slot });
    }
    if let Some(slot) = &result.parking {
        placements.push(Placement { row: layout.parking_row, slot });
    }

    let mut row = layout.detail_start_row;
    for slot in result.highway.iter().chain(&result.general) {
        row = layout.footer_band.shift(row);
        placements.push(Placement { row, slot });
        row += 1;
    }
    placements
}
