//! Template geometry: merged regions of the first worksheet.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Reader, Xlsx, open_workbook};

use seisan_core::{MergedRange, SheetModel};

/// Merged regions of the workbook's first worksheet, converted to the
/// core's 1-indexed ranges (calamine dimensions are 0-indexed).
pub fn read_merged_ranges(path: &Path) -> Result<Vec<MergedRange>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("open template {}", path.display()))?;
    workbook
        .load_merged_regions()
        .context("load merged regions")?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("template has no worksheets")?;

    let regions = workbook
        .worksheet_merge_cells(&sheet)
        .unwrap_or(Ok(Vec::new()))
        .unwrap_or_default();

    Ok(regions
        .iter()
        .map(|d| MergedRange {
            min_row: d.start.0 + 1,
            min_col: d.start.1 + 1,
            max_row: d.end.0 + 1,
            max_col: d.end.1 + 1,
        })
        .collect())
}

/// A writable model of the template's first worksheet.
pub fn read_template(path: &Path) -> Result<SheetModel> {
    Ok(SheetModel::new(read_merged_ranges(path)?))
}
