//! Load receipt records from a CSV export.
//!
//! Header: date,store_name,category,invoice_number,total_amount,amount_8_percent
//! Amounts go through the same parse-or-zero coercion as service output.

use std::path::Path;

use anyhow::{Context, Result};

use seisan_core::{Category, ReceiptRecord, normalize};

pub fn parse_receipts_csv(path: impl AsRef<Path>) -> Result<Vec<ReceiptRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;
    read_records(&mut rdr)
}

fn read_records<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<ReceiptRecord>> {
    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;

        // store names merge byte-for-byte downstream, so keep them raw
        let store_name = record.get(1).unwrap_or("").to_string();
        let total_amount = normalize::parse_amount(record.get(4).unwrap_or(""));
        let amount_8_percent = normalize::parse_amount(record.get(5).unwrap_or(""));
        if store_name.is_empty() && total_amount == 0.0 && amount_8_percent == 0.0 {
            continue;
        }

        out.push(ReceiptRecord {
            date: normalize::blank_to_none(record.get(0).map(str::to_string))
                .map(|d| normalize::canonical_date(&d)),
            store_name,
            category: Category::from_tag(record.get(2).unwrap_or("").trim()),
            invoice_number: normalize::blank_to_none(record.get(3).map(str::to_string)),
            total_amount,
            amount_8_percent,
        });
    }
    Ok(out)
}
