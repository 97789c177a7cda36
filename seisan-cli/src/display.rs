//! Terminal rendering of the aggregation summary.

use num_format::{Locale, ToFormattedString};

use seisan_core::AggregationResult;

pub fn format_yen(amount: f64) -> String {
    let n = amount.round() as i64;
    format!("¥{}", n.to_formatted_string(&Locale::en))
}

/// Flattened rows in template order, one line each, then the grand total.
pub fn print_summary(result: &AggregationResult) {
    let rows = result.display_rows();
    if rows.is_empty() {
        println!("No receipts found.");
        return;
    }
    for slot in &rows {
        println!(
            "{} | {} | total={} | 10%={} | 8%={}",
            slot.date.as_deref().unwrap_or("----/--/--"),
            slot.store_name,
            format_yen(slot.total_amount),
            format_yen(slot.amount_10_percent()),
            format_yen(slot.amount_8_percent),
        );
    }
    println!("\n支払総額: {}", format_yen(result.grand_total()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(0.0), "¥0");
        assert_eq!(format_yen(800.0), "¥800");
        assert_eq!(format_yen(1234567.0), "¥1,234,567");
        assert_eq!(format_yen(-200.0), "¥-200");
    }
}
