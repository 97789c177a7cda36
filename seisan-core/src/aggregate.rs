//! Bucket classification and aggregation.
//!
//! Records split into three fixed rollups (transport, parking, highway) and
//! a residual general pool merged by store name. Aggregation performs no
//! I/O and never fails; an empty input yields an empty result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::receipt::{Category, ReceiptRecord};

/// Labels written in place of a store name for the fixed rollups.
pub const TRANSPORT_LABEL: &str = "交通費（電車・バス等）";
pub const PARKING_LABEL: &str = "駐車場代";
pub const HIGHWAY_LABEL: &str = "高速道路料金（ETC等）";

/// Sort sentinel: absent dates order after every real `YYYY/MM/DD`.
const ABSENT_DATE_KEY: &str = "9999/99/99";

/// A synthesized rollup row: either one fixed-category summary or one
/// per-store merge from the general pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedSlot {
    /// Latest date among contributing receipts; `None` if none carried one.
    pub date: Option<String>,
    pub store_name: String,
    /// First non-empty invoice number among contributors, else empty.
    pub invoice_number: String,
    pub total_amount: f64,
    pub amount_8_percent: f64,
}

impl AggregatedSlot {
    /// Portion taxed at the standard 10% rate. Derived, never stored; goes
    /// negative when upstream extraction reports an 8% portion larger than
    /// the total. Callers skip non-positive values instead of clamping.
    pub fn amount_10_percent(&self) -> f64 {
        self.total_amount - self.amount_8_percent
    }
}

/// Output of one aggregation run. Built per document, consumed by the
/// layout planner and the display renderer, then dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationResult {
    pub transport: Option<AggregatedSlot>,
    pub parking: Option<AggregatedSlot>,
    pub highway: Option<AggregatedSlot>,
    /// Per-store merges, ascending by date with undated slots last.
    pub general: Vec<AggregatedSlot>,
}

impl AggregationResult {
    /// Flattened view for display: fixed slots first, then the detail list.
    pub fn display_rows(&self) -> Vec<&AggregatedSlot> {
        let mut rows = Vec::new();
        rows.extend(self.transport.as_ref());
        rows.extend(self.parking.as_ref());
        rows.extend(self.highway.as_ref());
        rows.extend(self.general.iter());
        rows
    }

    pub fn grand_total(&self) -> f64 {
        self.display_rows().iter().map(|s| s.total_amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.transport.is_none()
            && self.parking.is_none()
            && self.highway.is_none()
            && self.general.is_empty()
    }
}

/// Partition records into the fixed rollups plus the store-merged general
/// list. Input order is irrelevant for the fixed slots; for the general
/// list it decides which invoice number a merged group keeps.
pub fn aggregate(records: &[ReceiptRecord]) -> AggregationResult {
    AggregationResult {
        transport: sum_fixed(records, Category::Transport, TRANSPORT_LABEL),
        parking: sum_fixed(records, Category::Parking, PARKING_LABEL),
        highway: sum_fixed(records, Category::Highway, HIGHWAY_LABEL),
        general: merge_general(records),
    }
}

fn sum_fixed(records: &[ReceiptRecord], category: Category, label: &str) -> Option<AggregatedSlot> {
    let selected: Vec<&ReceiptRecord> = records.iter().filter(|r| r.category == category).collect();
    if selected.is_empty() {
        return None;
    }
    // zero-padded YYYY/MM/DD, so the lexicographic max is the latest date
    let date = selected
        .iter()
        .filter_map(|r| r.date.as_deref())
        .max()
        .map(str::to_string);
    Some(AggregatedSlot {
        date,
        store_name: label.to_string(),
        invoice_number: String::new(),
        total_amount: selected.iter().map(|r| r.total_amount).sum(),
        amount_8_percent: selected.iter().map(|r| r.amount_8_percent).sum(),
    })
}

/// Merge the general pool by exact store name. Byte-for-byte equality only:
/// trailing whitespace or width variants do not merge.
fn merge_general(records: &[ReceiptRecord]) -> Vec<AggregatedSlot> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut slots: Vec<AggregatedSlot> = Vec::new();

    for r in records.iter().filter(|r| r.category == Category::General) {
        let i = *index.entry(r.store_name.as_str()).or_insert_with(|| {
            slots.push(AggregatedSlot {
                date: None,
                store_name: r.store_name.clone(),
                invoice_number: String::new(),
                total_amount: 0.0,
                amount_8_percent: 0.0,
            });
            slots.len() - 1
        });

        let slot = &mut slots[i];
        slot.total_amount += r.total_amount;
        slot.amount_8_percent += r.amount_8_percent;
        if let Some(d) = r.date.as_deref() {
            if slot.date.as_deref().map_or(true, |cur| d > cur) {
                slot.date = Some(d.to_string());
            }
        }
        if slot.invoice_number.is_empty() {
            if let Some(inv) = r.invoice_number.as_deref() {
                slot.invoice_number = inv.to_string();
            }
        }
    }

    // stable sort: equal dates keep first-encounter order
    slots.sort_by(|a, b| date_key(a).cmp(date_key(b)));
    slots
}

fn date_key(slot: &AggregatedSlot) -> &str {
    slot.date.as_deref().unwrap_or(ABSENT_DATE_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        date: Option<&str>,
        store: &str,
        category: Category,
        invoice: Option<&str>,
        total: f64,
        reduced: f64,
    ) -> ReceiptRecord {
        ReceiptRecord {
            date: date.map(str::to_string),
            store_name: store.to_string(),
            category,
            invoice_number: invoice.map(str::to_string),
            total_amount: total,
            amount_8_percent: reduced,
        }
    }

    #[test]
    fn test_transport_rollup_sums_and_latest_date() {
        let records = vec![
            record(Some("2024/01/10"), "JR", Category::Transport, None, 500.0, 0.0),
            record(Some("2024/01/12"), "Metro", Category::Transport, None, 300.0, 0.0),
        ];
        let result = aggregate(&records);
        let transport = result.transport.unwrap();
        assert_eq!(transport.date.as_deref(), Some("2024/01/12"));
        assert_eq!(transport.total_amount, 800.0);
        assert_eq!(transport.amount_8_percent, 0.0);
        assert_eq!(transport.store_name, TRANSPORT_LABEL);
        assert_eq!(transport.invoice_number, "");
        assert!(result.parking.is_none());
        assert!(result.highway.is_none());
        assert!(result.general.is_empty());
    }

    #[test]
    fn test_absent_slot_for_empty_selection() {
        let records = vec![record(None, "P", Category::Parking, None, 700.0, 0.0)];
        let result = aggregate(&records);
        assert!(result.transport.is_none());
        assert!(result.highway.is_none());
        let parking = result.parking.unwrap();
        assert_eq!(parking.store_name, PARKING_LABEL);
        // no contributor carried a date
        assert_eq!(parking.date, None);
    }

    #[test]
    fn test_general_merge_by_store_name() {
        let records = vec![
            record(Some("2024/01/10"), "ABC Mart", Category::General, None, 1000.0, 200.0),
            record(Some("2024/01/15"), "ABC Mart", Category::General, None, 500.0, 100.0),
        ];
        let result = aggregate(&records);
        assert_eq!(result.general.len(), 1);
        let slot = &result.general[0];
        assert_eq!(slot.total_amount, 1500.0);
        assert_eq!(slot.amount_8_percent, 300.0);
        assert_eq!(slot.date.as_deref(), Some("2024/01/15"));
    }

    #[test]
    fn test_general_merge_is_exact_match_only() {
        let records = vec![
            record(None, "ABC Mart", Category::General, None, 100.0, 0.0),
            record(None, "ABC Mart ", Category::General, None, 100.0, 0.0),
        ];
        let result = aggregate(&records);
        assert_eq!(result.general.len(), 2);
    }

    #[test]
    fn test_general_partition_is_complete() {
        let records = vec![
            record(None, "A", Category::General, None, 1.0, 0.0),
            record(None, "B", Category::General, None, 2.0, 0.0),
            record(None, "A", Category::General, None, 4.0, 0.0),
            record(None, "X", Category::Transport, None, 8.0, 0.0),
        ];
        let result = aggregate(&records);
        let general_total: f64 = result.general.iter().map(|s| s.total_amount).sum();
        assert_eq!(general_total, 7.0);
        assert_eq!(result.transport.unwrap().total_amount, 8.0);
    }

    #[test]
    fn test_general_sorted_by_date_absent_last() {
        let records = vec![
            record(None, "undated", Category::General, None, 1.0, 0.0),
            record(Some("2024/02/01"), "late", Category::General, None, 1.0, 0.0),
            record(Some("2024/01/01"), "early", Category::General, None, 1.0, 0.0),
        ];
        let mut result = aggregate(&records);
        let names: Vec<&str> = result.general.iter().map(|s| s.store_name.as_str()).collect();
        assert_eq!(names, vec!["early", "late", "undated"]);

        // sorting again changes nothing
        let before = result.general.clone();
        result
            .general
            .sort_by(|a, b| super::date_key(a).cmp(super::date_key(b)));
        assert_eq!(result.general, before);
    }

    #[test]
    fn test_first_non_empty_invoice_number_wins() {
        let records = vec![
            record(None, "S", Category::General, None, 1.0, 0.0),
            record(None, "S", Category::General, Some("T1111111111111"), 1.0, 0.0),
            record(None, "S", Category::General, Some("T2222222222222"), 1.0, 0.0),
        ];
        let result = aggregate(&records);
        assert_eq!(result.general[0].invoice_number, "T1111111111111");
    }

    #[test]
    fn test_reduced_rate_may_exceed_total() {
        // bad upstream extraction is tolerated, never rejected
        let records = vec![record(None, "S", Category::General, None, 100.0, 300.0)];
        let result = aggregate(&records);
        let slot = &result.general[0];
        assert_eq!(slot.amount_8_percent, 300.0);
        assert_eq!(slot.amount_10_percent(), -200.0);
    }

    #[test]
    fn test_empty_input() {
        let result = aggregate(&[]);
        assert!(result.is_empty());
        assert_eq!(result.grand_total(), 0.0);
        assert!(result.display_rows().is_empty());
    }

    #[test]
    fn test_display_rows_order() {
        let records = vec![
            record(None, "store", Category::General, None, 1.0, 0.0),
            record(None, "", Category::Highway, None, 2.0, 0.0),
            record(None, "", Category::Transport, None, 4.0, 0.0),
            record(None, "", Category::Parking, None, 8.0, 0.0),
        ];
        let result = aggregate(&records);
        let labels: Vec<&str> = result
            .display_rows()
            .iter()
            .map(|s| s.store_name.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![TRANSPORT_LABEL, PARKING_LABEL, HIGHWAY_LABEL, "store"]
        );
        assert_eq!(result.grand_total(), 15.0);
    }
}
