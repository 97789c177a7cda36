//! seisan-core: deterministic classification, aggregation and template
//! layout for extracted expense receipts.

pub mod aggregate;
pub mod layout;
pub mod normalize;
pub mod receipt;
pub mod sheet;

pub use aggregate::{
    AggregatedSlot, AggregationResult, HIGHWAY_LABEL, PARKING_LABEL, TRANSPORT_LABEL, aggregate,
};
pub use layout::{ColumnMap, Placement, RowBand, TemplateLayout, plan};
pub use receipt::{Category, ReceiptRecord};
pub use sheet::{CellValue, MergedRange, SheetModel, fill_sheet, write_slot};
