//! seisan-xlsx: applies computed cell values to an `.xlsx` expense
//! template. Reading is calamine's job; writing patches the worksheet XML
//! inside the zip container directly, so every style, print area and
//! merged region of the template survives untouched.

pub mod cellref;
pub mod patch;
pub mod template;

pub use cellref::{cell_ref, column_letters, parse_cell_ref};
pub use patch::{patch_workbook, write_filled_template};
pub use template::{read_merged_ranges, read_template};
