//! End-to-end: build a small expense-template workbook, fill it from raw
//! records, then read the produced artifact back with calamine.

use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;

use calamine::{Data, DataType, Reader, Xlsx, open_workbook};
use zip::ZipWriter;
use zip::write::FileOptions;

use seisan_core::{
    Category, MergedRange, ReceiptRecord, TRANSPORT_LABEL, TemplateLayout, aggregate, fill_sheet,
};
use seisan_xlsx::{read_merged_ranges, read_template, write_filled_template};

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

const WORKBOOK: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets><sheet name="経費精算" sheetId="1" r:id="rId1"/></sheets>"#,
    r#"</workbook>"#
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"</Relationships>"#
);

// Row 9 carries styled blank cells like the real template; the date column
// of row 9 is merged B9:D9, and row 11's date lands in a merge anchored
// off-column at A11. Row 30 is template footer text that must survive.
const SHEET1: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<sheetData>"#,
    r#"<row r="8"><c r="B8" t="inlineStr"><is><t>日付</t></is></c></row>"#,
    r#"<row r="9"><c r="B9" s="1"/><c r="E9" s="1"/><c r="P9" s="1"/><c r="S9" s="1"/></row>"#,
    r#"<row r="30"><c r="A30" t="inlineStr"><is><t>小計</t></is></c></row>"#,
    r#"</sheetData>"#,
    r#"<mergeCells count="2"><mergeCell ref="B9:D9"/><mergeCell ref="A11:B11"/></mergeCells>"#,
    r#"</worksheet>"#
);

fn build_template_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", SHEET1),
    ] {
        zip.start_file(name, opts).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("seisan-{}-{name}", std::process::id()))
}

fn record(date: &str, store: &str, category: Category, total: f64, reduced: f64) -> ReceiptRecord {
    ReceiptRecord {
        date: Some(date.to_string()),
        store_name: store.to_string(),
        category,
        invoice_number: None,
        total_amount: total,
        amount_8_percent: reduced,
    }
}

#[test]
fn test_fill_template_roundtrip() {
    let template = temp_path("template.xlsx");
    let output = temp_path("out.xlsx");
    fs::write(&template, build_template_bytes()).unwrap();

    let merges = read_merged_ranges(&template).unwrap();
    assert!(merges.contains(&MergedRange { min_row: 9, min_col: 2, max_row: 9, max_col: 4 }));
    assert!(merges.contains(&MergedRange { min_row: 11, min_col: 1, max_row: 11, max_col: 2 }));

    let records = vec![
        record("2024/01/10", "", Category::Transport, 500.0, 0.0),
        record("2024/01/12", "", Category::Transport, 300.0, 0.0),
        record("2024/01/09", "ABC Mart", Category::General, 1000.0, 240.0),
    ];
    let result = aggregate(&records);

    let mut model = read_template(&template).unwrap();
    fill_sheet(&mut model, &result, &TemplateLayout::default());
    write_filled_template(&template, &output, &model).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&output).unwrap();
    let range = workbook.worksheet_range("経費精算").unwrap();

    // transport rollup on row 9: date, label, 10% amount; 8% stays empty
    assert_eq!(
        range.get_value((8, 1)).and_then(|d| d.get_string()),
        Some("2024/01/12")
    );
    assert_eq!(
        range.get_value((8, 4)).and_then(|d| d.get_string()),
        Some(TRANSPORT_LABEL)
    );
    assert_eq!(range.get_value((8, 18)).and_then(|d| d.as_f64()), Some(800.0));
    assert!(
        range
            .get_value((8, 15))
            .map(|d| matches!(d, Data::Empty))
            .unwrap_or(true)
    );

    // general detail on row 11; its date resolved into the A11 merge anchor
    assert_eq!(
        range.get_value((10, 0)).and_then(|d| d.get_string()),
        Some("2024/01/09")
    );
    assert_eq!(
        range.get_value((10, 4)).and_then(|d| d.get_string()),
        Some("ABC Mart")
    );
    assert_eq!(range.get_value((10, 15)).and_then(|d| d.as_f64()), Some(240.0));
    assert_eq!(range.get_value((10, 18)).and_then(|d| d.as_f64()), Some(760.0));

    // template footer text survives the patch
    assert_eq!(
        range.get_value((29, 0)).and_then(|d| d.get_string()),
        Some("小計")
    );

    let _ = fs::remove_file(&template);
    let _ = fs::remove_file(&output);
}
