//! Patch computed cell values into an xlsx template.
//!
//! The workbook zip is copied entry-for-entry; only the first worksheet's
//! XML is rewritten. Untouched rows and cells pass through event-for-event,
//! existing cells keep their `r`/`s` attributes, inserted cells land in
//! column order and inserted rows in row order. Strings are written as
//! inline strings so the shared-string table never needs touching.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use seisan_core::{CellValue, SheetModel};

use crate::cellref::{cell_ref, parse_cell_ref};

type XmlReader<'a> = Reader<&'a [u8]>;
type XmlWriter = Writer<Cursor<Vec<u8>>>;
type RowWrites = BTreeMap<u32, CellValue>;
type CellMap = BTreeMap<u32, RowWrites>;

/// Apply the model's writes to `template`, saving to `output` via a
/// sibling temp file and rename so a failed run never publishes a partial
/// artifact.
pub fn write_filled_template(template: &Path, output: &Path, model: &SheetModel) -> Result<()> {
    let bytes =
        fs::read(template).with_context(|| format!("read template {}", template.display()))?;
    let patched = patch_workbook(&bytes, model)?;

    let tmp = output.with_extension("xlsx.tmp");
    fs::write(&tmp, &patched).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, output).with_context(|| format!("rename to {}", output.display()))?;
    Ok(())
}

/// Rewrite workbook bytes with the model's cells applied to the first
/// worksheet. Every other archive entry is copied through unchanged.
pub fn patch_workbook(workbook: &[u8], model: &SheetModel) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(workbook))
        .context("template is not a valid xlsx (zip) archive")?;
    let sheet_path = first_sheet_path(&mut archive)?;
    let sheet_xml = read_entry(&mut archive, &sheet_path)?;

    let mut cells: CellMap = BTreeMap::new();
    for (&(row, col), value) in model.cells() {
        cells.entry(row).or_default().insert(col, value.clone());
    }
    let patched_xml = patch_sheet_xml(&sheet_xml, cells)?;

    let mut out = ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.name() == sheet_path {
            continue;
        }
        out.raw_copy_file(entry)?;
    }
    out.start_file(sheet_path.as_str(), FileOptions::default())?;
    out.write_all(patched_xml.as_bytes())?;
    let cursor = out.finish().context("finish workbook archive")?;
    Ok(cursor.into_inner())
}

/// Archive path of the first worksheet, resolved through workbook.xml and
/// its relationship part (the source always writes to the active sheet).
fn first_sheet_path(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String> {
    let workbook_xml = read_entry(archive, "xl/workbook.xml")?;
    let rels_xml = read_entry(archive, "xl/_rels/workbook.xml.rels")?;

    let rid = first_sheet_rid(&workbook_xml)?;
    let target = relationship_target(&rels_xml, &rid)?;
    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    })
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("workbook is missing {name}"))?;
    let mut s = String::new();
    entry.read_to_string(&mut s)?;
    Ok(s)
}

fn first_sheet_rid(workbook_xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let Some(attr) = e.try_get_attribute("r:id")? {
                    return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                }
                bail!("workbook sheet entry has no relationship id");
            }
            Event::Eof => bail!("workbook.xml lists no sheets"),
            _ => {}
        }
    }
}

fn relationship_target(rels_xml: &str, rid: &str) -> Result<String> {
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = e
                    .try_get_attribute("Id")?
                    .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                if id.as_deref() == Some(rid) {
                    if let Some(attr) = e.try_get_attribute("Target")? {
                        return Ok(String::from_utf8_lossy(&attr.value).into_owned());
                    }
                    bail!("relationship {rid} has no target");
                }
            }
            Event::Eof => bail!("no relationship with id {rid}"),
            _ => {}
        }
    }
}

/// Rewrite one worksheet document with `cells` applied.
fn patch_sheet_xml(xml: &str, mut cells: CellMap) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        let ev = reader.read_event()?;
        match ev {
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                writer.write_event(Event::Start(e.clone()))?;
                patch_sheet_data(&mut reader, &mut writer, &mut cells)?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                // expand a bare <sheetData/> to hold the new rows
                writer.write_event(Event::Start(e.clone()))?;
                flush_rows_before(&mut writer, &mut cells, u32::MAX)?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    String::from_utf8(writer.into_inner().into_inner()).context("patched worksheet is not UTF-8")
}

fn patch_sheet_data(
    reader: &mut XmlReader<'_>,
    writer: &mut XmlWriter,
    cells: &mut CellMap,
) -> Result<()> {
    loop {
        let ev = reader.read_event()?;
        match ev {
            Event::Start(ref e) if e.local_name().as_ref() == b"row" => {
                let n = row_number(e)?;
                flush_rows_before(writer, cells, n)?;
                match cells.remove(&n) {
                    Some(writes) => {
                        writer.write_event(Event::Start(e.clone()))?;
                        patch_row(reader, writer, n, writes)?;
                    }
                    None => {
                        writer.write_event(Event::Start(e.clone()))?;
                        copy_element_content(reader, writer)?;
                    }
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                let n = row_number(e)?;
                flush_rows_before(writer, cells, n)?;
                match cells.remove(&n) {
                    Some(writes) => {
                        writer.write_event(Event::Start(e.clone()))?;
                        for (col, value) in &writes {
                            emit_cell(writer, n, *col, None, value)?;
                        }
                        writer.write_event(Event::End(BytesEnd::new("row")))?;
                    }
                    None => writer.write_event(Event::Empty(e.clone()))?,
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                flush_rows_before(writer, cells, u32::MAX)?;
                writer.write_event(Event::End(e.clone()))?;
                return Ok(());
            }
            Event::Eof => bail!("worksheet XML ended inside sheetData"),
            other => writer.write_event(other)?,
        }
    }
}

/// Rewrite the inside of one existing row (start tag already written).
fn patch_row(
    reader: &mut XmlReader<'_>,
    writer: &mut XmlWriter,
    row: u32,
    mut writes: RowWrites,
) -> Result<()> {
    loop {
        let ev = reader.read_event()?;
        match ev {
            Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                let (col, style) = cell_col_and_style(e)?;
                flush_cells_before(writer, row, &mut writes, col)?;
                match writes.remove(&col) {
                    Some(value) => {
                        skip_element_content(reader)?;
                        emit_cell(writer, row, col, style.as_deref(), &value)?;
                    }
                    None => {
                        writer.write_event(Event::Start(e.clone()))?;
                        copy_element_content(reader, writer)?;
                    }
                }
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                let (col, style) = cell_col_and_style(e)?;
                flush_cells_before(writer, row, &mut writes, col)?;
                match writes.remove(&col) {
                    Some(value) => emit_cell(writer, row, col, style.as_deref(), &value)?,
                    None => writer.write_event(Event::Empty(e.clone()))?,
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                let rest = std::mem::take(&mut writes);
                for (col, value) in rest {
                    emit_cell(writer, row, col, None, &value)?;
                }
                writer.write_event(Event::End(e.clone()))?;
                return Ok(());
            }
            Event::Eof => bail!("worksheet XML ended inside a row"),
            other => writer.write_event(other)?,
        }
    }
}

/// Emit whole synthesized rows for pending row numbers below `next`.
fn flush_rows_before(writer: &mut XmlWriter, cells: &mut CellMap, next: u32) -> Result<()> {
    let rows: Vec<u32> = cells.range(..next).map(|(&n, _)| n).collect();
    for n in rows {
        let writes = cells.remove(&n).unwrap_or_default();
        let mut row = BytesStart::new("row");
        row.push_attribute(("r", n.to_string().as_str()));
        writer.write_event(Event::Start(row))?;
        for (col, value) in &writes {
            emit_cell(writer, n, *col, None, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    Ok(())
}

/// Emit pending cells of the current row with column numbers below `next`.
fn flush_cells_before(writer: &mut XmlWriter, row: u32, writes: &mut RowWrites, next: u32) -> Result<()> {
    let cols: Vec<u32> = writes.range(..next).map(|(&c, _)| c).collect();
    for col in cols {
        if let Some(value) = writes.remove(&col) {
            emit_cell(writer, row, col, None, &value)?;
        }
    }
    Ok(())
}

fn emit_cell(
    writer: &mut XmlWriter,
    row: u32,
    col: u32,
    style: Option<&str>,
    value: &CellValue,
) -> Result<()> {
    let reference = cell_ref(row, col);
    let mut c = BytesStart::new("c");
    c.push_attribute(("r", reference.as_str()));
    if let Some(s) = style {
        c.push_attribute(("s", s));
    }
    match value {
        CellValue::Number(n) => {
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&format_number(*n))))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
        }
        CellValue::Text(t) => {
            c.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(c))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(t)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Amounts are yen, almost always whole; keep integers free of a trailing
/// fraction so the workbook shows them the way the template formats them.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn row_number(e: &BytesStart) -> Result<u32> {
    let attr = e
        .try_get_attribute("r")?
        .context("worksheet row without a number")?;
    let s = String::from_utf8_lossy(&attr.value).into_owned();
    s.parse::<u32>()
        .with_context(|| format!("bad row number {s:?}"))
}

fn cell_col_and_style(e: &BytesStart) -> Result<(u32, Option<String>)> {
    let attr = e
        .try_get_attribute("r")?
        .context("worksheet cell without a reference")?;
    let reference = String::from_utf8_lossy(&attr.value).into_owned();
    let (_, col) = parse_cell_ref(&reference)
        .with_context(|| format!("bad cell reference {reference:?}"))?;
    let style = e
        .try_get_attribute("s")?
        .map(|a| String::from_utf8_lossy(&a.value).into_owned());
    Ok((col, style))
}

/// Copy events through to the end tag matching the already-written start.
fn copy_element_content(reader: &mut XmlReader<'_>, writer: &mut XmlWriter) -> Result<()> {
    let mut depth = 0usize;
    loop {
        let ev = reader.read_event()?;
        match ev {
            Event::Start(_) => {
                depth += 1;
                writer.write_event(ev)?;
            }
            Event::End(_) => {
                writer.write_event(ev)?;
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => bail!("worksheet XML ended inside an element"),
            other => writer.write_event(other)?,
        }
    }
}

/// Discard events through the end tag matching the current element.
fn skip_element_content(reader: &mut XmlReader<'_>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }
            Event::Eof => bail!("worksheet XML ended inside an element"),
            _ => {}
        }
    }
}
