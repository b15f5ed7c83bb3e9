//! Minimal Office Open XML workbook writer.
//!
//! Each sheet holds the same columns as the CSV export. Strings are written
//! inline so no shared-string table is needed.

use std::io::{Cursor, Write};

use clade_model::{AnalysisResult, CsvColumnConfig, Descriptors, FailureOutcome};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::Result;
use crate::table::{build_rows, header_row, prepare_columns};
use crate::value::Cell;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKBOOK_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const WORKSHEET_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const RELS_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Excel limits sheet names to 31 characters.
const MAX_SHEET_NAME_LEN: usize = 31;

/// Rows for one worksheet.
#[derive(Debug, Clone, Default)]
pub struct ExcelSheet {
    pub name: String,
    pub results: Vec<AnalysisResult>,
    pub errors: Vec<FailureOutcome>,
    pub descriptors: Descriptors,
}

/// Build an `.xlsx` workbook with one worksheet per sheet.
///
/// A workbook must contain at least one worksheet; an empty `sheets` slice
/// yields a single `results` sheet with only the header row.
pub fn results_to_excel_bytes(sheets: &[ExcelSheet], config: &CsvColumnConfig) -> Result<Vec<u8>> {
    let fallback = [ExcelSheet {
        name: "results".to_string(),
        ..ExcelSheet::default()
    }];
    let sheets = if sheets.is_empty() { &fallback[..] } else { sheets };

    let mut used_names = Vec::<String>::new();
    for sheet in sheets {
        let name = unique_sheet_name(&sheet.name, &used_names);
        used_names.push(name);
    }

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&content_types_xml(sheets.len())?)?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(&root_rels_xml()?)?;
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(&workbook_xml(&used_names)?)?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(&workbook_rels_xml(sheets.len())?)?;

    for (position, sheet) in sheets.iter().enumerate() {
        let columns = prepare_columns(&sheet.descriptors, config);
        let mut rows = vec![header_row(&columns).into_iter().map(Cell::Text).collect()];
        rows.extend(build_rows(&sheet.results, &sheet.errors, &columns)?);
        debug!(sheet = %used_names[position], rows = rows.len(), "writing worksheet");
        zip.start_file(format!("xl/worksheets/sheet{}.xml", position + 1), options)?;
        zip.write_all(&worksheet_xml(&rows)?)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn new_document() -> Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn content_types_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut writer = new_document()?;
    let mut types = BytesStart::new("Types");
    types.push_attribute(("xmlns", CONTENT_TYPES_NS));
    writer.write_event(Event::Start(types))?;
    write_empty(&mut writer, "Default", &[("Extension", "rels"), ("ContentType", RELS_TYPE)])?;
    write_empty(
        &mut writer,
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    write_empty(
        &mut writer,
        "Override",
        &[("PartName", "/xl/workbook.xml"), ("ContentType", WORKBOOK_TYPE)],
    )?;
    for number in 1..=sheet_count {
        let part = format!("/xl/worksheets/sheet{number}.xml");
        write_empty(
            &mut writer,
            "Override",
            &[("PartName", part.as_str()), ("ContentType", WORKSHEET_TYPE)],
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(writer.into_inner())
}

fn root_rels_xml() -> Result<Vec<u8>> {
    let mut writer = new_document()?;
    let mut rels = BytesStart::new("Relationships");
    rels.push_attribute(("xmlns", PACKAGE_REL_NS));
    writer.write_event(Event::Start(rels))?;
    write_empty(
        &mut writer,
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", OFFICE_DOCUMENT_REL),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(writer.into_inner())
}

fn workbook_xml(sheet_names: &[String]) -> Result<Vec<u8>> {
    let mut writer = new_document()?;
    let mut workbook = BytesStart::new("workbook");
    workbook.push_attribute(("xmlns", MAIN_NS));
    workbook.push_attribute(("xmlns:r", REL_NS));
    writer.write_event(Event::Start(workbook))?;
    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    for (position, name) in sheet_names.iter().enumerate() {
        let sheet_id = (position + 1).to_string();
        let rel_id = format!("rId{}", position + 1);
        write_empty(
            &mut writer,
            "sheet",
            &[
                ("name", name.as_str()),
                ("sheetId", sheet_id.as_str()),
                ("r:id", rel_id.as_str()),
            ],
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;
    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner())
}

fn workbook_rels_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut writer = new_document()?;
    let mut rels = BytesStart::new("Relationships");
    rels.push_attribute(("xmlns", PACKAGE_REL_NS));
    writer.write_event(Event::Start(rels))?;
    for number in 1..=sheet_count {
        let rel_id = format!("rId{number}");
        let target = format!("worksheets/sheet{number}.xml");
        write_empty(
            &mut writer,
            "Relationship",
            &[
                ("Id", rel_id.as_str()),
                ("Type", WORKSHEET_REL),
                ("Target", target.as_str()),
            ],
        )?;
    }
    writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(writer.into_inner())
}

fn worksheet_xml(rows: &[Vec<Cell>]) -> Result<Vec<u8>> {
    let mut writer = new_document()?;
    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", MAIN_NS));
    writer.write_event(Event::Start(worksheet))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (row_index, row) in rows.iter().enumerate() {
        let row_number = (row_index + 1).to_string();
        let mut row_start = BytesStart::new("row");
        row_start.push_attribute(("r", row_number.as_str()));
        writer.write_event(Event::Start(row_start))?;
        for (column_index, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(column_index), row_number);
            write_cell(&mut writer, &reference, cell)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

fn write_cell<W: Write>(writer: &mut Writer<W>, reference: &str, cell: &Cell) -> Result<()> {
    match cell {
        Cell::Empty => Ok(()),
        Cell::Number(number) => {
            let mut start = BytesStart::new("c");
            start.push_attribute(("r", reference));
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "v", number)?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
            Ok(())
        }
        Cell::Text(text) => {
            let text = xml_safe(text);
            let mut start = BytesStart::new("c");
            start.push_attribute(("r", reference));
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            if text.trim() != text {
                t.push_attribute(("xml:space", "preserve"));
            }
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
            Ok(())
        }
    }
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_empty<W: Write>(writer: &mut Writer<W>, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|ch| !ch.is_control() || matches!(ch, '\t' | '\n' | '\r'))
        .collect()
}

/// Zero-based column index to spreadsheet letters (`0` → `A`, `26` → `AA`).
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push(b'A' + offset as u8);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Make a valid sheet name that differs (case-insensitively) from `used`.
pub fn unique_sheet_name(name: &str, used: &[String]) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            ch => ch,
        })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base = if cleaned.is_empty() { "Sheet" } else { cleaned };

    let taken = |candidate: &str| {
        used.iter()
            .any(|existing| existing.eq_ignore_ascii_case(candidate))
    };
    let first = truncate_chars(base, MAX_SHEET_NAME_LEN);
    if !taken(&first) {
        return first;
    }
    let mut counter = 2usize;
    loop {
        let suffix = format!(" ({counter})");
        let room = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        let candidate = format!("{}{suffix}", truncate_chars(base, room));
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
