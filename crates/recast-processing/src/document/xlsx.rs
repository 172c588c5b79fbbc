//! XLSX reading: the first worksheet as a grid of display strings.

use recast_core::ConversionError;

use crate::document::package::OoxmlPackage;
use crate::document::text::{csv_field, escape_html, html_document};
use crate::document::xml::{XmlError, XmlEvent, XmlReader};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const DEFAULT_SHEET_PART: &str = "xl/worksheets/sheet1.xml";
/// Column XFD
const MAX_COLUMNS: usize = 16_384;
const MAX_ROWS: usize = 1_048_576;

#[derive(Debug, thiserror::Error)]
enum SheetError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("cell reference {0} is outside the worksheet grid")]
    OutOfGrid(String),
}

/// First worksheet of a workbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    /// Row-major cells, padded so every row has the same width.
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn parse(data: &[u8]) -> Result<Self, ConversionError> {
        let mut package = OoxmlPackage::open(data, "XLSX")?;

        let sheet_part = first_sheet_part(&mut package)?;
        let shared_strings = match package.part(SHARED_STRINGS_PART)? {
            Some(xml) => {
                parse_shared_strings(&xml).map_err(|e| package.xml_error(SHARED_STRINGS_PART, e))?
            }
            None => Vec::new(),
        };

        let xml = package.required_part(&sheet_part)?;
        let rows = parse_sheet(&xml, &shared_strings).map_err(|e| package.xml_error(&sheet_part, e))?;

        tracing::debug!(
            sheet = %sheet_part,
            rows = rows.len(),
            shared_strings = shared_strings.len(),
            "Worksheet parsed"
        );

        Ok(Self { rows })
    }

    pub fn to_csv(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_html(&self) -> String {
        let mut lines = vec!["<table>".to_string()];
        for row in &self.rows {
            let cells: String = row
                .iter()
                .map(|c| format!("<td>{}</td>", escape_html(c)))
                .collect();
            lines.push(format!("<tr>{}</tr>", cells));
        }
        lines.push("</table>".to_string());
        html_document(&lines.join("\n"))
    }
}

/// Part name of the first sheet in workbook order, via the workbook relationships.
fn first_sheet_part(package: &mut OoxmlPackage<'_>) -> Result<String, ConversionError> {
    let workbook = package.required_part(WORKBOOK_PART)?;
    let relationship_id = first_sheet_relationship(&workbook)
        .map_err(|e| package.xml_error(WORKBOOK_PART, e))?;

    let Some(relationship_id) = relationship_id else {
        return Ok(DEFAULT_SHEET_PART.to_string());
    };

    let target = match package.part(WORKBOOK_RELS_PART)? {
        Some(rels) => relationship_target(&rels, &relationship_id)
            .map_err(|e| package.xml_error(WORKBOOK_RELS_PART, e))?,
        None => None,
    };

    Ok(match target {
        Some(target) => resolve_target(&target),
        None => DEFAULT_SHEET_PART.to_string(),
    })
}

fn first_sheet_relationship(workbook_xml: &str) -> Result<Option<String>, XmlError> {
    for event in XmlReader::new(workbook_xml) {
        if let XmlEvent::Start(el) = event? {
            if el.name == "sheet" {
                return Ok(el.attr("id").map(str::to_string));
            }
        }
    }
    Ok(None)
}

fn relationship_target(rels_xml: &str, id: &str) -> Result<Option<String>, XmlError> {
    for event in XmlReader::new(rels_xml) {
        if let XmlEvent::Start(el) = event? {
            if el.name == "Relationship" && el.attr("Id") == Some(id) {
                return Ok(el.attr("Target").map(str::to_string));
            }
        }
    }
    Ok(None)
}

/// Relationship targets are relative to `xl/` unless absolute within the package.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, XmlError> {
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    for event in XmlReader::new(xml) {
        match event? {
            XmlEvent::Start(el) => match el.name {
                "si" => current = Some(String::new()),
                "rPh" => in_phonetic = true,
                "t" if !in_phonetic => in_text = true,
                _ => {}
            },
            XmlEvent::End(name) => match name {
                "si" => strings.extend(current.take()),
                "rPh" => in_phonetic = false,
                "t" => in_text = false,
                _ => {}
            },
            XmlEvent::Text(text) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            XmlEvent::Text(_) => {}
        }
    }

    Ok(strings)
}

/// Zero-based column index from a cell reference such as `AB12`, or `None` when the
/// reference has no column letters. Columns past XFD are an error.
fn column_index(reference: &str) -> Result<Option<usize>, SheetError> {
    let mut index: Option<usize> = None;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        let next = index
            .unwrap_or(0)
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|i| *i <= MAX_COLUMNS)
            .ok_or_else(|| SheetError::OutOfGrid(reference.to_string()))?;
        index = Some(next);
    }
    Ok(index.map(|i| i - 1))
}

#[derive(Default)]
struct CellState {
    column: usize,
    kind: Option<String>,
    value: String,
    inline: String,
    in_value: bool,
    in_inline_text: bool,
}

impl CellState {
    fn display(&self, shared_strings: &[String]) -> String {
        match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|idx| shared_strings.get(idx))
                .cloned()
                .unwrap_or_default(),
            Some("inlineStr") => self.inline.clone(),
            Some("b") => match self.value.trim() {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                other => other.to_string(),
            },
            _ => self.value.clone(),
        }
    }
}

fn parse_sheet(xml: &str, shared_strings: &[String]) -> Result<Vec<Vec<String>>, SheetError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row_index: Option<usize> = None;
    let mut next_column = 0usize;
    let mut cell: Option<CellState> = None;

    for event in XmlReader::new(xml) {
        match event? {
            XmlEvent::Start(el) => match el.name {
                "row" => {
                    let index = el
                        .attr("r")
                        .and_then(|r| r.parse::<usize>().ok())
                        .filter(|r| *r > 0)
                        .map(|r| r - 1)
                        .unwrap_or_else(|| row_index.map_or(0, |i| i + 1));
                    if index >= MAX_ROWS {
                        return Err(SheetError::OutOfGrid(format!("row {}", index + 1)));
                    }
                    row_index = Some(index);
                    next_column = 0;
                }
                "c" => {
                    let column = match el.attr("r") {
                        Some(reference) => column_index(reference)?.unwrap_or(next_column),
                        None => next_column,
                    };
                    if column >= MAX_COLUMNS {
                        return Err(SheetError::OutOfGrid(format!("column {}", column + 1)));
                    }
                    cell = Some(CellState {
                        column,
                        kind: el.attr("t").map(str::to_string),
                        ..Default::default()
                    });
                }
                "v" => {
                    if let Some(c) = cell.as_mut() {
                        c.in_value = true;
                    }
                }
                "t" => {
                    if let Some(c) = cell.as_mut() {
                        c.in_inline_text = true;
                    }
                }
                _ => {}
            },
            XmlEvent::End(name) => match name {
                "v" => {
                    if let Some(c) = cell.as_mut() {
                        c.in_value = false;
                    }
                }
                "t" => {
                    if let Some(c) = cell.as_mut() {
                        c.in_inline_text = false;
                    }
                }
                "c" => {
                    if let Some(c) = cell.take() {
                        let row = row_index.unwrap_or(0);
                        if rows.len() <= row {
                            rows.resize_with(row + 1, Vec::new);
                        }
                        let cells = &mut rows[row];
                        if cells.len() <= c.column {
                            cells.resize_with(c.column + 1, String::new);
                        }
                        cells[c.column] = c.display(shared_strings);
                        next_column = c.column + 1;
                    }
                }
                _ => {}
            },
            XmlEvent::Text(text) => {
                if let Some(c) = cell.as_mut() {
                    if c.in_value {
                        c.value.push_str(&text);
                    } else if c.in_inline_text {
                        c.inline.push_str(&text);
                    }
                }
            }
        }
    }

    // Drop trailing rows and columns that hold only empty cells, then pad to a rectangle.
    while rows.last().is_some_and(|r| r.iter().all(String::is_empty)) {
        rows.pop();
    }
    let width = rows
        .iter()
        .filter_map(|r| r.iter().rposition(|c| !c.is_empty()))
        .max()
        .map_or(0, |last| last + 1);
    for row in &mut rows {
        row.resize_with(width, String::new);
    }

    Ok(rows)
}
