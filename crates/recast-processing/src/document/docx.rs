//! DOCX reading: `word/document.xml` into paragraphs and tables, rendered as HTML or
//! plain text.

use recast_core::ConversionError;

use crate::document::package::OoxmlPackage;
use crate::document::text::{escape_html, html_document};
use crate::document::xml::{XmlError, XmlEvent, XmlReader};

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone, PartialEq)]
enum Run {
    Text { text: String, bold: bool, italic: bool },
    Break,
    Tab,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Paragraph {
    style: Option<String>,
    is_list_item: bool,
    runs: Vec<Run>,
}

impl Paragraph {
    /// `Heading1`..`Heading6` (or `Title`) as a heading level.
    fn heading_level(&self) -> Option<u8> {
        let style = self.style.as_deref()?.to_ascii_lowercase();
        if style == "title" {
            return Some(1);
        }
        style
            .strip_prefix("heading")
            .and_then(|n| n.trim().parse::<u8>().ok())
            .filter(|level| (1..=6).contains(level))
    }

    fn plain_text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text { text, .. } => out.push_str(text),
                Run::Break => out.push('\n'),
                Run::Tab => out.push('\t'),
            }
        }
        out
    }

    fn inline_html(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                Run::Text { text, bold, italic } => {
                    let mut html = escape_html(text);
                    if *italic {
                        html = format!("<em>{}</em>", html);
                    }
                    if *bold {
                        html = format!("<strong>{}</strong>", html);
                    }
                    out.push_str(&html);
                }
                Run::Break => out.push_str("<br />"),
                Run::Tab => out.push('\t'),
            }
        }
        out
    }

    fn is_empty(&self) -> bool {
        self.runs.iter().all(|run| match run {
            Run::Text { text, .. } => text.is_empty(),
            Run::Break | Run::Tab => false,
        })
    }
}

type Cell = Vec<Paragraph>;
type Row = Vec<Cell>;

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Paragraph(Paragraph),
    Table(Vec<Row>),
}

/// Parsed body of a DOCX file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxDocument {
    blocks: Vec<Block>,
}

#[derive(Default)]
struct RunState {
    active: bool,
    in_properties: bool,
    in_text: bool,
    bold: bool,
    italic: bool,
}

/// `w:b`, `w:i` and friends are on unless `w:val` turns them off.
fn toggle_on(value: Option<&str>) -> bool {
    !matches!(value, Some("0") | Some("false") | Some("off"))
}

impl DocxDocument {
    pub fn parse(data: &[u8]) -> Result<Self, ConversionError> {
        let mut package = OoxmlPackage::open(data, "DOCX")?;
        let xml = package.required_part(DOCUMENT_PART)?;
        Self::from_document_xml(&xml).map_err(|e| package.xml_error(DOCUMENT_PART, e))
    }

    fn from_document_xml(xml: &str) -> Result<Self, XmlError> {
        let mut blocks = Vec::new();
        let mut tables: Vec<Vec<Row>> = Vec::new();
        let mut paragraph: Option<Paragraph> = None;
        let mut in_paragraph_properties = false;
        let mut run = RunState::default();

        for event in XmlReader::new(xml) {
            match event? {
                XmlEvent::Start(el) => match el.name {
                    "p" => paragraph = Some(Paragraph::default()),
                    "pPr" => in_paragraph_properties = true,
                    "pStyle" if in_paragraph_properties => {
                        if let Some(p) = paragraph.as_mut() {
                            p.style = el.attr("val").map(str::to_string);
                        }
                    }
                    "numPr" if in_paragraph_properties => {
                        if let Some(p) = paragraph.as_mut() {
                            p.is_list_item = true;
                        }
                    }
                    "r" => {
                        run = RunState {
                            active: true,
                            ..Default::default()
                        }
                    }
                    "rPr" if run.active => run.in_properties = true,
                    "b" if run.in_properties => run.bold = toggle_on(el.attr("val")),
                    "i" if run.in_properties => run.italic = toggle_on(el.attr("val")),
                    "t" if run.active => run.in_text = true,
                    "br" | "cr" if run.active => push_run(&mut paragraph, Run::Break),
                    "tab" if run.active && !in_paragraph_properties => {
                        push_run(&mut paragraph, Run::Tab)
                    }
                    "tbl" => tables.push(Vec::new()),
                    "tr" => {
                        if let Some(table) = tables.last_mut() {
                            table.push(Vec::new());
                        }
                    }
                    "tc" => {
                        if let Some(row) = tables.last_mut().and_then(|t| t.last_mut()) {
                            row.push(Vec::new());
                        }
                    }
                    _ => {}
                },
                XmlEvent::End(name) => match name {
                    "pPr" => in_paragraph_properties = false,
                    "rPr" => run.in_properties = false,
                    "t" => run.in_text = false,
                    "r" => run = RunState::default(),
                    "p" => {
                        if let Some(p) = paragraph.take() {
                            match current_cell(&mut tables) {
                                Some(cell) => cell.push(p),
                                None => blocks.push(Block::Paragraph(p)),
                            }
                        }
                    }
                    "tbl" => {
                        if let Some(rows) = tables.pop() {
                            match current_cell(&mut tables) {
                                // Nested tables are flattened into the enclosing cell.
                                Some(cell) => cell.extend(rows.into_iter().flatten().flatten()),
                                None => blocks.push(Block::Table(rows)),
                            }
                        }
                    }
                    _ => {}
                },
                XmlEvent::Text(text) if run.in_text => push_run(
                    &mut paragraph,
                    Run::Text {
                        text,
                        bold: run.bold,
                        italic: run.italic,
                    },
                ),
                XmlEvent::Text(_) => {}
            }
        }

        Ok(Self { blocks })
    }

    /// Structured HTML: headings, paragraphs, emphasis, line breaks, bullet lists and
    /// tables, wrapped in the shared document shell.
    pub fn to_html(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut in_list = false;

        for block in &self.blocks {
            let is_list_item = matches!(block, Block::Paragraph(p) if p.is_list_item);
            if in_list && !is_list_item {
                lines.push("</ul>".to_string());
                in_list = false;
            }

            match block {
                Block::Paragraph(p) if p.is_list_item => {
                    if !in_list {
                        lines.push("<ul>".to_string());
                        in_list = true;
                    }
                    lines.push(format!("<li>{}</li>", p.inline_html()));
                }
                Block::Paragraph(p) if p.is_empty() => {}
                Block::Paragraph(p) => lines.push(paragraph_html(p)),
                Block::Table(rows) => {
                    lines.push("<table>".to_string());
                    for row in rows {
                        let cells: String = row
                            .iter()
                            .map(|cell| {
                                let inner: String = cell
                                    .iter()
                                    .filter(|p| !p.is_empty())
                                    .map(paragraph_html)
                                    .collect();
                                format!("<td>{}</td>", inner)
                            })
                            .collect();
                        lines.push(format!("<tr>{}</tr>", cells));
                    }
                    lines.push("</table>".to_string());
                }
            }
        }

        if in_list {
            lines.push("</ul>".to_string());
        }

        html_document(&lines.join("\n"))
    }

    /// Raw text: every paragraph (table cells included) followed by a blank line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for paragraph in self.paragraphs() {
            out.push_str(&paragraph.plain_text());
            out.push_str("\n\n");
        }
        out
    }

    fn paragraphs(&self) -> Vec<&Paragraph> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => out.push(p),
                Block::Table(rows) => out.extend(rows.iter().flatten().flatten()),
            }
        }
        out
    }
}

fn paragraph_html(p: &Paragraph) -> String {
    match p.heading_level() {
        Some(level) => format!("<h{0}>{1}</h{0}>", level, p.inline_html()),
        None => format!("<p>{}</p>", p.inline_html()),
    }
}

fn push_run(paragraph: &mut Option<Paragraph>, run: Run) {
    if let Some(p) = paragraph.as_mut() {
        p.runs.push(run);
    }
}

fn current_cell(tables: &mut [Vec<Row>]) -> Option<&mut Cell> {
    let table = tables.last_mut()?;
    if table.is_empty() {
        table.push(Vec::new());
    }
    let row = table.last_mut()?;
    if row.is_empty() {
        row.push(Vec::new());
    }
    row.last_mut()
}
