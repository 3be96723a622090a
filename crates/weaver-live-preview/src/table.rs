//! Pipe table detection.
//!
//! Tables are recognised textually: a header line, a separator line whose
//! cells all match `:?-+:?`, then data lines until the first line without a
//! pipe. A malformed separator means there is no table.

use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("valid separator regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    fn from_separator(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        }
    }

    pub fn as_css(self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }
}

/// A parsed table. Identity is the raw source text only.
#[derive(Debug, Clone, Eq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub alignments: Vec<Alignment>,
    /// Data rows, each padded or truncated to the header width.
    pub rows: Vec<Vec<String>>,
    pub raw: String,
}

impl PartialEq for TableData {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Hash for TableData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl TableData {
    pub fn alignment(&self, column: usize) -> Alignment {
        self.alignments.get(column).copied().unwrap_or_default()
    }
}

/// A table found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// From the start of the header line to the end of the last data line,
    /// line break excluded.
    pub range: Range<usize>,
    pub data: TableData,
}

/// Split a table line into trimmed cells on unescaped pipes. One leading and
/// one trailing pipe are dropped.
pub fn split_cells(line: &str) -> Vec<String> {
    let mut line = line.trim();
    if let Some(rest) = line.strip_prefix('|') {
        line = rest;
    }
    if line.ends_with('|') && !line.ends_with("\\|") {
        line = &line[..line.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn parse_separator(line: &str) -> Option<Vec<Alignment>> {
    if !line.contains('-') {
        return None;
    }
    split_cells(line)
        .iter()
        .map(|cell| {
            SEPARATOR_CELL
                .is_match(cell)
                .then(|| Alignment::from_separator(cell))
        })
        .collect()
}

fn is_table_line(line: &str) -> bool {
    !line.trim().is_empty() && line.contains('|')
}

/// Find every table in `source`. `skip` reports byte offsets (line starts)
/// that lie inside code and must not start a table.
pub fn find_tables(source: &str, skip: impl Fn(usize) -> bool) -> Vec<TableBlock> {
    let lines: Vec<(usize, &str)> = line_spans(source).collect();
    let mut tables = Vec::new();
    let mut i = 0;

    while i + 1 < lines.len() {
        let (header_start, header) = lines[i];
        let (_, separator) = lines[i + 1];
        if !is_table_line(header) || skip(header_start) {
            i += 1;
            continue;
        }
        let headers = split_cells(header);
        let Some(alignments) = parse_separator(separator) else {
            i += 1;
            continue;
        };
        if alignments.len() != headers.len() {
            i += 1;
            continue;
        }

        let mut end_line = i + 1;
        let mut rows = Vec::new();
        while end_line + 1 < lines.len() && is_table_line(lines[end_line + 1].1) {
            end_line += 1;
            let mut row = split_cells(lines[end_line].1);
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        let (last_start, last) = lines[end_line];
        let range = header_start..last_start + last.len();
        tables.push(TableBlock {
            data: TableData {
                headers,
                alignments,
                rows,
                raw: source[range.clone()].to_string(),
            },
            range,
        });
        i = end_line + 1;
    }

    tracing::trace!(
        target: "weaver::live_preview::table",
        count = tables.len(),
        "found tables"
    );
    tables
}

/// Lines of `source` with their start offsets, line breaks excluded.
pub(crate) fn line_spans(source: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    source.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        (start, line)
    })
}
