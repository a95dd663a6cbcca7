use super::types::{PdfTable, TableRow};

/// Minimum consecutive tabular lines that make up a table.
const MIN_TABLE_ROWS: usize = 2;

/// Minimum cells a line must split into to count as a table row.
const MIN_CELLS: usize = 2;

/// Minimum run of spaces treated as a column gap.
const MIN_SPACE_GAP: usize = 2;

/// A stretch of page text: a plain line, or a run of rows forming a table.
enum Segment<'a> {
    Line(&'a str),
    Table(PdfTable),
}

/// Walk the page line by line, grouping consecutive tabular lines.
/// Runs shorter than `MIN_TABLE_ROWS` stay plain lines.
fn scan_lines(page_text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut run: Vec<(&str, TableRow)> = Vec::new();

    for line in page_text.lines() {
        match split_row(line) {
            Some(row) => run.push((line, row)),
            None => {
                flush_run(&mut run, &mut segments);
                segments.push(Segment::Line(line));
            }
        }
    }
    flush_run(&mut run, &mut segments);

    segments
}

fn flush_run<'a>(run: &mut Vec<(&'a str, TableRow)>, segments: &mut Vec<Segment<'a>>) {
    if run.len() < MIN_TABLE_ROWS {
        segments.extend(run.drain(..).map(|(line, _)| Segment::Line(line)));
        return;
    }
    let width = run.iter().map(|(_, row)| row.len()).max().unwrap_or(0);
    let table = run
        .drain(..)
        .map(|(_, mut row)| {
            row.resize(width, None);
            row
        })
        .collect();
    segments.push(Segment::Table(table));
}

/// Recover tables from a page's linear text layout.
///
/// A table is a run of at least two consecutive lines that each split into
/// two or more cells. Rows are padded with `None` to the widest row.
pub fn detect_tables(page_text: &str) -> Vec<PdfTable> {
    scan_lines(page_text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Table(table) => Some(table),
            Segment::Line(_) => None,
        })
        .collect()
}

/// Page text with every table run rewritten as pipe-delimited rows.
/// Lines outside tables are kept unchanged and in place.
pub fn render_tables_in_place(page_text: &str) -> String {
    scan_lines(page_text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Table(table) => render_table(&table),
            Segment::Line(line) => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a line into cells, or `None` if it does not look tabular.
///
/// Patterns detected:
/// - Tab-separated: "Test\tResult\tUnits"
/// - Pipe-separated: "Test | Result | Units"
/// - Multi-space aligned: "Hemoglobin    13.8    g/dL"
fn split_row(line: &str) -> Option<TableRow> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cells: TableRow = if trimmed.contains('\t') {
        trimmed.split('\t').map(to_cell).collect()
    } else if trimmed.contains('|') {
        trimmed
            .trim_matches('|')
            .split('|')
            .map(to_cell)
            .collect()
    } else {
        split_on_space_gaps(trimmed)
            .into_iter()
            .map(|c| Some(c.to_string()))
            .collect()
    };

    let filled = cells.iter().filter(|c| c.is_some()).count();
    if cells.len() >= MIN_CELLS && filled >= 1 {
        Some(cells)
    } else {
        None
    }
}

fn to_cell(raw: &str) -> Option<String> {
    let cell = raw.trim();
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Split on runs of `MIN_SPACE_GAP`+ spaces; single spaces stay inside a cell.
fn split_on_space_gaps(text: &str) -> Vec<&str> {
    let mut cells = Vec::new();
    let mut start = 0;
    let mut gap_start: Option<usize> = None;

    for (i, ch) in text.char_indices() {
        if ch == ' ' {
            gap_start.get_or_insert(i);
            continue;
        }
        if let Some(gs) = gap_start.take() {
            if i - gs >= MIN_SPACE_GAP {
                cells.push(&text[start..gs]);
                start = i;
            }
        }
    }
    cells.push(&text[start..]);

    cells
}

/// Render a table as pipe-delimited rows, empty cells as empty strings.
pub fn render_table(table: &PdfTable) -> String {
    table
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
