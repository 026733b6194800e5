/// Splits a line on tabs, pipes and runs of two or more whitespace
/// characters. Single spaces stay inside the cell.
pub(crate) fn split_line_into_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0_usize;

    for ch in trimmed.chars() {
        if ch == '\t' || ch == '|' {
            flush_cell(&mut current, &mut cells);
            whitespace_run = 0;
            continue;
        }

        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run >= 2 {
                flush_cell(&mut current, &mut cells);
                continue;
            }
            current.push(' ');
            continue;
        }

        whitespace_run = 0;
        current.push(ch);
    }

    flush_cell(&mut current, &mut cells);
    cells
}

fn flush_cell(current: &mut String, cells: &mut Vec<String>) {
    let cell = current.trim();
    if !cell.is_empty() {
        cells.push(cell.to_string());
    }
    current.clear();
}

pub(crate) fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stray OCR punctuation: at most two characters, all of them `.`, `-` or `_`.
pub(crate) fn is_punctuation_noise(line: &str) -> bool {
    line.chars().count() <= 2 && line.chars().all(|ch| matches!(ch, '.' | '-' | '_'))
}

pub(crate) fn reconcile_row(mut row: Vec<String>, width: usize) -> Vec<String> {
    row.resize(width, String::new());
    row
}

pub(crate) fn reconcile_rows(rows: Vec<Vec<String>>, width: usize) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|row| reconcile_row(row, width))
        .collect()
}

pub(crate) fn max_width(rows: &[Vec<String>]) -> usize {
    rows.iter().map(Vec::len).max().unwrap_or(0)
}

pub(crate) fn generated_columns(width: usize) -> Vec<String> {
    (1..=width).map(|index| format!("Column {index}")).collect()
}
