use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::arith::auto_evaluate;
use crate::table_parse::reconcile_rows;

/// How the column names of a [`Table`] were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableOrigin {
    /// A line containing a header keyword named the columns.
    DetectedHeader,
    /// No header line was found; columns are `Column 1..N`.
    GeneratedHeader,
    /// No row had column structure; one `Extracted Text` column.
    TextFallback,
    /// Columns supplied by a vision model response.
    Structured,
    /// Column count declared by the user.
    Manual,
    /// Nothing survived preprocessing.
    Empty,
}

/// A rectangular grid of string cells.
///
/// Every row holds exactly `columns().len()` cells. Constructors and
/// mutators pad or truncate rows to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TableParts")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    origin: TableOrigin,
}

#[derive(Deserialize)]
struct TableParts {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
    origin: TableOrigin,
}

impl From<TableParts> for Table {
    fn from(parts: TableParts) -> Self {
        Self::new(parts.columns, parts.rows, parts.origin)
    }
}

impl Table {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>, origin: TableOrigin) -> Self {
        let rows = reconcile_rows(rows, columns.len());
        Self {
            columns,
            rows,
            origin,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            origin: TableOrigin::Empty,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn origin(&self) -> TableOrigin {
        self.origin
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.columns, self.rows)
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    /// Replaces one cell. Returns `false` when the coordinates are outside
    /// the grid.
    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<String>) -> bool {
        match self.rows.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            Some(cell) => {
                *cell = value.into();
                true
            }
            None => false,
        }
    }

    pub fn push_blank_row(&mut self) {
        self.rows.push(vec![String::new(); self.columns.len()]);
    }

    pub fn remove_row(&mut self, row: usize) -> Option<Vec<String>> {
        (row < self.rows.len()).then(|| self.rows.remove(row))
    }

    #[must_use]
    pub fn is_quantity_column(&self, column: usize) -> bool {
        self.columns.get(column).is_some_and(|name| {
            let lowered = name.to_lowercase();
            lowered.contains("qty") || lowered.contains("quantity")
        })
    }

    /// Runs arithmetic auto-evaluation over every quantity-like column.
    pub fn evaluate_quantity_columns(&mut self) {
        let targets = (0..self.columns.len())
            .filter(|&column| self.is_quantity_column(column))
            .collect::<Vec<_>>();
        if targets.is_empty() {
            return;
        }

        for row in &mut self.rows {
            for &column in &targets {
                row[column] = auto_evaluate(&row[column]);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Display for ImageSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (width, height) = spec
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("invalid image size '{spec}', expected WIDTHxHEIGHT"))?;
        let width: u32 = width
            .trim()
            .parse()
            .map_err(|_| format!("invalid image width: '{}'", width.trim()))?;
        let height: u32 = height
            .trim()
            .parse()
            .map_err(|_| format!("invalid image height: '{}'", height.trim()))?;
        if width == 0 || height == 0 {
            return Err("image dimensions must be positive".to_string());
        }
        Ok(Self { width, height })
    }
}

/// Describes the run that produced a table; exported as a second worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub source_name: String,
    pub extracted_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
}

impl RunMetadata {
    pub const DATE_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    #[must_use]
    pub fn new(source_name: impl Into<String>, extracted_at: NaiveDateTime) -> Self {
        Self {
            source_name: source_name.into(),
            extracted_at,
            image_size: None,
        }
    }

    #[must_use]
    pub fn with_image_size(mut self, image_size: ImageSize) -> Self {
        self.image_size = Some(image_size);
        self
    }

    /// `(label, value)` pairs in worksheet order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, String); 3] {
        [
            ("Source File", self.source_name.clone()),
            (
                "Extraction Date",
                self.extracted_at.format(Self::DATE_FORMAT).to_string(),
            ),
            (
                "Image Size",
                self.image_size.map(|size| size.to_string()).unwrap_or_default(),
            ),
        ]
    }
}
