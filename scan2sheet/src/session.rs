//! Editing session as plain data.
//!
//! A front end keeps a [`SessionState`], sends each user action as a
//! [`SessionEvent`] and renders whatever [`apply`] returns.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arith::auto_evaluate;
use crate::layout::{LayoutMode, TableSource, build_table};
use crate::model::{RunMetadata, Table};
use crate::options::BuildOptions;
use crate::warning::TableWarning;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// OCR text the table was built from; `None` for structured input.
    pub source_text: Option<String>,
    pub table: Option<Table>,
    pub warnings: Vec<TableWarning>,
    pub layout: LayoutMode,
    pub evaluate_quantities: bool,
    pub include_metadata: bool,
    pub metadata: Option<RunMetadata>,
    pub revision: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            source_text: None,
            table: None,
            warnings: Vec::new(),
            layout: LayoutMode::default(),
            evaluate_quantities: true,
            include_metadata: false,
            metadata: None,
            revision: 0,
        }
    }
}

impl SessionState {
    /// Freshly extracted cells are kept as read; only edits are evaluated.
    fn load(mut self, source: TableSource) -> Self {
        let report = build_table(source, &BuildOptions::default());
        self.table = Some(report.table);
        self.warnings = report.warnings;
        self
    }

    /// Metadata to export, if the user asked for it.
    #[must_use]
    pub fn export_metadata(&self) -> Option<&RunMetadata> {
        self.metadata.as_ref().filter(|_| self.include_metadata)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    TextExtracted {
        text: String,
    },
    StructuredReceived {
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    LayoutChanged {
        layout: LayoutMode,
    },
    QuantityEvaluationToggled {
        enabled: bool,
    },
    CellEdited {
        row: usize,
        column: usize,
        value: String,
    },
    RowAdded,
    RowRemoved {
        row: usize,
    },
    MetadataToggled {
        include: bool,
    },
    MetadataSet {
        metadata: RunMetadata,
    },
    Reset,
}

fn edit_cell(mut state: SessionState, row: usize, column: usize, value: String) -> SessionState {
    let evaluate = state.evaluate_quantities;
    if let Some(table) = state.table.as_mut() {
        let value = if evaluate && table.is_quantity_column(column) {
            auto_evaluate(&value)
        } else {
            value
        };
        if !table.set_cell(row, column, value) {
            debug!(row, column, "ignored edit outside the table");
        }
    }
    state
}

/// Returns the state after `event`. `revision` moves forward whenever the
/// state changes.
#[must_use]
pub fn apply(state: SessionState, event: SessionEvent) -> SessionState {
    let before = state.clone();
    let mut next = match event {
        SessionEvent::TextExtracted { text } => {
            let layout = state.layout;
            let mut next = state.load(TableSource::OcrText {
                text: text.clone(),
                layout,
            });
            next.source_text = Some(text);
            next
        }
        SessionEvent::StructuredReceived { headers, rows } => {
            let mut next = state.load(TableSource::Structured { headers, rows });
            next.source_text = None;
            next
        }
        SessionEvent::LayoutChanged { layout } => {
            let mut next = state;
            next.layout = layout;
            match next.source_text.clone() {
                Some(text) => next.load(TableSource::OcrText { text, layout }),
                None => next,
            }
        }
        SessionEvent::QuantityEvaluationToggled { enabled } => {
            let mut next = state;
            next.evaluate_quantities = enabled;
            if enabled {
                if let Some(table) = next.table.as_mut() {
                    table.evaluate_quantity_columns();
                }
            }
            next
        }
        SessionEvent::CellEdited { row, column, value } => edit_cell(state, row, column, value),
        SessionEvent::RowAdded => {
            let mut next = state;
            if let Some(table) = next.table.as_mut() {
                table.push_blank_row();
            }
            next
        }
        SessionEvent::RowRemoved { row } => {
            let mut next = state;
            if let Some(table) = next.table.as_mut() {
                table.remove_row(row);
            }
            next
        }
        SessionEvent::MetadataToggled { include } => SessionState {
            include_metadata: include,
            ..state
        },
        SessionEvent::MetadataSet { metadata } => SessionState {
            metadata: Some(metadata),
            ..state
        },
        SessionEvent::Reset => SessionState {
            revision: state.revision,
            ..SessionState::default()
        },
    };

    next.revision = before.revision;
    if next != before {
        next.revision = before.revision + 1;
    }
    next
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{SessionEvent, SessionState, apply};
    use crate::layout::LayoutMode;
    use crate::model::RunMetadata;

    fn loaded() -> SessionState {
        apply(
            SessionState::default(),
            SessionEvent::TextExtracted {
                text: "Item  Qty  Price\nPen  2  1.50\nInk  1  3.00".to_string(),
            },
        )
    }

    #[test]
    fn text_event_builds_table() {
        let state = loaded();
        let table = state.table.as_ref().expect("table should be built");
        assert_eq!(table.columns(), ["Item", "Qty", "Price"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(state.revision, 1);
    }

    #[test]
    fn quantity_edits_are_evaluated() {
        let state = apply(
            loaded(),
            SessionEvent::CellEdited {
                row: 0,
                column: 1,
                value: "3*4".to_string(),
            },
        );
        let table = state.table.as_ref().expect("table");
        assert_eq!(table.cell(0, 1), Some("12"));
    }

    #[test]
    fn extracted_quantities_are_kept_until_edited() {
        let state = apply(
            SessionState::default(),
            SessionEvent::TextExtracted {
                text: "Item  Qty  Date\nBolts  10-12  x\nNuts  2024-01-02  y".to_string(),
            },
        );
        let table = state.table.as_ref().expect("table should be built");
        assert_eq!(table.cell(0, 1), Some("10-12"));
        assert_eq!(table.cell(1, 1), Some("2024-01-02"));

        let state = apply(
            state,
            SessionEvent::CellEdited {
                row: 0,
                column: 1,
                value: "10+12".to_string(),
            },
        );
        assert_eq!(state.table.as_ref().and_then(|t| t.cell(0, 1)), Some("22"));
    }

    #[test]
    fn other_columns_keep_arithmetic_text() {
        let state = apply(
            loaded(),
            SessionEvent::CellEdited {
                row: 0,
                column: 2,
                value: "1+1".to_string(),
            },
        );
        assert_eq!(state.table.as_ref().and_then(|t| t.cell(0, 2)), Some("1+1"));
    }

    #[test]
    fn out_of_range_edit_leaves_state_unchanged() {
        let state = loaded();
        let next = apply(
            state.clone(),
            SessionEvent::CellEdited {
                row: 9,
                column: 0,
                value: "x".to_string(),
            },
        );
        assert_eq!(next, state);
    }

    #[test]
    fn layout_change_rebuilds_from_source_text() {
        let state = apply(
            loaded(),
            SessionEvent::LayoutChanged {
                layout: LayoutMode::SingleColumn,
            },
        );
        let table = state.table.as_ref().expect("table");
        assert_eq!(table.columns(), ["Extracted Text"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(state.revision, 2);
    }

    #[test]
    fn structured_input_clears_source_text() {
        let state = apply(
            loaded(),
            SessionEvent::StructuredReceived {
                headers: vec!["Description".to_string()],
                rows: vec![vec!["Lamp".to_string()]],
            },
        );
        assert!(state.source_text.is_none());
        let state = apply(
            state,
            SessionEvent::LayoutChanged {
                layout: LayoutMode::SingleCell,
            },
        );
        assert_eq!(
            state.table.as_ref().map(|t| t.columns().to_vec()),
            Some(vec!["Description".to_string()])
        );
    }

    #[test]
    fn rows_can_be_added_and_removed() {
        let state = apply(loaded(), SessionEvent::RowAdded);
        assert_eq!(state.table.as_ref().map(|t| t.row_count()), Some(3));
        let state = apply(state, SessionEvent::RowRemoved { row: 0 });
        let table = state.table.as_ref().expect("table");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, 0), Some("Ink"));
    }

    #[test]
    fn metadata_is_exported_only_when_included() {
        let extracted_at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid timestamp");
        let state = apply(
            loaded(),
            SessionEvent::MetadataSet {
                metadata: RunMetadata::new("invoice.png", extracted_at),
            },
        );
        assert!(state.export_metadata().is_none());
        let state = apply(state, SessionEvent::MetadataToggled { include: true });
        assert_eq!(
            state.export_metadata().map(|m| m.source_name.as_str()),
            Some("invoice.png")
        );
    }

    #[test]
    fn reset_keeps_revision_moving() {
        let state = apply(loaded(), SessionEvent::Reset);
        assert!(state.table.is_none());
        assert_eq!(state.revision, 2);
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"type":"cell_edited","row":0,"column":1,"value":"5+5"}"#)
                .expect("event should parse");
        assert_eq!(
            event,
            SessionEvent::CellEdited {
                row: 0,
                column: 1,
                value: "5+5".to_string(),
            }
        );
    }
}
