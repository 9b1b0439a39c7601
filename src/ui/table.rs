//! The job status table: a leaf view over already-computed job data.
//!
//! The table is a pure function of its inputs. `content()` builds the
//! view model (header cells, body rows, optional overflow row) that the
//! ratatui render maps onto widgets, and mouse clicks on the header
//! dispatch the optional per-column clear callbacks.

use std::collections::HashMap;

use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::format::NumberFormat;
use crate::jobs::JobRecord;

/// A caller-defined extra column: a display name (stable key) and a
/// function deriving the cell value from a job record.
pub struct AdditionalColumn {
    pub display_name: String,
    formatter: Box<dyn Fn(&JobRecord) -> String>,
}

impl AdditionalColumn {
    pub fn new(
        display_name: impl Into<String>,
        formatter: impl Fn(&JobRecord) -> String + 'static,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            formatter: Box::new(formatter),
        }
    }

    pub fn value(&self, job: &JobRecord) -> String {
        (self.formatter)(job)
    }
}

pub type ClearHandler<'a> = Box<dyn Fn() + 'a>;
pub type ClearColumnHandler<'a> = Box<dyn Fn(&str) + 'a>;

/// Inputs for one render of the job status table.
///
/// `total_job_count` may exceed `jobs_to_render.len()`; the difference
/// is reported in the overflow row. The reverse is treated as a caller
/// error and clamped. Each clear callback, when supplied, puts a clear
/// affordance on its header cell; the additional-column callback is
/// shared by all additional columns and receives the column's display
/// name.
pub struct JobStatusTable<'a> {
    pub jobs_to_render: &'a [JobRecord],
    pub total_job_count: usize,
    pub additional_columns: &'a [AdditionalColumn],
    pub show_status: bool,
    pub job_status: &'a HashMap<String, String>,
    pub number_format: &'a NumberFormat,
    pub on_clear_job_id: Option<ClearHandler<'a>>,
    pub on_clear_queue: Option<ClearHandler<'a>>,
    pub on_clear_job_set: Option<ClearHandler<'a>>,
    pub on_clear_additional_column: Option<ClearColumnHandler<'a>>,
    pub on_clear_status: Option<ClearHandler<'a>>,
}

/// One header cell: its title and whether it carries a clear affordance.
#[derive(Debug, PartialEq, Eq)]
pub struct HeaderCell {
    pub title: String,
    pub clearable: bool,
}

/// One body row, keyed by job id for stable identity.
#[derive(Debug, PartialEq, Eq)]
pub struct BodyRow {
    pub key: String,
    pub cells: Vec<String>,
}

/// The fully computed table: what gets drawn, independent of how.
#[derive(Debug)]
pub struct TableContent {
    pub header: Vec<HeaderCell>,
    pub rows: Vec<BodyRow>,
    pub overflow: Option<String>,
}

impl<'a> JobStatusTable<'a> {
    pub fn column_count(&self) -> usize {
        3 + self.additional_columns.len() + usize::from(self.show_status)
    }

    /// Build the view model for the current inputs.
    pub fn content(&self) -> TableContent {
        let mut header = vec![
            HeaderCell {
                title: "Job ID".to_string(),
                clearable: self.on_clear_job_id.is_some(),
            },
            HeaderCell {
                title: "Queue".to_string(),
                clearable: self.on_clear_queue.is_some(),
            },
            HeaderCell {
                title: "Job Set".to_string(),
                clearable: self.on_clear_job_set.is_some(),
            },
        ];
        for column in self.additional_columns {
            header.push(HeaderCell {
                title: column.display_name.clone(),
                clearable: self.on_clear_additional_column.is_some(),
            });
        }
        if self.show_status {
            header.push(HeaderCell {
                title: "Status".to_string(),
                clearable: self.on_clear_status.is_some(),
            });
        }

        let rows = self
            .jobs_to_render
            .iter()
            .map(|job| {
                let mut cells = vec![job.job_id.clone(), job.queue.clone(), job.job_set.clone()];
                for column in self.additional_columns {
                    cells.push(column.value(job));
                }
                if self.show_status {
                    cells.push(
                        self.job_status
                            .get(&job.job_id)
                            .cloned()
                            .unwrap_or_default(),
                    );
                }
                BodyRow {
                    key: job.job_id.clone(),
                    cells,
                }
            })
            .collect();

        let overflow = (self.total_job_count > self.jobs_to_render.len()).then(|| {
            let hidden = (self.total_job_count - self.jobs_to_render.len()) as u64;
            format!("And {} more jobs...", self.number_format.format(hidden))
        });

        TableContent {
            header,
            rows,
            overflow,
        }
    }

    /// Invoke the clear callback for the given column index, if any.
    /// Returns whether a callback fired.
    pub fn trigger_clear(&self, index: usize) -> bool {
        let additional = self.additional_columns.len();
        match index {
            0 => fire(&self.on_clear_job_id),
            1 => fire(&self.on_clear_queue),
            2 => fire(&self.on_clear_job_set),
            i if i < 3 + additional => match &self.on_clear_additional_column {
                Some(callback) => {
                    callback(&self.additional_columns[i - 3].display_name);
                    true
                }
                None => false,
            },
            i if self.show_status && i == 3 + additional => fire(&self.on_clear_status),
            _ => false,
        }
    }

    /// Resolve a left click against the table drawn in `area`. Clicks on
    /// the header row of a clearable column fire its clear callback;
    /// everything else is ignored. Returns whether a callback fired.
    pub fn handle_click(&self, area: Rect, x: u16, y: u16) -> bool {
        let inner = area.inner(Margin::new(1, 1));
        if inner.height == 0 || y != inner.y {
            return false;
        }
        match self.column_at(inner, x) {
            Some(index) => self.trigger_clear(index),
            None => false,
        }
    }

    /// Which column a horizontal position falls into, using the same
    /// constraints the render uses.
    fn column_at(&self, inner: Rect, x: u16) -> Option<usize> {
        self.column_layout(inner)
            .iter()
            .position(|col| x >= col.x && x < col.x + col.width)
    }

    fn column_widths(&self) -> Vec<Constraint> {
        vec![Constraint::Ratio(1, self.column_count() as u32); self.column_count()]
    }

    fn column_layout(&self, inner: Rect) -> Vec<Rect> {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints(self.column_widths())
            .spacing(1)
            .split(inner)
            .to_vec()
    }

    /// Draw the table. `selected` is an index into `jobs_to_render`.
    pub fn render(&self, f: &mut Frame, area: Rect, selected: Option<usize>) {
        let content = self.content();

        let block = Block::default()
            .title(Span::styled(
                " Jobs ",
                Style::default()
                    .fg(super::accent())
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(super::accent()));

        let inner = block.inner(area);
        f.render_widget(block, area);

        // Last inner line is reserved for the overflow row
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let header_row = Row::new(
            content
                .header
                .iter()
                .map(|cell| {
                    let mut spans = vec![Span::styled(
                        cell.title.clone(),
                        Style::default().fg(super::header()),
                    )];
                    if cell.clearable {
                        spans.push(Span::styled(" ✕", Style::default().fg(super::accent())));
                    }
                    Cell::from(Line::from(spans))
                })
                .collect::<Vec<_>>(),
        );

        let status_index = self.show_status.then(|| self.column_count() - 1);
        let body_rows: Vec<Row> = content
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells: Vec<Cell> = row
                    .cells
                    .iter()
                    .enumerate()
                    .map(|(col, value)| {
                        let style = if Some(col) == status_index {
                            Style::default().fg(status_color(value))
                        } else {
                            Style::default().fg(super::text())
                        };
                        Cell::from(Span::styled(value.clone(), style))
                    })
                    .collect();

                let row_style = if selected == Some(i) {
                    Style::default().bg(super::bg_selected()).fg(super::text())
                } else {
                    Style::default()
                };
                Row::new(cells).style(row_style)
            })
            .collect();

        let table = Table::new(body_rows, self.column_widths())
            .column_spacing(1)
            .header(header_row);
        f.render_widget(table, chunks[0]);

        if let Some(overflow) = &content.overflow {
            let line = Paragraph::new(Span::styled(
                overflow.clone(),
                Style::default().fg(super::text_dim()),
            ));
            f.render_widget(line, chunks[1]);
        }
    }
}

fn fire(callback: &Option<ClearHandler>) -> bool {
    match callback {
        Some(callback) => {
            callback();
            true
        }
        None => false,
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "Failed" | "Cancelled" | "Preempted" => super::danger(),
        "Succeeded" | "Completed" => super::success(),
        "" => super::text_dim(),
        _ => super::text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn job(id: &str) -> JobRecord {
        JobRecord {
            job_id: id.to_string(),
            queue: format!("{id}-queue"),
            job_set: format!("{id}-set"),
            owner: "alice".to_string(),
            priority: 3,
            submitted: 0,
        }
    }

    fn owner_column() -> AdditionalColumn {
        AdditionalColumn::new("Owner", |j: &JobRecord| j.owner.clone())
    }

    fn table<'a>(
        jobs: &'a [JobRecord],
        total: usize,
        columns: &'a [AdditionalColumn],
        show_status: bool,
        status: &'a HashMap<String, String>,
        number_format: &'a NumberFormat,
    ) -> JobStatusTable<'a> {
        JobStatusTable {
            jobs_to_render: jobs,
            total_job_count: total,
            additional_columns: columns,
            show_status,
            job_status: status,
            number_format,
            on_clear_job_id: None,
            on_clear_queue: None,
            on_clear_job_set: None,
            on_clear_additional_column: None,
            on_clear_status: None,
        }
    }

    #[test]
    fn test_header_cell_count() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();

        let columns = [owner_column(), AdditionalColumn::new("Priority", |_| String::new())];
        let with_status = table(&jobs, 1, &columns, true, &status, &fmt);
        assert_eq!(with_status.content().header.len(), 3 + 2 + 1);
        assert_eq!(with_status.column_count(), 6);

        let without_status = table(&jobs, 1, &columns[..1], false, &status, &fmt);
        assert_eq!(without_status.content().header.len(), 3 + 1);
    }

    #[test]
    fn test_header_titles_in_fixed_order() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let columns = [owner_column()];

        let content = table(&jobs, 1, &columns, true, &status, &fmt).content();
        let titles: Vec<&str> = content.header.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, ["Job ID", "Queue", "Job Set", "Owner", "Status"]);
    }

    #[test]
    fn test_row_count_and_overflow() {
        let jobs = [job("j1"), job("j2")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();

        let exact = table(&jobs, 2, &[], false, &status, &fmt).content();
        assert_eq!(exact.rows.len(), 2);
        assert!(exact.overflow.is_none());

        let truncated = table(&jobs, 10, &[], false, &status, &fmt).content();
        assert_eq!(truncated.rows.len(), 2);
        assert_eq!(truncated.overflow.as_deref(), Some("And 8 more jobs..."));
    }

    #[test]
    fn test_single_job_with_hidden_remainder() {
        // One rendered job out of five, no extra columns, status hidden
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();

        let content = table(&jobs, 5, &[], false, &status, &fmt).content();
        assert_eq!(content.rows.len(), 1);
        assert_eq!(content.rows[0].key, "j1");
        assert_eq!(content.overflow.as_deref(), Some("And 4 more jobs..."));
    }

    #[test]
    fn test_overflow_uses_number_formatting() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::new(Some(','));

        let content = table(&jobs, 2001, &[], false, &status, &fmt).content();
        assert_eq!(content.overflow.as_deref(), Some("And 2,000 more jobs..."));
    }

    #[test]
    fn test_missing_status_renders_empty() {
        let jobs = [job("j1"), job("j2")];
        let mut status = HashMap::new();
        status.insert("j1".to_string(), "Running".to_string());
        let fmt = NumberFormat::default();

        let content = table(&jobs, 2, &[], true, &status, &fmt).content();
        assert_eq!(content.rows[0].cells.last().map(String::as_str), Some("Running"));
        assert_eq!(content.rows[1].cells.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_additional_column_cells_use_formatter() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let columns = [owner_column()];

        let content = table(&jobs, 1, &columns, false, &status, &fmt).content();
        assert_eq!(content.rows[0].cells, vec!["j1", "j1-queue", "j1-set", "alice"]);
    }

    #[test]
    fn test_clearable_flags_follow_supplied_callbacks() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let columns = [owner_column()];

        let mut t = table(&jobs, 1, &columns, true, &status, &fmt);
        t.on_clear_queue = Some(Box::new(|| {}));

        let flags: Vec<bool> = t.content().header.iter().map(|h| h.clearable).collect();
        assert_eq!(flags, [false, true, false, false, false]);
    }

    #[test]
    fn test_trigger_clear_dispatches_fixed_columns() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let fired: RefCell<Vec<&str>> = RefCell::new(Vec::new());

        let mut t = table(&jobs, 1, &[], true, &status, &fmt);
        t.on_clear_job_id = Some(Box::new(|| fired.borrow_mut().push("job_id")));
        t.on_clear_queue = Some(Box::new(|| fired.borrow_mut().push("queue")));
        t.on_clear_job_set = Some(Box::new(|| fired.borrow_mut().push("job_set")));
        t.on_clear_status = Some(Box::new(|| fired.borrow_mut().push("status")));

        assert!(t.trigger_clear(0));
        assert!(t.trigger_clear(1));
        assert!(t.trigger_clear(2));
        assert!(t.trigger_clear(3));
        assert_eq!(*fired.borrow(), ["job_id", "queue", "job_set", "status"]);
    }

    #[test]
    fn test_trigger_clear_passes_additional_column_name() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let columns = [owner_column(), AdditionalColumn::new("Priority", |_| String::new())];
        let fired: RefCell<Vec<String>> = RefCell::new(Vec::new());

        let mut t = table(&jobs, 1, &columns, false, &status, &fmt);
        t.on_clear_additional_column = Some(Box::new(|name| fired.borrow_mut().push(name.to_string())));

        assert!(t.trigger_clear(3));
        assert!(t.trigger_clear(4));
        assert_eq!(*fired.borrow(), ["Owner", "Priority"]);
    }

    #[test]
    fn test_trigger_clear_without_callback_is_noop() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let columns = [owner_column()];

        let t = table(&jobs, 1, &columns, true, &status, &fmt);
        for index in 0..t.column_count() {
            assert!(!t.trigger_clear(index));
        }
        // Out-of-range index is ignored as well
        assert!(!t.trigger_clear(t.column_count()));
    }

    #[test]
    fn test_status_index_not_clearable_when_hidden() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let fired = RefCell::new(0);

        let mut t = table(&jobs, 1, &[], false, &status, &fmt);
        t.on_clear_status = Some(Box::new(|| *fired.borrow_mut() += 1));

        // Index 3 would be Status, but the column is hidden
        assert!(!t.trigger_clear(3));
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_header_click_fires_matching_column() {
        let jobs = [job("j1")];
        let status = HashMap::new();
        let fmt = NumberFormat::default();
        let fired: RefCell<Vec<&str>> = RefCell::new(Vec::new());

        let mut t = table(&jobs, 1, &[], false, &status, &fmt);
        t.on_clear_job_id = Some(Box::new(|| fired.borrow_mut().push("job_id")));
        t.on_clear_job_set = Some(Box::new(|| fired.borrow_mut().push("job_set")));

        let area = Rect::new(0, 0, 62, 10);
        // Header row sits just inside the top border
        assert!(t.handle_click(area, 2, 1));
        // Third of three equal columns
        assert!(t.handle_click(area, 45, 1));
        // Body rows are not clear targets
        assert!(!t.handle_click(area, 2, 3));
        // Border row is ignored
        assert!(!t.handle_click(area, 2, 0));

        assert_eq!(*fired.borrow(), ["job_id", "job_set"]);
    }
}
