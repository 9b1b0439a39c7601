use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::AppConfig;
use crate::format::{self, NumberFormat};
use crate::jobs::{source, JobFilters, JobRecord};
use crate::ui;
use crate::ui::table::{
    AdditionalColumn, ClearColumnHandler, ClearHandler, JobStatusTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// A clear request raised by the table's header affordances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearTarget {
    JobId,
    Queue,
    JobSet,
    Additional(String),
    Status,
}

pub struct App {
    pub popup: Popup,
    pub config: AppConfig,
    pub snapshot_path: PathBuf,

    // Snapshot state
    pub jobs: Vec<JobRecord>,
    pub job_status: HashMap<String, String>,

    // View state
    pub filters: JobFilters,
    pub filtered: Vec<JobRecord>,
    pub selected: usize,
    pub show_status: bool,
    pub columns: Vec<AdditionalColumn>,
    pub number_format: NumberFormat,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    pub last_refresh: Instant,

    // Jobs already reported as failed, to notify only on new failures
    known_failed: HashSet<String>,
}

impl App {
    pub async fn new(config: AppConfig, source_override: Option<PathBuf>) -> Result<Self> {
        let snapshot_path = source_override.unwrap_or_else(|| config.snapshot_path.clone());
        let number_format = NumberFormat::from_grouping(&config.number_grouping);
        let columns = build_columns(&config.additional_columns, &number_format, now_epoch());

        let mut app = Self {
            popup: Popup::None,
            show_status: config.show_status,
            config,
            snapshot_path,

            jobs: Vec::new(),
            job_status: HashMap::new(),

            filters: JobFilters::default(),
            filtered: Vec::new(),
            selected: 0,
            columns,
            number_format,

            status_message: None,
            status_message_time: None,

            last_refresh: Instant::now(),
            known_failed: HashSet::new(),
        };

        match source::load(&app.snapshot_path).await {
            Ok(snapshot) => {
                app.jobs = snapshot.jobs;
                app.job_status = snapshot.status;
                app.known_failed = failed_ids(&app.job_status);
            }
            Err(e) => {
                tracing::warn!("Initial snapshot load failed: {:#}", e);
                app.set_status(format!("Could not load {}: {}", app.snapshot_path.display(), e));
            }
        }

        app.apply_filters();
        Ok(app)
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// The slice of the filtered list to hand the table as
    /// `jobs_to_render`, following the selection.
    pub fn window(&self, capacity: usize) -> (usize, usize) {
        window_bounds(self.filtered.len(), self.selected, capacity)
    }

    /// Build the status table over a window of the filtered jobs. Clear
    /// callbacks are armed for exactly the filters that are active, and
    /// report through `sink` so the caller decides when to apply them.
    pub fn status_table<'a>(
        &'a self,
        jobs_to_render: &'a [JobRecord],
        sink: &'a dyn Fn(ClearTarget),
    ) -> JobStatusTable<'a> {
        JobStatusTable {
            jobs_to_render,
            total_job_count: self.filtered.len(),
            additional_columns: &self.columns,
            show_status: self.show_status,
            job_status: &self.job_status,
            number_format: &self.number_format,
            on_clear_job_id: clear_handler(self.filters.job_id.is_some(), move || {
                sink(ClearTarget::JobId)
            }),
            on_clear_queue: clear_handler(self.filters.queue.is_some(), move || {
                sink(ClearTarget::Queue)
            }),
            on_clear_job_set: clear_handler(self.filters.job_set.is_some(), move || {
                sink(ClearTarget::JobSet)
            }),
            on_clear_additional_column: clear_column_handler(
                !self.filters.additional.is_empty(),
                move |name| sink(ClearTarget::Additional(name.to_string())),
            ),
            on_clear_status: clear_handler(
                self.show_status && self.filters.status.is_some(),
                move || sink(ClearTarget::Status),
            ),
        }
    }

    pub async fn on_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup == Popup::Help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::Enter | KeyCode::Char('q')
            ) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            // Vertical navigation
            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            // Filters from the selected job
            KeyCode::Char('I') => self.filter_selected(ClearTarget::JobId),
            KeyCode::Char('Q') => self.filter_selected(ClearTarget::Queue),
            KeyCode::Char('S') => self.filter_selected(ClearTarget::JobSet),
            KeyCode::Char('T') => self.filter_selected(ClearTarget::Status),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.filter_additional(index);
            }
            KeyCode::Char('u') => {
                self.filters = JobFilters::default();
                self.apply_filters();
                self.set_status("Cleared all filters");
            }

            // View toggles
            KeyCode::Char('s') => {
                self.show_status = !self.show_status;
                self.set_status(if self.show_status {
                    "Status column shown"
                } else {
                    "Status column hidden"
                });
            }

            // Refresh
            KeyCode::Char('R') => self.refresh().await,

            // Help (? or h)
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    /// Left clicks: a header clear affordance fires the matching
    /// callback; a body row moves the selection.
    pub fn on_mouse(&mut self, mouse: MouseEvent, screen: ratatui::layout::Rect) {
        if self.popup != Popup::None || self.jobs.is_empty() {
            return;
        }
        if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
            return;
        }

        let chunks = ui::layout(screen);
        let capacity = ui::table_capacity(chunks.jobs);
        let (start, end) = self.window(capacity);

        let cleared = {
            let pending: RefCell<Vec<ClearTarget>> = RefCell::new(Vec::new());
            let sink = |target: ClearTarget| pending.borrow_mut().push(target);
            let table = self.status_table(&self.filtered[start..end], &sink);
            table.handle_click(chunks.jobs, mouse.column, mouse.row);
            drop(table);
            pending.into_inner()
        };

        if cleared.is_empty() {
            self.select_clicked_row(chunks.jobs, start, end, mouse.row);
        } else {
            for target in cleared {
                self.apply_clear(target);
            }
        }
    }

    fn select_clicked_row(&mut self, jobs_area: ratatui::layout::Rect, start: usize, end: usize, row: u16) {
        // First body row sits below the top border and the header row
        let first_row_y = jobs_area.y + 2;
        if row < first_row_y {
            return;
        }
        let offset = (row - first_row_y) as usize;
        if start + offset < end {
            self.selected = start + offset;
        }
    }

    pub fn apply_clear(&mut self, target: ClearTarget) {
        match &target {
            ClearTarget::JobId => self.filters.job_id = None,
            ClearTarget::Queue => self.filters.queue = None,
            ClearTarget::JobSet => self.filters.job_set = None,
            ClearTarget::Additional(name) => self.filters.clear_additional(name),
            ClearTarget::Status => self.filters.status = None,
        }
        self.apply_filters();
        self.set_status(format!("Cleared {} filter", target_label(&target)));
    }

    fn filter_selected(&mut self, target: ClearTarget) {
        let Some(job) = self.filtered.get(self.selected).cloned() else {
            return;
        };

        match target {
            ClearTarget::JobId => self.filters.job_id = Some(job.job_id.clone()),
            ClearTarget::Queue => self.filters.queue = Some(job.queue.clone()),
            ClearTarget::JobSet => self.filters.job_set = Some(job.job_set.clone()),
            ClearTarget::Status => {
                let status = self.job_status.get(&job.job_id).cloned().unwrap_or_default();
                if status.is_empty() {
                    self.set_status("Selected job has no status");
                    return;
                }
                self.filters.status = Some(status);
            }
            ClearTarget::Additional(_) => return,
        }

        self.apply_filters();
        self.set_status(format!("Filtering by {}", target_label(&target)));
    }

    fn filter_additional(&mut self, index: usize) {
        let Some(job) = self.filtered.get(self.selected).cloned() else {
            return;
        };
        let Some(column) = self.columns.get(index) else {
            return;
        };

        let name = column.display_name.clone();
        let value = column.value(&job);
        self.filters.set_additional(&name, value);
        self.apply_filters();
        self.set_status(format!("Filtering by {}", name));
    }

    fn apply_filters(&mut self) {
        let columns = &self.columns;
        let status = &self.job_status;
        let filters = &self.filters;

        let filtered: Vec<JobRecord> = self
            .jobs
            .iter()
            .filter(|job| {
                let job_status = status.get(&job.job_id).map(String::as_str).unwrap_or("");
                filters.matches(job, job_status, |name| {
                    columns
                        .iter()
                        .find(|c| c.display_name == name)
                        .map(|c| c.value(job))
                })
            })
            .cloned()
            .collect();

        self.filtered = filtered;
        if self.filtered.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len() - 1;
        }
    }

    fn move_down(&mut self) {
        if !self.filtered.is_empty() {
            self.selected = (self.selected + 1) % self.filtered.len();
        }
    }

    fn move_up(&mut self) {
        if !self.filtered.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.filtered.len() - 1);
        }
    }

    pub async fn tick(&mut self) {
        // Clear status message after 3 seconds
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        if self.last_refresh.elapsed().as_secs() >= self.config.refresh_secs {
            self.refresh().await;
        }
    }

    /// Re-read the snapshot. Failures keep the last good data.
    pub async fn refresh(&mut self) {
        self.last_refresh = Instant::now();

        match source::load(&self.snapshot_path).await {
            Ok(snapshot) => {
                self.jobs = snapshot.jobs;
                self.job_status = snapshot.status;
                self.columns = build_columns(
                    &self.config.additional_columns,
                    &self.number_format,
                    now_epoch(),
                );
                self.notify_new_failures();
                self.apply_filters();
            }
            Err(e) => {
                tracing::warn!("Snapshot reload failed: {:#}", e);
                self.set_status(format!("Reload failed: {}", e));
            }
        }
    }

    fn notify_new_failures(&mut self) {
        let failed = failed_ids(&self.job_status);
        let new: Vec<&String> = failed.difference(&self.known_failed).collect();

        if self.config.notifications && !new.is_empty() {
            let body = if new.len() == 1 {
                format!("Job {} failed", new[0])
            } else {
                format!("{} jobs failed", new.len())
            };
            if let Err(e) = notify("jobwatch", &body) {
                tracing::warn!("Notification failed: {}", e);
            }
        }

        self.known_failed = failed;
    }
}

fn target_label(target: &ClearTarget) -> &str {
    match target {
        ClearTarget::JobId => "job ID",
        ClearTarget::Queue => "queue",
        ClearTarget::JobSet => "job set",
        ClearTarget::Additional(name) => name,
        ClearTarget::Status => "status",
    }
}

fn failed_ids(status: &HashMap<String, String>) -> HashSet<String> {
    status
        .iter()
        .filter(|(_, s)| s.as_str() == "Failed")
        .map(|(id, _)| id.clone())
        .collect()
}

fn clear_handler<'a>(active: bool, f: impl Fn() + 'a) -> Option<ClearHandler<'a>> {
    if active {
        Some(Box::new(f))
    } else {
        None
    }
}

fn clear_column_handler<'a>(active: bool, f: impl Fn(&str) + 'a) -> Option<ClearColumnHandler<'a>> {
    if active {
        Some(Box::new(f))
    } else {
        None
    }
}

/// Resolve configured column names against the built-in registry.
fn build_columns(names: &[String], number_format: &NumberFormat, now: i64) -> Vec<AdditionalColumn> {
    names
        .iter()
        .filter_map(|name| match name.as_str() {
            "Owner" => Some(AdditionalColumn::new("Owner", |job: &JobRecord| {
                job.owner.clone()
            })),
            "Priority" => {
                let fmt = number_format.clone();
                Some(AdditionalColumn::new("Priority", move |job: &JobRecord| {
                    fmt.format(job.priority)
                }))
            }
            "Submitted" => Some(AdditionalColumn::new("Submitted", move |job: &JobRecord| {
                format::age(now, job.submitted)
            })),
            other => {
                tracing::warn!("Unknown additional column in config: {}", other);
                None
            }
        })
        .collect()
}

fn now_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("dialog-information")
        .show()?;
    Ok(())
}

fn window_bounds(len: usize, selected: usize, capacity: usize) -> (usize, usize) {
    if capacity == 0 || len == 0 {
        return (0, 0);
    }
    if len <= capacity {
        return (0, len);
    }
    let selected = selected.min(len - 1);
    let start = selected.saturating_sub(capacity - 1);
    (start, start + capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_fits() {
        assert_eq!(window_bounds(3, 0, 10), (0, 3));
        assert_eq!(window_bounds(0, 0, 10), (0, 0));
        assert_eq!(window_bounds(5, 2, 0), (0, 0));
    }

    #[test]
    fn test_window_follows_selection() {
        // Selection on the first page
        assert_eq!(window_bounds(10, 0, 4), (0, 4));
        assert_eq!(window_bounds(10, 3, 4), (0, 4));
        // Window slides to keep the selection on its last row
        assert_eq!(window_bounds(10, 4, 4), (1, 5));
        assert_eq!(window_bounds(10, 9, 4), (6, 10));
        // Out-of-range selection is clamped
        assert_eq!(window_bounds(10, 42, 4), (6, 10));
    }

    #[test]
    fn test_failed_ids() {
        let mut status = HashMap::new();
        status.insert("j1".to_string(), "Failed".to_string());
        status.insert("j2".to_string(), "Running".to_string());
        status.insert("j3".to_string(), "Failed".to_string());

        let failed = failed_ids(&status);
        assert_eq!(failed.len(), 2);
        assert!(failed.contains("j1"));
        assert!(failed.contains("j3"));
    }
}
