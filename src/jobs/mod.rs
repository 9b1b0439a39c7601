pub mod source;

use serde::{Deserialize, Serialize};

/// A single job record as supplied by the snapshot producer.
///
/// Records are read-only from the UI's perspective; the table and the
/// filters never mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub queue: String,
    pub job_set: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub priority: u64,
    /// Submission time, seconds since the Unix epoch.
    #[serde(default)]
    pub submitted: i64,
}

/// Active per-column filters. A filter being set is what arms the
/// corresponding clear affordance in the table header.
#[derive(Debug, Clone, Default)]
pub struct JobFilters {
    pub job_id: Option<String>,
    pub queue: Option<String>,
    pub job_set: Option<String>,
    /// Additional-column filters, keyed by the column's display name.
    pub additional: Vec<(String, String)>,
    pub status: Option<String>,
}

impl JobFilters {
    pub fn is_empty(&self) -> bool {
        self.job_id.is_none()
            && self.queue.is_none()
            && self.job_set.is_none()
            && self.additional.is_empty()
            && self.status.is_none()
    }

    pub fn active_count(&self) -> usize {
        let fixed = [&self.job_id, &self.queue, &self.job_set, &self.status]
            .iter()
            .filter(|f| f.is_some())
            .count();
        fixed + self.additional.len()
    }

    pub fn set_additional(&mut self, column: &str, value: String) {
        self.clear_additional(column);
        self.additional.push((column.to_string(), value));
    }

    pub fn clear_additional(&mut self, column: &str) {
        self.additional.retain(|(name, _)| name != column);
    }

    pub fn additional_filter(&self, column: &str) -> Option<&str> {
        self.additional
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Whether a job passes every active filter.
    ///
    /// Additional-column filters compare against the column's formatted
    /// value; `column_value` resolves a display name to that value for
    /// the job under test (None when the column is unknown, which fails
    /// the filter rather than silently passing it).
    pub fn matches<F>(&self, job: &JobRecord, status: &str, mut column_value: F) -> bool
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(want) = &self.job_id {
            if &job.job_id != want {
                return false;
            }
        }
        if let Some(want) = &self.queue {
            if &job.queue != want {
                return false;
            }
        }
        if let Some(want) = &self.job_set {
            if &job.job_set != want {
                return false;
            }
        }
        if let Some(want) = &self.status {
            if status != want {
                return false;
            }
        }
        for (column, want) in &self.additional {
            match column_value(column) {
                Some(value) if &value == want => {}
                _ => return false,
            }
        }
        true
    }
}
