use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::JobRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read jobs snapshot {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse jobs snapshot {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One entry in the snapshot file: a job record plus its optional
/// status display string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotEntry {
    #[serde(flatten)]
    job: JobRecord,
    status: Option<String>,
}

/// Parsed snapshot: the job records in file order, and the job-id to
/// status mapping for the jobs that reported one.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub jobs: Vec<JobRecord>,
    pub status: HashMap<String, String>,
}

/// Aggregate view of a snapshot, printed by `--status`.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub queues: Vec<String>,
}

impl Snapshot {
    pub fn summary(&self) -> Summary {
        let mut by_status = BTreeMap::new();
        for job in &self.jobs {
            let status = self
                .status
                .get(&job.job_id)
                .map(String::as_str)
                .unwrap_or("unknown");
            *by_status.entry(status.to_string()).or_insert(0) += 1;
        }

        let mut queues: Vec<String> = self.jobs.iter().map(|j| j.queue.clone()).collect();
        queues.sort();
        queues.dedup();

        Summary {
            total: self.jobs.len(),
            by_status,
            queues,
        }
    }
}

/// Read and parse the jobs snapshot file.
pub async fn load(path: &Path) -> Result<Snapshot, SourceError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!("Read jobs snapshot from {}", path.display());

    parse(&text).map_err(|source| SourceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse snapshot JSON: an array of job objects, camelCase keys.
pub fn parse(text: &str) -> Result<Snapshot, serde_json::Error> {
    let entries: Vec<SnapshotEntry> = serde_json::from_str(text)?;

    let mut snapshot = Snapshot::default();
    for entry in entries {
        if let Some(status) = entry.status {
            snapshot.status.insert(entry.job.job_id.clone(), status);
        }
        snapshot.jobs.push(entry.job);
    }
    Ok(snapshot)
}
