use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    error::{Result, ScrubError},
    orchestrator::ResultRecorder,
    types::{CandidateCommit, DeferredCommit, EPOCH_TIMESTAMP, RewriteResult, RunStatistics},
};

/// One commit record as found in a candidate or retry file.
#[derive(Debug, Deserialize)]
struct RawCommit {
    /// Repository in `owner/name` form.
    repository: String,
    /// Commit hash.
    #[serde(alias = "commit_sha")]
    commit_id: String,
    /// Commit message; retry files may carry `null`.
    #[serde(default, alias = "commit_message")]
    message: Option<String>,
    /// Author timestamp.
    #[serde(default)]
    timestamp: Option<String>,
    /// Author name.
    #[serde(default)]
    author: Option<String>,
}

impl From<RawCommit> for CandidateCommit {
    fn from(raw: RawCommit) -> Self {
        Self {
            repository: raw.repository,
            commit_id: raw.commit_id,
            message: raw.message.unwrap_or_default(),
            timestamp: raw
                .timestamp
                .unwrap_or_else(|| EPOCH_TIMESTAMP.to_string()),
            author: raw.author,
        }
    }
}

/// Accepted candidate file layouts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    /// Discovery output, or a retry file written by [`JsonRecorder`].
    Commits {
        /// Commit records.
        commits: Vec<RawCommit>,
    },
    /// Older retry layout.
    Skipped {
        /// Commit records.
        skipped_commits: Vec<RawCommit>,
    },
}

/// Parse candidates from JSON text.
pub fn parse_candidates(text: &str) -> Result<Vec<CandidateCommit>> {
    let file: CandidateFile = serde_json::from_str(text)?;
    let raw = match file {
        CandidateFile::Commits { commits } => commits,
        CandidateFile::Skipped { skipped_commits } => skipped_commits,
    };
    Ok(raw.into_iter().map(CandidateCommit::from).collect())
}

/// Load candidates from the file at `path`.
///
/// A file without any commit records is rejected.
pub fn load_candidates(path: &Path) -> Result<Vec<CandidateCommit>> {
    let text = fs::read_to_string(path).map_err(|e| {
        ScrubError::InvalidInput(format!("cannot read {}: {e}", path.display()))
    })?;
    let candidates = parse_candidates(&text)?;
    if candidates.is_empty() {
        return Err(ScrubError::InvalidInput(format!(
            "no commits found in {}",
            path.display()
        )));
    }
    debug!(path = %path.display(), count = candidates.len(), "loaded candidates");
    Ok(candidates)
}

/// Layout of the run report.
#[derive(Serialize)]
struct ReportFile<'r> {
    /// When the run started.
    execution_date: &'r str,
    /// Final counters; absent until the run finishes.
    statistics: Option<&'r RunStatistics>,
    /// Rewrite results so far.
    results: &'r [RewriteResult],
    /// Deferred commits so far.
    skipped_for_later: &'r [DeferredCommit],
}

/// Layout of the retry seed file.
#[derive(Serialize)]
struct RetryFile<'r> {
    /// When the file was written.
    date: &'r str,
    /// Deferred commits, loadable as candidates.
    commits: &'r [DeferredCommit],
}

/// Write `value` as pretty JSON to `path`, replacing the file atomically.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| ScrubError::Io(e.error))?;
    Ok(())
}

/// Records run outcomes as JSON files, rewriting them after every event so an
/// aborted run still leaves an accurate report.
#[derive(Debug)]
pub struct JsonRecorder {
    /// Report destination.
    report_path: PathBuf,
    /// Retry seed destination; only written when something is deferred.
    retry_path: PathBuf,
    /// Timestamp of the run start.
    execution_date: String,
    /// Results recorded so far.
    results: Vec<RewriteResult>,
    /// Deferred commits recorded so far.
    deferred: Vec<DeferredCommit>,
    /// Final counters, once known.
    statistics: Option<RunStatistics>,
}

impl JsonRecorder {
    /// Record into `report_path`, seeding retries into `retry_path`.
    pub fn new(report_path: impl Into<PathBuf>, retry_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
            retry_path: retry_path.into(),
            execution_date: Local::now().to_rfc3339(),
            results: Vec::new(),
            deferred: Vec::new(),
            statistics: None,
        }
    }

    /// Report destination.
    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Retry seed destination.
    pub fn retry_path(&self) -> &Path {
        &self.retry_path
    }

    /// Whether a retry seed file has been written.
    pub fn has_retry_file(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Write both files from the current state.
    fn flush(&self) -> Result<()> {
        write_json(
            &self.report_path,
            &ReportFile {
                execution_date: &self.execution_date,
                statistics: self.statistics.as_ref(),
                results: &self.results,
                skipped_for_later: &self.deferred,
            },
        )?;
        if !self.deferred.is_empty() {
            let date = Local::now().to_rfc3339();
            write_json(
                &self.retry_path,
                &RetryFile {
                    date: &date,
                    commits: &self.deferred,
                },
            )?;
        }
        Ok(())
    }
}

impl ResultRecorder for JsonRecorder {
    fn record_result(&mut self, result: &RewriteResult) -> Result<()> {
        self.results.push(result.clone());
        self.flush()
    }

    fn record_deferred(&mut self, commits: &[DeferredCommit]) -> Result<()> {
        self.deferred.extend_from_slice(commits);
        self.flush()
    }

    fn finish(&mut self, statistics: &RunStatistics) -> Result<()> {
        self.statistics = Some(statistics.clone());
        self.flush()
    }
}
