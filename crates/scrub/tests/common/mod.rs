#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, ensure};
use tempfile::TempDir;

/// Return the path to the compiled `scrub` binary.
pub fn scrub_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_scrub"))
}

/// Run a git command inside `dir`, ensuring it succeeds.
pub fn git(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .envs(env.iter().copied())
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A scratch area holding bare remotes, a seed clone per remote and the
/// working directory the CLI runs in.
pub struct Fixture {
    /// Owner of every path below.
    pub temp: TempDir,
}

impl Fixture {
    /// Create an empty fixture.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        fs::create_dir_all(temp.path().join("remotes"))?;
        fs::create_dir_all(temp.path().join("work"))?;
        Ok(Self { temp })
    }

    /// Root passed to `--remote-dir`.
    pub fn remotes(&self) -> PathBuf {
        self.temp.path().join("remotes")
    }

    /// Directory the CLI runs in.
    pub fn work(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    /// Create `repository` on the remote with one commit per message, one day
    /// apart, and return the commit hashes oldest first.
    pub fn repository(&self, repository: &str, messages: &[&str]) -> Result<Vec<String>> {
        let bare = self.remotes().join(format!("{repository}.git"));
        fs::create_dir_all(&bare)?;
        git(&bare, &["init", "-q", "--bare", "-b", "main"], &[])?;

        let seed = self.temp.path().join("seeds").join(repository);
        fs::create_dir_all(&seed)?;
        git(&seed, &["init", "-q", "-b", "main"], &[])?;
        git(&seed, &["config", "user.email", "test@example.com"], &[])?;
        git(&seed, &["config", "user.name", "Test User"], &[])?;
        git(&seed, &["remote", "add", "origin", &bare.to_string_lossy()], &[])?;

        let mut ids = Vec::new();
        for (n, message) in messages.iter().enumerate() {
            let date = format!("2024-01-{:02}T10:00:00Z", n + 1);
            fs::write(seed.join(format!("file{n}.txt")), message)?;
            git(&seed, &["add", "."], &[])?;
            git(
                &seed,
                &["commit", "-q", "-m", message],
                &[("GIT_AUTHOR_DATE", &date), ("GIT_COMMITTER_DATE", &date)],
            )?;
            ids.push(git(&seed, &["rev-parse", "HEAD"], &[])?);
        }
        git(&seed, &["push", "-q", "origin", "main"], &[])?;
        Ok(ids)
    }

    /// Number of commits on the remote's `main`.
    pub fn remote_count(&self, repository: &str) -> Result<usize> {
        let bare = self.remotes().join(format!("{repository}.git"));
        Ok(git(&bare, &["rev-list", "--count", "main"], &[])?.parse()?)
    }

    /// Write a candidate file into the working directory.
    pub fn write_candidates(&self, name: &str, records: &[(&str, &str, &str)]) -> Result<PathBuf> {
        let commits: Vec<serde_json::Value> = records
            .iter()
            .map(|(repository, id, timestamp)| {
                serde_json::json!({
                    "repository": repository,
                    "commit_id": id,
                    "commit_message": "test commit",
                    "timestamp": timestamp,
                })
            })
            .collect();
        let path = self.work().join(name);
        fs::write(&path, serde_json::to_string_pretty(&serde_json::json!({ "commits": commits }))?)?;
        Ok(path)
    }

    /// Run scrub in the working directory against the fixture's remotes.
    pub fn scrub(&self, args: &[&str]) -> Result<Output> {
        Command::new(scrub_binary())
            .current_dir(self.work())
            .env_remove("GITHUB_TOKEN")
            .env_remove("SCRUB_TIMEOUT_SECS")
            .env_remove("RUST_LOG")
            .arg("--remote-dir")
            .arg(self.remotes())
            .arg("--no-color")
            .args(args)
            .output()
            .with_context(|| format!("failed to run scrub {}", args.join(" ")))
    }

    /// Parse a JSON file written into the working directory.
    pub fn read_json(&self, name: &str) -> Result<serde_json::Value> {
        let text = fs::read_to_string(self.work().join(name))?;
        Ok(serde_json::from_str(&text)?)
    }
}
