#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, ensure};
use libscrub::{CandidateCommit, EngineConfig, Remote};
use tempfile::TempDir;

/// Runner, decision and recorder doubles.
pub mod fakes;

/// Run a git command inside `dir`, ensuring it succeeds.
pub fn git(dir: &Path, args: &[&str]) -> Result<Output> {
    git_with_env(dir, args, &[])
}

/// Run a git command with extra environment variables, ensuring it succeeds.
pub fn git_with_env(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .envs(env.iter().copied())
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(output)
}

/// Trimmed stdout of a successful git command.
pub fn git_stdout(dir: &Path, args: &[&str]) -> Result<String> {
    let output = git(dir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A directory of bare repositories standing in for the hosting platform.
pub struct Remotes {
    /// Root holding `<owner>/<name>.git`.
    pub root: TempDir,
}

impl Remotes {
    /// Create an empty remote root.
    pub fn new() -> Result<Self> {
        Ok(Self {
            root: TempDir::new()?,
        })
    }

    /// Engine settings pointing at this root.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            remote: Remote::Directory {
                root: self.root.path().to_path_buf(),
            },
            ..EngineConfig::default()
        }
    }

    /// Create the bare repository `owner/name` and a seed clone for authoring commits.
    pub fn create(&self, repository: &str) -> Result<Seed> {
        let bare = self.root.path().join(format!("{repository}.git"));
        fs::create_dir_all(&bare)?;
        git(&bare, &["init", "-q", "--bare", "-b", "main"])?;

        let dir = TempDir::new()?;
        let path = dir.path().join("seed");
        fs::create_dir_all(&path)?;
        git(&path, &["init", "-q", "-b", "main"])?;
        git(&path, &["config", "user.email", "test@example.com"])?;
        git(&path, &["config", "user.name", "Test User"])?;
        git(&path, &["remote", "add", "origin", &bare.to_string_lossy()])?;

        Ok(Seed { dir, path, bare })
    }
}

/// A working clone used to author commits for one bare remote.
pub struct Seed {
    /// Owner of the clone directory.
    dir: TempDir,
    /// Path of the clone.
    pub path: PathBuf,
    /// Path of the bare remote.
    pub bare: PathBuf,
}

impl Seed {
    /// Commit `file` with `message`, dated `timestamp`, and return its hash.
    pub fn commit(&self, file: &str, message: &str, timestamp: &str) -> Result<String> {
        fs::write(self.path.join(file), format!("{message}\n"))?;
        git(&self.path, &["add", file])?;
        git_with_env(
            &self.path,
            &["commit", "-q", "-m", message],
            &[
                ("GIT_AUTHOR_DATE", timestamp),
                ("GIT_COMMITTER_DATE", timestamp),
            ],
        )?;
        git_stdout(&self.path, &["rev-parse", "HEAD"])
    }

    /// Publish the seed's `main` to the remote.
    pub fn push(&self) -> Result<()> {
        git(&self.path, &["push", "-q", "-f", "origin", "main"])?;
        Ok(())
    }

    /// Commits on the remote's `main`.
    pub fn remote_count(&self) -> Result<usize> {
        Ok(git_stdout(&self.bare, &["rev-list", "--count", "main"])?.parse()?)
    }

    /// Tip of the remote's `main`.
    pub fn remote_tip(&self) -> Result<String> {
        git_stdout(&self.bare, &["rev-parse", "main"])
    }

    /// Set a config value on the bare remote.
    pub fn configure_remote(&self, key: &str, value: &str) -> Result<()> {
        git(&self.bare, &["config", key, value])?;
        Ok(())
    }
}

/// Build a candidate record.
pub fn candidate(repository: &str, commit_id: &str, message: &str, timestamp: &str) -> CandidateCommit {
    CandidateCommit::new(repository, commit_id, message, timestamp)
}

/// Timestamp for the `n`th commit of a fixture, one day apart.
pub fn day(n: u32) -> String {
    format!("2024-01-{n:02}T10:00:00Z")
}
