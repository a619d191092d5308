use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    error::{Result, ScrubError},
    git::{self, Git},
    runner::CommandRunner,
};

/// A transient local clone of one remote repository.
///
/// The clone lives in a [`TempDir`], so it is removed when the workspace is
/// released or dropped, whichever happens first.
pub struct Workspace<'a> {
    /// Repository in `owner/name` form.
    repository: String,
    /// Owner of the clone's parent directory.
    dir: TempDir,
    /// Path of the clone inside `dir`.
    path: PathBuf,
    /// Branch checked out by the clone.
    branch: String,
    /// Branch tip observed right after cloning.
    initial_tip: String,
    /// Runner used for every git invocation.
    runner: &'a dyn CommandRunner,
    /// Settings shared by the run.
    config: &'a EngineConfig,
}

impl<'a> Workspace<'a> {
    /// Clone the default branch of `repository` into a fresh temporary directory.
    pub fn acquire(
        repository: &str,
        config: &'a EngineConfig,
        runner: &'a dyn CommandRunner,
    ) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("scrub-").tempdir()?;
        let path = dir.path().join("repo");
        let url = config.remote.clone_url(repository, &config.credential);

        info!(repository, remote = %config.remote.display_url(repository), "cloning");
        git::clone(
            runner,
            &url,
            &path,
            config.command_timeout,
            &config.credential,
        )?;

        let mut workspace = Self {
            repository: repository.to_string(),
            dir,
            path,
            branch: String::new(),
            initial_tip: String::new(),
            runner,
            config,
        };

        let repo = workspace.git();
        let tip = repo
            .head()?
            .ok_or_else(|| ScrubError::NotFound(format!("{repository} has no commits")))?;
        let branch = repo.current_branch()?;
        debug!(repository, branch, tip, "clone ready");

        workspace.branch = branch;
        workspace.initial_tip = tip;
        Ok(workspace)
    }

    /// Repository in `owner/name` form.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Path of the local clone.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Branch checked out by the clone.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Branch tip observed at clone time.
    pub fn initial_tip(&self) -> &str {
        &self.initial_tip
    }

    /// Git operations against the clone.
    pub fn git(&self) -> Git<'_> {
        Git::new(
            self.runner,
            &self.path,
            self.config.command_timeout,
            &self.config.credential,
        )
    }

    /// Remove the clone from disk.
    pub fn release(self) -> Result<()> {
        debug!(repository = %self.repository, "releasing workspace");
        self.dir.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Remote, runner::SystemRunner};

    #[test]
    fn test_missing_repository_is_not_found() -> Result<()> {
        let root = TempDir::new()?;
        let config = EngineConfig {
            remote: Remote::Directory {
                root: root.path().to_path_buf(),
            },
            ..EngineConfig::default()
        };
        let runner = SystemRunner::git();
        let result = Workspace::acquire("octo/missing", &config, &runner);
        assert!(matches!(result, Err(ScrubError::NotFound(_))));
        Ok(())
    }
}
