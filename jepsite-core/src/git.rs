//! Git checkout of versioned spec sources

use std::path::{Path, PathBuf};
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} exited with {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Unknown git ref: {0}")]
    UnknownRef(String),

    #[error("Failed to prepare checkout directory {path:?}: {source}")]
    Workdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single clone of the spec repository, re-pointed at each version's ref
#[derive(Debug, Clone)]
pub struct GitCheckout {
    repo: String,
    workdir: PathBuf,
}

impl GitCheckout {
    pub fn new(repo: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Clone when the cache is empty, otherwise fetch every ref
    pub async fn init_or_refresh(&self) -> Result<(), GitError> {
        if self.workdir.join(".git").exists() {
            info!(repo = %self.repo, workdir = %self.workdir.display(), "fetching repository");
            self.git(["fetch", "--all", "--tags", "--prune"]).await
        } else {
            self.clone_repo().await
        }
    }

    /// Detach the working tree at `git_ref`, discarding local changes
    pub async fn checkout(&self, git_ref: &str) -> Result<(), GitError> {
        let commit = self.resolve_ref(git_ref).await?;
        info!(git_ref, commit = %commit, workdir = %self.workdir.display(), "checking out ref");
        self.git(["checkout", "--force", "--detach", commit.as_str()]).await
    }

    /// Resolve `git_ref` to a commit id, preferring the fetched remote branch
    /// over a local branch of the same name
    pub async fn resolve_ref(&self, git_ref: &str) -> Result<String, GitError> {
        let remote = format!("origin/{git_ref}^{{commit}}");
        if let Some(commit) = self.rev_parse(&remote).await? {
            return Ok(commit);
        }
        let local = format!("{git_ref}^{{commit}}");
        match self.rev_parse(&local).await? {
            Some(commit) => Ok(commit),
            None => Err(GitError::UnknownRef(git_ref.to_string())),
        }
    }

    async fn rev_parse(&self, spec: &str) -> Result<Option<String>, GitError> {
        let output = git_in_dir(["rev-parse", "--verify", "--quiet", spec], &self.workdir).await?;
        if !output.status.success() {
            debug!(spec, "ref does not resolve");
            return Ok(None);
        }
        let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!commit.is_empty()).then_some(commit))
    }

    async fn clone_repo(&self) -> Result<(), GitError> {
        info!(
            repo = %self.repo,
            dest = %self.workdir.display(),
            "cloning repository"
        );
        // Clone from the parent so git can create the destination folder.
        let parent = self
            .workdir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|source| GitError::Workdir {
                path: parent.clone(),
                source,
            })?;

        let dest = self.workdir.to_string_lossy().into_owned();
        let output = git_in_dir(
            ["clone", "--no-checkout", self.repo.as_str(), dest.as_str()],
            &parent,
        )
        .await?;
        check_status("clone", output)
    }

    async fn git<I, S>(&self, args: I) -> Result<(), GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let command = args.first().cloned().unwrap_or_default();
        let output = git_in_dir(&args, &self.workdir).await?;
        check_status(&command, output)
    }
}

async fn git_in_dir<I, S>(args: I, cwd: &Path) -> Result<Output, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cmd = Command::new("git");
    cmd.current_dir(cwd);
    let mut rendered = Vec::new();
    for arg in args {
        rendered.push(arg.as_ref().to_string());
        cmd.arg(arg.as_ref());
    }
    let command = rendered.join(" ");
    debug!(command = %command, cwd = %cwd.display(), "running git");

    cmd.output().await.map_err(|source| GitError::Spawn { command, source })
}

fn check_status(command: &str, output: Output) -> Result<(), GitError> {
    if output.status.success() {
        return Ok(());
    }
    Err(GitError::Failed {
        command: command.to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_failed_status_captures_stderr() {
        use std::os::unix::process::ExitStatusExt;

        let output = Output {
            status: std::process::ExitStatus::from_raw(128 << 8),
            stdout: Vec::new(),
            stderr: b"fatal: not a git repository\n".to_vec(),
        };
        match check_status("fetch", output) {
            Err(GitError::Failed { command, code, stderr }) => {
                assert_eq!(command, "fetch");
                assert_eq!(code, 128);
                assert_eq!(stderr, "fatal: not a git repository");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_workdir_reports_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let checkout =
            GitCheckout::new("https://example.invalid/repo.git", dir.path().join("absent"));
        // current_dir does not exist, so spawning fails before git runs
        let err = checkout.checkout("main").await.unwrap_err();
        assert!(matches!(err, GitError::Spawn { .. }));
    }
}
