//! File revisions read through the `git` executable.
//!
//! Fills symbol columns that the history records leave empty.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use testfirst_core::{RevisionReader, TfdError};

/// A `git` command isolated from `GIT_DIR` and `GIT_WORK_TREE`, so the
/// explicit `-C` path always decides the repository.
fn git_cmd() -> Command {
    let mut cmd = Command::new("git");
    cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

/// Whether a `git` executable can be run.
pub fn git_available() -> bool {
    git_cmd()
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Revisions of one work tree.
#[derive(Debug, Clone)]
pub struct GitRevisions {
    root: PathBuf,
}

impl GitRevisions {
    /// Open `root` if it is the top level of a git work tree.
    pub fn open(root: &Path) -> Option<Self> {
        let root = root.canonicalize().ok()?;
        let output = git_cmd()
            .arg("-C")
            .arg(&root)
            .args(["rev-parse", "--show-toplevel"])
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }

        let toplevel = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let toplevel = Path::new(&toplevel).canonicalize().ok()?;
        (toplevel == root).then_some(Self { root })
    }
}

impl RevisionReader for GitRevisions {
    fn read_at(&self, hash: &str, path: &str) -> Result<Option<Vec<String>>, TfdError> {
        let output = git_cmd()
            .arg("-C")
            .arg(&self.root)
            .arg("show")
            .arg(format!("{}:{}", hash, path))
            .stderr(Stdio::null())
            .output()
            .map_err(|e| TfdError::IoError(format!("Run git: {}", e)))?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(str::to_string)
                .collect(),
        ))
    }
}
