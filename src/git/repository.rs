//! Repository-level plumbing: toplevel resolution and tracked file listing.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::git;
use super::paths::{bytes_to_path, split_nul, trim_line_end};
use crate::error::Error;

/// Resolve the toplevel working directory of the repository containing `start`.
pub fn resolve_toplevel(start: &Path) -> Result<PathBuf> {
	let output = git()
		.cwd(start)
		.args(["rev-parse", "--show-toplevel"])
		.stdout_bytes()
		.map_err(|err| {
			tracing::debug!("rev-parse failed in {}: {err:#}", start.display());
			Error::NotAGitRepository {
				path: start.to_path_buf(),
			}
		})?;

	let toplevel = trim_line_end(&output);
	if toplevel.is_empty() {
		return Err(Error::NotAGitRepository {
			path: start.to_path_buf(),
		}
		.into());
	}
	let root = bytes_to_path(toplevel.to_vec());
	Ok(dunce::simplified(&root).to_path_buf())
}

/// All paths in the index of the repository at `root`, in git's order.
///
/// Paths are relative to `root`. Submodule gitlinks are listed as plain
/// entries; callers tell them apart by looking at the working tree.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
	let output = git()
		.cwd(root)
		.args([
			"ls-files",
			"-z",
			"--cached",
			"--full-name",
			"--no-empty-directory",
		])
		.stdout_bytes()?;
	Ok(split_nul(&output))
}

/// Check if a directory holds a checked-out repository (`.git` dir or file).
pub fn is_checked_out(path: &Path) -> bool {
	path.join(".git").exists()
}
