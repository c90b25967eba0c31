//! Git submodule operations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gix::config::{File as GitConfigFile, Source};

use super::git;

/// Run `git submodule init` followed by `git submodule update` in `repo_path`.
pub fn init_and_update(repo_path: &Path) -> Result<()> {
	git().cwd(repo_path).args(["submodule", "init"]).run()?;
	git().cwd(repo_path).args(["submodule", "update"]).run()
}

/// Paths of the submodules declared in `<repo_path>/.gitmodules`.
///
/// A missing `.gitmodules` means the repository has no submodules. Paths are
/// relative to `repo_path` and listed in declaration order.
pub fn declared_paths(repo_path: &Path) -> Result<Vec<PathBuf>> {
	let gitmodules = repo_path.join(".gitmodules");
	if !gitmodules.is_file() {
		return Ok(Vec::new());
	}

	let file = GitConfigFile::from_path_no_includes(gitmodules.clone(), Source::Local)
		.with_context(|| format!("failed to load {}", gitmodules.display()))?;

	let Some(sections) = file.sections_by_name("submodule") else {
		return Ok(Vec::new());
	};

	let mut paths: Vec<PathBuf> = Vec::new();
	for section in sections {
		let Some(value) = section.value("path") else {
			continue;
		};
		let path = gix::path::from_bstr(value).into_owned();
		if path.as_os_str().is_empty() || paths.contains(&path) {
			continue;
		}
		paths.push(path);
	}
	Ok(paths)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn missing_gitmodules_means_no_submodules() {
		let dir = tempfile::tempdir().unwrap();
		assert!(declared_paths(dir.path()).unwrap().is_empty());
	}

	#[test]
	fn reads_every_declared_path_in_order() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join(".gitmodules"),
			"[submodule \"lib\"]\n\
			 \tpath = lib\n\
			 \turl = ../lib.git\n\
			 [submodule \"vendor/extra\"]\n\
			 \turl = ../extra.git\n\
			 \tpath=vendor/extra\n\
			 [core]\n\
			 \tpath = not-a-submodule\n",
		)
		.unwrap();

		let paths = declared_paths(dir.path()).unwrap();
		assert_eq!(
			paths,
			vec![PathBuf::from("lib"), PathBuf::from("vendor/extra")]
		);
	}

	#[test]
	fn quoted_paths_are_unescaped() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join(".gitmodules"),
			"[submodule \"odd\"]\n\tpath = \"dir with space \"\n",
		)
		.unwrap();

		let paths = declared_paths(dir.path()).unwrap();
		assert_eq!(paths, vec![PathBuf::from("dir with space ")]);
	}
}
