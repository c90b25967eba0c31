//! Recursive enumeration of tracked files across a repository and its submodules.
//!
//! The walk is depth-first. Each repository level owns its `check-attr`
//! session and its memo of resolved `export-ignore` decisions; both are dropped
//! when the level returns, so open sessions always mirror the recursion stack.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::Error;
use crate::git::{self, AttrValue, AttributeChecker, EXPORT_IGNORE, GitVersion};

/// Filtering options applied at every repository level.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
	/// Absolute, normalized paths excluded together with everything below them.
	pub excludes: Vec<PathBuf>,
	pub export_ignore: bool,
	pub force_submodules: bool,
	pub ignore_uninitialized_submodules: bool,
}

/// Walks the main repository at `root` and all nested submodules.
pub struct FileWalker {
	root: PathBuf,
	options: WalkOptions,
	git_version: Option<GitVersion>,
}

impl FileWalker {
	pub fn new(root: impl Into<PathBuf>, options: WalkOptions, git_version: Option<GitVersion>) -> Self {
		Self {
			root: root.into(),
			options,
			git_version,
		}
	}

	/// Call `emit` with every file to archive, relative to the main root.
	///
	/// Paths come out in `git ls-files` order, each repository's own files
	/// before those of its submodules.
	pub fn walk(&self, emit: &mut dyn FnMut(PathBuf) -> Result<()>) -> Result<()> {
		self.walk_repo(Path::new(""), emit)
	}

	fn walk_repo(&self, repo_rel: &Path, emit: &mut dyn FnMut(PathBuf) -> Result<()>) -> Result<()> {
		let mut level = RepoLevel::new(self, repo_rel);
		tracing::debug!(repo = %level.abspath.display(), "walking repository");

		if self.options.force_submodules {
			git::submodule::init_and_update(&level.abspath)?;
		}
		let submodules = git::submodule::declared_paths(&level.abspath)?;

		for path in git::repository::list_files(&level.abspath)? {
			// Submodule mount points are listed as gitlinks whether or not
			// they are checked out.
			if submodules.contains(&path) {
				continue;
			}
			let abspath = level.abspath.join(&path);
			let metadata = fs::symlink_metadata(&abspath);
			// Leftover directories; symlinks to directories are regular entries.
			if matches!(&metadata, Ok(meta) if meta.is_dir()) {
				continue;
			}
			if level.is_excluded(&path)? {
				tracing::debug!(path = %repo_rel.join(&path).display(), "excluded");
				continue;
			}
			emit(repo_rel.join(&path))?;
		}

		for submodule in submodules {
			if level.is_excluded(&submodule)? {
				tracing::debug!(submodule = %repo_rel.join(&submodule).display(), "excluded submodule");
				continue;
			}

			let sub_abspath = level.abspath.join(&submodule);
			if !git::repository::is_checked_out(&sub_abspath) {
				if self.options.ignore_uninitialized_submodules {
					tracing::debug!(submodule = %sub_abspath.display(), "skipping uninitialized submodule");
					continue;
				}
				return Err(Error::UninitializedSubmodule { path: sub_abspath }.into());
			}

			let sub_rel = repo_rel.join(&submodule);
			self.walk_repo(&sub_rel, &mut |main_rel: PathBuf| -> Result<()> {
				let here = main_rel.strip_prefix(repo_rel).with_context(|| {
					format!(
						"{} is outside of {}",
						main_rel.display(),
						repo_rel.display()
					)
				})?;
				if level.is_excluded(here)? {
					tracing::debug!(path = %main_rel.display(), "excluded by parent repository");
					return Ok(());
				}
				emit(main_rel)
			})
			.with_context(|| format!("failed to walk submodule {}", sub_rel.display()))?;
		}

		level.close()
	}
}

/// State for one repository on the recursion stack.
struct RepoLevel<'w> {
	walker: &'w FileWalker,
	abspath: PathBuf,
	checker: Option<AttributeChecker>,
	/// Resolved `export-ignore` per repository-relative path.
	decisions: HashMap<PathBuf, bool>,
}

impl<'w> RepoLevel<'w> {
	fn new(walker: &'w FileWalker, repo_rel: &Path) -> Self {
		Self {
			walker,
			abspath: walker.root.join(repo_rel),
			checker: None,
			decisions: HashMap::new(),
		}
	}

	/// Whether `path` (relative to this repository) must be left out.
	fn is_excluded(&mut self, path: &Path) -> Result<bool> {
		if self.is_explicitly_excluded(path) {
			return Ok(true);
		}
		if !self.walker.options.export_ignore {
			return Ok(false);
		}
		self.is_export_ignored(path)
	}

	fn is_explicitly_excluded(&self, path: &Path) -> bool {
		let abspath = self.abspath.join(path);
		self.walker
			.options
			.excludes
			.iter()
			.any(|excluded| abspath.starts_with(excluded))
	}

	/// Resolve `export-ignore`, inheriting from parent directories when the
	/// attribute is neither set nor unset.
	///
	/// Walks up until a path has a definite answer (set, unset, memoized, or
	/// the repository root), then records that answer for every path visited
	/// on the way.
	fn is_export_ignored(&mut self, path: &Path) -> Result<bool> {
		let mut pending: Vec<PathBuf> = Vec::new();
		let mut current = path;

		let resolved = loop {
			if let Some(&known) = self.decisions.get(current) {
				break known;
			}
			match self.export_ignore_of(current)? {
				AttrValue::Set => {
					self.decisions.insert(current.to_path_buf(), true);
					break true;
				}
				AttrValue::Unset => {
					self.decisions.insert(current.to_path_buf(), false);
					break false;
				}
				AttrValue::Unspecified | AttrValue::Value(_) => {
					pending.push(current.to_path_buf());
					match current.parent() {
						Some(parent) if !parent.as_os_str().is_empty() => current = parent,
						_ => break false,
					}
				}
			}
		};

		for path in pending {
			self.decisions.insert(path, resolved);
		}
		Ok(resolved)
	}

	fn export_ignore_of(&mut self, path: &Path) -> Result<AttrValue> {
		let checker = match &mut self.checker {
			Some(checker) => checker,
			slot => slot.insert(AttributeChecker::open(
				&self.abspath,
				&[EXPORT_IGNORE],
				self.walker.git_version.as_ref(),
			)?),
		};
		let mut attributes = checker.query(path)?;
		Ok(attributes
			.remove(EXPORT_IGNORE)
			.unwrap_or(AttrValue::Unspecified))
	}

	fn close(mut self) -> Result<()> {
		match self.checker.take() {
			Some(checker) => checker.close(),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn walker(excludes: &[&str]) -> FileWalker {
		FileWalker::new(
			"/repo",
			WalkOptions {
				excludes: excludes.iter().map(PathBuf::from).collect(),
				export_ignore: false,
				..WalkOptions::default()
			},
			None,
		)
	}

	#[test]
	fn explicit_exclusion_matches_exact_paths_and_directories() {
		let walker = walker(&["/repo/lib", "/repo/app/secret.txt"]);
		let mut level = RepoLevel::new(&walker, Path::new(""));
		assert!(level.is_excluded(Path::new("lib")).unwrap());
		assert!(level.is_excluded(Path::new("lib/extra/__init__.py")).unwrap());
		assert!(level.is_excluded(Path::new("app/secret.txt")).unwrap());
		assert!(!level.is_excluded(Path::new("app/__init__.py")).unwrap());
	}

	#[test]
	fn explicit_exclusion_compares_components_not_text() {
		let walker = walker(&["/repo/lib"]);
		let mut level = RepoLevel::new(&walker, Path::new(""));
		assert!(!level.is_excluded(Path::new("library/mod.rs")).unwrap());
		assert!(!level.is_excluded(Path::new("app/lib")).unwrap());
	}

	#[test]
	fn submodule_levels_check_against_their_own_root() {
		let walker = walker(&["/repo/lib/extra"]);
		let mut level = RepoLevel::new(&walker, Path::new("lib"));
		assert!(level.is_excluded(Path::new("extra/__init__.py")).unwrap());
		assert!(!level.is_excluded(Path::new("__init__.py")).unwrap());
	}

	#[test]
	fn memoized_decisions_skip_the_session() {
		let walker = FileWalker::new(
			"/nonexistent",
			WalkOptions {
				export_ignore: true,
				..WalkOptions::default()
			},
			None,
		);
		let mut level = RepoLevel::new(&walker, Path::new(""));
		level.decisions.insert(PathBuf::from("tests"), true);
		level.decisions.insert(PathBuf::from("tests/keep.py"), false);
		assert!(level.is_export_ignored(Path::new("tests")).unwrap());
		assert!(!level.is_export_ignored(Path::new("tests/keep.py")).unwrap());
		assert!(level.checker.is_none());
	}
}
