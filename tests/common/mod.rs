//! Repository fixtures built with the git binary.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub use assert_cmd::Command as CliCommand;

/// Run git in `dir` with a fixed identity, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) {
	let output = Command::new("git")
		.current_dir(dir)
		.args([
			"-c",
			"user.name=git-archive-all",
			"-c",
			"user.email=git-archive-all@example.com",
			"-c",
			"commit.gpgsign=false",
			"-c",
			"init.defaultBranch=main",
			"-c",
			"protocol.file.allow=always",
		])
		.args(args)
		.env("GIT_CONFIG_NOSYSTEM", "1")
		.output()
		.expect("failed to run git");
	assert!(
		output.status.success(),
		"git {:?} failed in {}: {}",
		args,
		dir.display(),
		String::from_utf8_lossy(&output.stderr)
	);
}

/// The `git-archive-all` binary built for this test run.
pub fn cli() -> CliCommand {
	CliCommand::cargo_bin("git-archive-all").expect("git-archive-all binary not built")
}

pub struct Repo {
	pub path: PathBuf,
}

impl Repo {
	pub fn init(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		fs::create_dir_all(&path).unwrap();
		git(&path, &["init", "-q"]);
		Self { path }
	}

	/// Write and stage a file, creating parent directories.
	pub fn add_file(&self, rel: &str, contents: &str) -> &Self {
		let file = self.path.join(rel);
		if let Some(parent) = file.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		fs::write(&file, contents).unwrap();
		git(&self.path, &["add", "--", rel]);
		self
	}

	/// Create a repository at `rel`, fill it, commit it and register it as a
	/// submodule in place.
	pub fn add_submodule(&self, rel: &str, fill: impl FnOnce(&Repo)) -> &Self {
		let sub = Repo::init(self.path.join(rel));
		fill(&sub);
		sub.commit();
		let url = sub.path.to_string_lossy().into_owned();
		git(&self.path, &["submodule", "add", "-q", &url, rel]);
		self
	}

	pub fn commit(&self) -> &Self {
		git(&self.path, &["commit", "-q", "-m", "init"]);
		self
	}
}

/// `app/__init__.py`, submodule `lib` with `__init__.py` and nested submodule
/// `lib/extra` with `__init__.py`. Calls `extend` on each level before
/// committing it.
pub fn base_repo_with(
	path: &Path,
	root: impl FnOnce(&Repo),
	lib: impl FnOnce(&Repo),
	extra: impl FnOnce(&Repo),
) -> Repo {
	let repo = Repo::init(path);
	repo.add_file("app/__init__.py", "#Beautiful is better than ugly.");
	repo.add_submodule("lib", |lib_repo| {
		lib_repo.add_file("__init__.py", "#Explicit is better than implicit.");
		lib_repo.add_submodule("extra", |extra_repo| {
			extra_repo.add_file("__init__.py", "#Simple is better than complex.");
			extra(extra_repo);
		});
		lib(lib_repo);
	});
	root(&repo);
	repo.commit();
	repo
}

pub fn base_repo(path: &Path) -> Repo {
	base_repo_with(path, |_| {}, |_| {}, |_| {})
}

/// Files of the base repository, without prefix.
pub fn base_files() -> BTreeSet<String> {
	[
		".gitmodules",
		"app/__init__.py",
		"lib/.gitmodules",
		"lib/__init__.py",
		"lib/extra/__init__.py",
	]
	.into_iter()
	.map(String::from)
	.collect()
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
	items.iter().map(|s| (*s).to_owned()).collect()
}
