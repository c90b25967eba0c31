//! Top-level orchestration: resolve the repository, plan entries, write them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::archive::Format;
use crate::config::{ArchiveConfig, CreateOptions, resolve_against};
use crate::git::{self, GitVersion};
use crate::output;
use crate::plan::ArchivePlan;
use crate::walker::{FileWalker, WalkOptions};

/// Outcome of [`Archiver::create`].
#[derive(Debug, Clone)]
pub struct Summary {
	pub output: PathBuf,
	/// `None` only for a dry run whose format could not be determined.
	pub format: Option<Format>,
	pub entries: usize,
	pub dry_run: bool,
}

/// Archives a repository and its submodules.
///
/// All state (the resolved root, the git version) belongs to the instance, so
/// several archivers can run in one process without sharing anything.
#[derive(Debug)]
pub struct Archiver {
	root: PathBuf,
	config: ArchiveConfig,
	git_version: Option<GitVersion>,
}

impl Archiver {
	/// Resolve the repository named by `config` and check the git version.
	///
	/// Relative include and exclude paths are taken relative to the current
	/// directory, the way a shell user typed them.
	pub fn new(config: ArchiveConfig) -> Result<Self> {
		let git_version = git::version::detect();
		git::version::require_supported(git_version.as_ref())?;

		let cwd = std::env::current_dir().context("failed to read the current directory")?;
		let start = match &config.repo {
			Some(path) => path.clone(),
			None => cwd.clone(),
		};
		let root = Self::resolve_root(&start)?;
		tracing::debug!(root = %root.display(), version = ?git_version, "resolved repository");

		let mut config = config;
		config.includes = config
			.includes
			.iter()
			.map(|path| resolve_against(&cwd, path))
			.collect();
		config.excludes = config
			.excludes
			.iter()
			.map(|path| resolve_against(&cwd, path))
			.collect();

		Ok(Self {
			root,
			config,
			git_version,
		})
	}

	/// Toplevel directory of the repository containing `path`.
	pub fn resolve_root(path: &Path) -> Result<PathBuf> {
		git::repository::resolve_toplevel(path)
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Walker over the tracked files of the repository and its submodules.
	pub fn walker(&self) -> FileWalker {
		FileWalker::new(
			self.root.clone(),
			WalkOptions {
				excludes: self.config.excludes.clone(),
				export_ignore: self.config.export_ignore,
				force_submodules: self.config.force_submodules,
				ignore_uninitialized_submodules: self.config.ignore_uninitialized_submodules,
			},
			self.git_version.clone(),
		)
	}

	/// Everything that would be archived, explicit includes first.
	pub fn plan(&self) -> Result<ArchivePlan> {
		let mut plan = ArchivePlan::new();
		self.archive_all_files(&mut |source: PathBuf, archive_path: PathBuf| -> Result<()> {
			plan.push(source, archive_path);
			Ok(())
		})?;
		Ok(plan)
	}

	/// Feed `(absolute source, archive path)` pairs to `sink`: included files,
	/// the contents of included directories, then the repository walk.
	pub fn archive_all_files(&self, sink: &mut dyn FnMut(PathBuf, PathBuf) -> Result<()>) -> Result<()> {
		for include in &self.config.includes {
			let metadata = fs::symlink_metadata(include)
				.with_context(|| format!("failed to read included path {}", include.display()))?;

			if !metadata.is_dir() {
				sink(include.clone(), self.included_name(include, include))?;
				continue;
			}

			for entry in WalkDir::new(include).follow_links(false).sort_by_file_name() {
				let entry = entry
					.with_context(|| format!("failed to traverse {}", include.display()))?;
				if entry.file_type().is_dir() {
					continue;
				}
				let name = self.included_name(include, entry.path());
				sink(entry.into_path(), name)?;
			}
		}

		self.walker().walk(&mut |relative| -> Result<()> {
			let archive_path = self.config.prefix.join(&relative);
			sink(self.root.join(relative), archive_path)
		})
	}

	/// Archive path for `path`, found through the explicit `include`.
	///
	/// Paths inside the repository keep their place relative to the root;
	/// anything else is placed under the include's own name.
	fn included_name(&self, include: &Path, path: &Path) -> PathBuf {
		let relative = path
			.starts_with(&self.root)
			.then(|| pathdiff::diff_paths(path, &self.root))
			.flatten()
			.unwrap_or_else(|| {
				let base = include.file_name().map(PathBuf::from).unwrap_or_default();
				match path.strip_prefix(include) {
					Ok(rest) if !rest.as_os_str().is_empty() => base.join(rest),
					_ => base,
				}
			});
		self.config.prefix.join(relative)
	}

	/// Write the archive to `output`, or list its entries when dry-running.
	///
	/// A dry run only lists; format and compression level are not checked.
	/// Otherwise both are validated and the whole plan is built before
	/// anything is written. Entries go to a temporary file next to
	/// `output` that replaces it only once the archive is complete; on error
	/// the temporary file is removed and `output` is left untouched.
	pub fn create(&self, output: &Path, options: &CreateOptions) -> Result<Summary> {
		if options.dry_run {
			let plan = self.plan()?;
			for entry in plan.entries() {
				output::planned(&entry.source, &entry.archive_path);
			}
			return Ok(Summary {
				output: output.to_path_buf(),
				format: options.format.or_else(|| Format::from_path(output).ok()),
				entries: plan.len(),
				dry_run: true,
			});
		}

		let format = match options.format {
			Some(format) => format,
			None => Format::from_path(output)?,
		};
		if let Some(level) = options.compression_level {
			format.check_level(level)?;
		}

		let plan = self.plan()?;
		let summary = Summary {
			output: output.to_path_buf(),
			format: Some(format),
			entries: plan.len(),
			dry_run: false,
		};

		let directory = output
			.parent()
			.filter(|parent| !parent.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));
		let mut builder = tempfile::Builder::new();
		builder.prefix(".git-archive-all-").suffix(".partial");
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			builder.permissions(fs::Permissions::from_mode(0o666));
		}
		let staging = builder
			.tempfile_in(directory)
			.with_context(|| format!("failed to create a temporary file in {}", directory.display()))?;
		let file = staging
			.as_file()
			.try_clone()
			.context("failed to open the temporary archive")?;

		let mut writer = format.open(file, options.compression_level)?;
		for entry in plan.entries() {
			tracing::debug!("{} => {}", entry.source.display(), entry.archive_path.display());
			writer.add(&entry.source, &entry.archive_path)?;
		}
		writer.finish()?;

		staging
			.persist(output)
			.map_err(|err| err.error)
			.with_context(|| format!("failed to write {}", output.display()))?;
		Ok(summary)
	}
}
