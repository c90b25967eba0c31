use std::path::{Component, Path, PathBuf};

use crate::archive::Format;

/// Name used when the output file name is nothing but an extension.
const FALLBACK_PREFIX: &str = "Archive";

/// Extensions stripped from the output name to derive the default prefix,
/// longest first so `.tar.gz` wins over `.gz`.
const ARCHIVE_SUFFIXES: &[&str] = &[
	".tar.bz2", ".tar.gz", ".tar.xz", ".tbz2", ".tgz", ".txz", ".zip", ".tar", ".bz2", ".gz",
	".xz",
];

/// What to archive and how to filter it.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
	/// Any path inside the repository; `None` means the current directory.
	pub repo: Option<PathBuf>,
	/// Prepended to every archive path.
	pub prefix: PathBuf,
	/// Extra files or directories added regardless of git tracking. Relative
	/// paths here and in `excludes` are relative to the current directory.
	pub includes: Vec<PathBuf>,
	/// Files or directories left out even when tracked.
	pub excludes: Vec<PathBuf>,
	/// Honour `export-ignore` from `.gitattributes`.
	pub export_ignore: bool,
	/// Run `git submodule init && git submodule update` at every level.
	pub force_submodules: bool,
	/// Skip submodules without a checked-out working directory.
	pub ignore_uninitialized_submodules: bool,
}

impl Default for ArchiveConfig {
	fn default() -> Self {
		Self {
			repo: None,
			prefix: PathBuf::new(),
			includes: Vec::new(),
			excludes: Vec::new(),
			export_ignore: true,
			force_submodules: false,
			ignore_uninitialized_submodules: false,
		}
	}
}

impl ArchiveConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn repo(mut self, path: impl Into<PathBuf>) -> Self {
		self.repo = Some(path.into());
		self
	}

	pub fn prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
		self.prefix = prefix.into();
		self
	}

	pub fn include(mut self, path: impl Into<PathBuf>) -> Self {
		self.includes.push(path.into());
		self
	}

	pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
		self.excludes.push(path.into());
		self
	}

	pub fn export_ignore(mut self, enabled: bool) -> Self {
		self.export_ignore = enabled;
		self
	}

	pub fn force_submodules(mut self, enabled: bool) -> Self {
		self.force_submodules = enabled;
		self
	}

	pub fn ignore_uninitialized_submodules(mut self, enabled: bool) -> Self {
		self.ignore_uninitialized_submodules = enabled;
		self
	}
}

/// Options for a single [`crate::Archiver::create`] call.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
	/// List what would be archived without writing anything.
	pub dry_run: bool,
	/// Explicit format; derived from the output extension when `None`.
	pub format: Option<Format>,
	/// Format-dependent compression level (0-9).
	pub compression_level: Option<u32>,
}

/// Prefix derived from the output file name, so the archive extracts into a
/// single directory instead of the current one.
pub fn default_prefix(output: &Path) -> PathBuf {
	let name = output
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();

	let stem = ARCHIVE_SUFFIXES
		.iter()
		.find_map(|suffix| strip_suffix_ignore_case(&name, suffix))
		.unwrap_or(&name);

	if stem.is_empty() {
		PathBuf::from(FALLBACK_PREFIX)
	} else {
		PathBuf::from(stem)
	}
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
	let split = name.len().checked_sub(suffix.len())?;
	let tail = name.get(split..)?;
	tail.eq_ignore_ascii_case(suffix).then(|| &name[..split])
}

/// Make `path` absolute against `base` and fold `.` and `..` lexically.
///
/// Symlinks are left alone: an excluded path names the link, not its target.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
	let joined = if path.is_absolute() {
		path.to_path_buf()
	} else {
		base.join(path)
	};

	let mut normalized = PathBuf::new();
	for component in joined.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				normalized.pop();
			}
			other => normalized.push(other.as_os_str()),
		}
	}
	normalized
}
