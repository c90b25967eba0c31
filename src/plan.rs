//! Ordered, collision-free list of archive entries.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One file to archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
	/// Absolute path on disk.
	pub source: PathBuf,
	/// Path inside the archive, prefix included.
	pub archive_path: PathBuf,
}

/// Entries in insertion order; the first entry for an archive path wins.
#[derive(Debug, Default)]
pub struct ArchivePlan {
	entries: Vec<PlanEntry>,
	seen: HashSet<PathBuf>,
}

impl ArchivePlan {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add an entry unless its archive path is already taken.
	///
	/// Returns `false` when the entry was dropped as a duplicate.
	pub fn push(&mut self, source: PathBuf, archive_path: PathBuf) -> bool {
		if !self.seen.insert(archive_path.clone()) {
			tracing::debug!(
				source = %source.display(),
				archive_path = %archive_path.display(),
				"archive path already planned, skipping"
			);
			return false;
		}
		self.entries.push(PlanEntry {
			source,
			archive_path,
		});
		true
	}

	pub fn contains(&self, archive_path: &Path) -> bool {
		self.seen.contains(archive_path)
	}

	pub fn entries(&self) -> &[PlanEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl IntoIterator for ArchivePlan {
	type Item = PlanEntry;
	type IntoIter = std::vec::IntoIter<PlanEntry>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}
