//! Zip output with deflate compression.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::{ArchiveWriter, slash_name};

/// Permission bits recorded for symlinks (`lrwxr-xr-x`).
const SYMLINK_PERMISSIONS: u32 = 0o755;

pub struct ZipArchiveWriter {
	writer: zip::ZipWriter<File>,
	level: Option<i64>,
}

impl ZipArchiveWriter {
	pub fn new(file: File, level: Option<u32>) -> Self {
		Self {
			writer: zip::ZipWriter::new(file),
			level: level.map(i64::from),
		}
	}

	/// Level 0 stores entries uncompressed; deflate rejects it.
	fn options(&self) -> SimpleFileOptions {
		match self.level {
			Some(0) => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
			level => SimpleFileOptions::default()
				.compression_method(CompressionMethod::Deflated)
				.compression_level(level),
		}
	}
}

impl ArchiveWriter for ZipArchiveWriter {
	fn add(&mut self, source: &Path, name: &Path) -> Result<()> {
		warn_if_lossy(name, "entry name");
		let name = slash_name(name);
		let metadata = fs::symlink_metadata(source)
			.with_context(|| format!("failed to read metadata of {}", source.display()))?;

		if metadata.file_type().is_symlink() {
			let target = fs::read_link(source)
				.with_context(|| format!("failed to read link {}", source.display()))?;
			warn_if_lossy(&target, "link target");
			// add_symlink marks the entry as a Unix symlink (S_IFLNK) and
			// stores the target as its contents.
			let options = self.options().unix_permissions(SYMLINK_PERMISSIONS);
			self.writer
				.add_symlink(name, target.to_string_lossy(), options)
				.with_context(|| format!("failed to add link {} to zip archive", source.display()))?;
			return Ok(());
		}

		let options = self
			.options()
			.unix_permissions(file_mode(&metadata))
			.large_file(metadata.len() >= u64::from(u32::MAX));
		self.writer
			.start_file(name, options)
			.with_context(|| format!("failed to add {} to zip archive", source.display()))?;
		let mut input =
			File::open(source).with_context(|| format!("failed to open {}", source.display()))?;
		io::copy(&mut input, &mut self.writer)
			.with_context(|| format!("failed to compress {}", source.display()))?;
		Ok(())
	}

	fn finish(self: Box<Self>) -> Result<File> {
		self.writer.finish().context("failed to finalize zip archive")
	}
}

/// Zip stores text; non-UTF-8 bytes become U+FFFD.
fn warn_if_lossy(path: &Path, what: &str) {
	if path.to_str().is_none() {
		tracing::warn!("{what} {} is not valid UTF-8, stored lossily in zip archive", path.display());
	}
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
	use std::os::unix::fs::PermissionsExt;

	metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &fs::Metadata) -> u32 {
	if metadata.permissions().readonly() {
		0o444
	} else {
		0o644
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Read;

	#[test]
	fn files_round_trip_with_forward_slash_names() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.txt"), "Readability counts.").unwrap();

		let output = tempfile::tempfile().unwrap();
		let mut writer: Box<dyn ArchiveWriter> = Box::new(ZipArchiveWriter::new(output, Some(9)));
		writer
			.add(&dir.path().join("a.txt"), Path::new("pkg/docs/a.txt"))
			.unwrap();
		let file = writer.finish().unwrap();

		let mut archive = zip::ZipArchive::new(file).unwrap();
		let mut entry = archive.by_name("pkg/docs/a.txt").unwrap();
		let mut contents = String::new();
		entry.read_to_string(&mut contents).unwrap();
		assert_eq!(contents, "Readability counts.");
	}

	#[test]
	fn level_zero_stores_entries() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.txt"), "Flat is better than nested.").unwrap();

		let output = tempfile::tempfile().unwrap();
		let mut writer: Box<dyn ArchiveWriter> = Box::new(ZipArchiveWriter::new(output, Some(0)));
		writer.add(&dir.path().join("a.txt"), Path::new("a.txt")).unwrap();
		let file = writer.finish().unwrap();

		let mut archive = zip::ZipArchive::new(file).unwrap();
		let mut entry = archive.by_name("a.txt").unwrap();
		assert_eq!(entry.compression(), CompressionMethod::Stored);
		let mut contents = String::new();
		entry.read_to_string(&mut contents).unwrap();
		assert_eq!(contents, "Flat is better than nested.");
	}

	#[cfg(target_os = "linux")]
	#[test]
	fn non_utf8_names_are_replaced() {
		use std::ffi::OsStr;
		use std::os::unix::ffi::OsStrExt;

		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join(OsStr::from_bytes(b"\xff.dat"));
		fs::write(&source, "bytes").unwrap();

		let output = tempfile::tempfile().unwrap();
		let mut writer: Box<dyn ArchiveWriter> = Box::new(ZipArchiveWriter::new(output, None));
		writer
			.add(&source, Path::new(OsStr::from_bytes(b"pkg/\xff.dat")))
			.unwrap();
		let file = writer.finish().unwrap();

		let archive = zip::ZipArchive::new(file).unwrap();
		let names: Vec<&str> = archive.file_names().collect();
		assert_eq!(names, ["pkg/\u{fffd}.dat"]);
	}

	#[cfg(unix)]
	#[test]
	fn symlinks_carry_link_mode_and_target() {
		let dir = tempfile::tempdir().unwrap();
		std::os::unix::fs::symlink("../elsewhere", dir.path().join("link")).unwrap();

		let output = tempfile::tempfile().unwrap();
		let mut writer: Box<dyn ArchiveWriter> = Box::new(ZipArchiveWriter::new(output, None));
		writer.add(&dir.path().join("link"), Path::new("pkg/link")).unwrap();
		let file = writer.finish().unwrap();

		let mut archive = zip::ZipArchive::new(file).unwrap();
		let mut entry = archive.by_name("pkg/link").unwrap();
		assert_eq!(entry.unix_mode().map(|mode| mode & 0o170000), Some(0o120000));
		let mut target = String::new();
		entry.read_to_string(&mut target).unwrap();
		assert_eq!(target, "../elsewhere");
	}
}
