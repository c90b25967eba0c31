//! Tar output, optionally compressed with gzip, bzip2 or xz.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::{ArchiveWriter, Format};

/// Compression stage between the tar builder and the output file.
enum Encoder {
	Plain(File),
	Gz(flate2::write::GzEncoder<File>),
	Bz2(bzip2::write::BzEncoder<File>),
	Xz(xz2::write::XzEncoder<File>),
}

impl Encoder {
	fn new(file: File, format: Format, level: Option<u32>) -> Self {
		match format {
			Format::TarGz => {
				let compression = level.map_or_else(flate2::Compression::default, flate2::Compression::new);
				Self::Gz(flate2::write::GzEncoder::new(file, compression))
			}
			Format::TarBz2 => {
				let compression = level.map_or_else(bzip2::Compression::default, bzip2::Compression::new);
				Self::Bz2(bzip2::write::BzEncoder::new(file, compression))
			}
			Format::TarXz => Self::Xz(xz2::write::XzEncoder::new(file, level.unwrap_or(6))),
			Format::Tar | Format::Zip => Self::Plain(file),
		}
	}

	fn finish(self) -> io::Result<File> {
		match self {
			Self::Plain(file) => Ok(file),
			Self::Gz(encoder) => encoder.finish(),
			Self::Bz2(encoder) => encoder.finish(),
			Self::Xz(encoder) => encoder.finish(),
		}
	}
}

impl Write for Encoder {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self {
			Self::Plain(file) => file.write(buf),
			Self::Gz(encoder) => encoder.write(buf),
			Self::Bz2(encoder) => encoder.write(buf),
			Self::Xz(encoder) => encoder.write(buf),
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self {
			Self::Plain(file) => file.flush(),
			Self::Gz(encoder) => encoder.flush(),
			Self::Bz2(encoder) => encoder.flush(),
			Self::Xz(encoder) => encoder.flush(),
		}
	}
}

pub struct TarArchiveWriter {
	builder: tar::Builder<Encoder>,
}

impl TarArchiveWriter {
	pub fn new(file: File, format: Format, level: Option<u32>) -> Self {
		let mut builder = tar::Builder::new(Encoder::new(file, format, level));
		// Store symlinks as links instead of the files they point to.
		builder.follow_symlinks(false);
		Self { builder }
	}
}

impl ArchiveWriter for TarArchiveWriter {
	fn add(&mut self, source: &Path, name: &Path) -> Result<()> {
		self.builder
			.append_path_with_name(source, name)
			.with_context(|| format!("failed to add {} to tar archive", source.display()))
	}

	fn finish(self: Box<Self>) -> Result<File> {
		let encoder = self
			.builder
			.into_inner()
			.context("failed to finalize tar archive")?;
		encoder.finish().context("failed to finish compression stream")
	}
}
