//! Archive containers.
//!
//! An [`ArchiveWriter`] copies one file or symlink at a time into the output.
//! Writers never see directories: the plan only holds leaf entries.

pub mod tar;
pub mod zip;

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;

use crate::error::Error;

/// Sink for archive entries.
pub trait ArchiveWriter {
	/// Add the file or symlink at `source` under the archive path `name`.
	fn add(&mut self, source: &Path, name: &Path) -> Result<()>;

	/// Write trailers and flush everything to the underlying file.
	fn finish(self: Box<Self>) -> Result<File>;
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
	Tar,
	TarGz,
	TarBz2,
	TarXz,
	Zip,
}

impl Format {
	/// Map a file extension (without the dot) or format name to a format.
	pub fn from_name(name: &str) -> Result<Self> {
		match name.to_ascii_lowercase().as_str() {
			"tar" => Ok(Self::Tar),
			"tgz" | "gz" => Ok(Self::TarGz),
			"tbz2" | "bz2" => Ok(Self::TarBz2),
			"txz" | "xz" => Ok(Self::TarXz),
			"zip" => Ok(Self::Zip),
			_ => Err(Error::UnknownFormat(name.to_owned()).into()),
		}
	}

	/// Derive the format from the output path's extension.
	pub fn from_path(path: &Path) -> Result<Self> {
		let extension = path
			.extension()
			.map(|ext| ext.to_string_lossy().into_owned())
			.unwrap_or_default();
		let format = Self::from_name(&extension)?;
		tracing::debug!("output format not set explicitly, determined {format} from extension");
		Ok(format)
	}

	/// Reject compression levels the format cannot apply.
	pub fn check_level(self, level: u32) -> Result<()> {
		let supported = match self {
			Self::Tar => false,
			Self::TarBz2 => (1..=9).contains(&level),
			Self::TarGz | Self::TarXz | Self::Zip => level <= 9,
		};
		if supported {
			Ok(())
		} else {
			Err(Error::UnsupportedCompression {
				format: self.to_string(),
				level,
			}
			.into())
		}
	}

	/// Open a writer for this format on top of `file`.
	pub fn open(self, file: File, level: Option<u32>) -> Result<Box<dyn ArchiveWriter>> {
		if let Some(level) = level {
			self.check_level(level)?;
		}
		Ok(match self {
			Self::Zip => Box::new(zip::ZipArchiveWriter::new(file, level)),
			tar_format => Box::new(tar::TarArchiveWriter::new(file, tar_format, level)),
		})
	}
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Tar => "tar",
			Self::TarGz => "tar.gz",
			Self::TarBz2 => "tar.bz2",
			Self::TarXz => "tar.xz",
			Self::Zip => "zip",
		})
	}
}

impl FromStr for Format {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self> {
		let name = s.rsplit('.').next().unwrap_or(s);
		Self::from_name(name)
	}
}

/// Archive path as a `/`-separated string, for formats that store text names.
pub fn slash_name(name: &Path) -> String {
	let parts: Vec<String> = name
		.components()
		.map(|component| component.as_os_str().to_string_lossy().into_owned())
		.collect();
	parts.join("/")
}
