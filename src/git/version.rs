//! Detection of the installed git version.

use std::fmt;

use anyhow::Result;

use super::git;
use crate::error::Error;

/// Dotted version number compared segment by segment, like a tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion(Vec<u32>);

impl GitVersion {
	pub fn new(parts: impl Into<Vec<u32>>) -> Self {
		Self(parts.into())
	}

	/// Oldest git providing `ls-files --full-name --no-empty-directory`.
	pub fn minimum() -> Self {
		Self::new([1, 6, 1])
	}

	/// Parse the output of `git version`, e.g. `git version 2.39.2.windows.1`.
	///
	/// Non-numeric segments count as 0.
	pub fn parse(output: &str) -> Option<Self> {
		let version = output.split_whitespace().nth(2)?;
		let parts = version
			.split('.')
			.map(|part| part.parse::<u32>().unwrap_or(0))
			.collect();
		Some(Self(parts))
	}

	/// Whether `check-attr` honours `-z` for its output (git > 1.8.5).
	pub fn has_nul_check_attr(&self) -> bool {
		*self > Self::new([1, 8, 5])
	}
}

impl fmt::Display for GitVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
		f.write_str(&parts.join("."))
	}
}

/// Query `git version`.
///
/// Returns `None` (with a warning) when the version cannot be determined, in
/// which case callers proceed without version-dependent workarounds.
pub fn detect() -> Option<GitVersion> {
	let output = match git().arg("version").stdout_bytes() {
		Ok(output) => output,
		Err(err) => {
			tracing::warn!("unable to get git version: {err:#}");
			return None;
		}
	};
	let text = String::from_utf8_lossy(&output);
	let version = GitVersion::parse(&text);
	if version.is_none() {
		tracing::warn!("unable to parse git version {:?}", text.trim());
	}
	version
}

/// Reject versions older than [`GitVersion::minimum`].
pub fn require_supported(version: Option<&GitVersion>) -> Result<()> {
	match version {
		Some(found) if *found < GitVersion::minimum() => Err(Error::GitTooOld {
			found: found.to_string(),
		}
		.into()),
		_ => Ok(()),
	}
}
