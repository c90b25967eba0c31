//! Long-lived `git check-attr` sessions.
//!
//! One [`AttributeChecker`] wraps one `git check-attr --stdin -z` process bound
//! to a repository root. Paths are written one at a time and the answer for
//! each is read back before the next request, so a whole repository is checked
//! with a single process instead of one per file.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout};

use anyhow::{Context, Result};

use super::paths::{path_to_bytes, unquote_c_style};
use super::version::GitVersion;
use super::git;
use crate::error::Error;

pub const EXPORT_IGNORE: &str = "export-ignore";

/// State of a single attribute for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
	Set,
	Unset,
	Unspecified,
	Value(Vec<u8>),
}

impl AttrValue {
	fn from_info(info: &[u8]) -> Self {
		match info {
			b"set" => Self::Set,
			b"unset" => Self::Unset,
			b"unspecified" => Self::Unspecified,
			other => Self::Value(other.to_vec()),
		}
	}
}

/// Attribute name to value, for one queried path.
pub type Attributes = BTreeMap<String, AttrValue>;

/// How `check-attr` frames its answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
	/// `<path> NUL <attr> NUL <info> NUL` per attribute.
	Nul,
	/// `<c-quoted path>: <attr>: <info> LF` per attribute (git <= 1.8.5).
	Lines,
}

pub struct AttributeChecker {
	root: PathBuf,
	attrs: Vec<String>,
	framing: Framing,
	child: Child,
	stdin: Option<ChildStdin>,
	stdout: BufReader<ChildStdout>,
}

impl AttributeChecker {
	/// Start a session for `attrs` in the repository at `root`.
	pub fn open(root: &Path, attrs: &[&str], version: Option<&GitVersion>) -> Result<Self> {
		if attrs.is_empty() {
			anyhow::bail!("at least one attribute must be checked");
		}
		let framing = match version {
			Some(version) if !version.has_nul_check_attr() => Framing::Lines,
			_ => Framing::Nul,
		};

		let mut child = git()
			.cwd(root)
			.args(["check-attr", "--stdin", "-z"])
			.args(attrs)
			.spawn_piped()?;
		let stdin = child.stdin.take().context("check-attr stdin is not piped")?;
		let stdout = child
			.stdout
			.take()
			.context("check-attr stdout is not piped")?;

		Ok(Self {
			root: root.to_path_buf(),
			attrs: attrs.iter().map(|s| (*s).to_owned()).collect(),
			framing,
			child,
			stdin: Some(stdin),
			stdout: BufReader::new(stdout),
		})
	}

	/// Look up the session's attributes for a repository-relative path.
	pub fn query(&mut self, path: &Path) -> Result<Attributes> {
		let stdin = self
			.stdin
			.as_mut()
			.context("check-attr session is already closed")?;

		let mut request = path_to_bytes(path).into_owned();
		request.push(0);
		stdin
			.write_all(&request)
			.and_then(|()| stdin.flush())
			.with_context(|| {
				format!(
					"failed to send {} to check-attr in {}",
					path.display(),
					self.root.display()
				)
			})?;

		let attributes = match self.framing {
			Framing::Nul => read_nul_response(&mut self.stdout, &self.attrs),
			Framing::Lines => read_line_response(&mut self.stdout, &self.attrs),
		};
		attributes.with_context(|| {
			format!(
				"failed to read attributes of {} in {}",
				path.display(),
				self.root.display()
			)
		})
	}

	/// Finish the session: close stdin and wait for git to exit.
	pub fn close(mut self) -> Result<()> {
		self.shutdown()
	}

	fn shutdown(&mut self) -> Result<()> {
		let Some(stdin) = self.stdin.take() else {
			return Ok(());
		};
		drop(stdin);
		let status = self
			.child
			.wait()
			.with_context(|| format!("failed to wait for check-attr in {}", self.root.display()))?;
		tracing::debug!(root = %self.root.display(), %status, "closed check-attr session");
		Ok(())
	}
}

impl Drop for AttributeChecker {
	fn drop(&mut self) {
		if let Err(err) = self.shutdown() {
			tracing::warn!("{err:#}");
		}
	}
}

fn record_value(attributes: &mut Attributes, wanted: &[String], attr: &[u8], info: &[u8]) -> Result<()> {
	let name = String::from_utf8_lossy(attr);
	if !wanted.iter().any(|w| *w == name) {
		return Err(Error::AttributeProtocol(format!("unrequested attribute {name:?}")).into());
	}
	attributes.insert(name.into_owned(), AttrValue::from_info(info));
	Ok(())
}

fn read_nul_response<R: BufRead>(reader: &mut R, wanted: &[String]) -> Result<Attributes> {
	let mut attributes = Attributes::new();
	let mut fields: [Vec<u8>; 3] = Default::default();

	for _ in wanted {
		for field in fields.iter_mut() {
			field.clear();
			let read = reader.read_until(0, field)?;
			if read == 0 || field.last() != Some(&0) {
				return Err(
					Error::AttributeProtocol("check-attr exited prematurely".to_owned()).into(),
				);
			}
			field.pop();
		}
		let [_path, attr, info] = &fields;
		record_value(&mut attributes, wanted, attr, info)?;
	}
	Ok(attributes)
}

fn read_line_response<R: BufRead>(reader: &mut R, wanted: &[String]) -> Result<Attributes> {
	let mut attributes = Attributes::new();
	let mut line = Vec::new();

	for _ in wanted {
		line.clear();
		let read = reader.read_until(b'\n', &mut line)?;
		if read == 0 || line.last() != Some(&b'\n') {
			return Err(
				Error::AttributeProtocol("check-attr exited prematurely".to_owned()).into(),
			);
		}
		line.pop();

		let malformed =
			|| Error::AttributeProtocol(String::from_utf8_lossy(&line).into_owned());
		let info_start = rfind(&line, b": ").ok_or_else(malformed)?;
		let attr_start = rfind(&line[..info_start], b": ").ok_or_else(malformed)?;

		let path = unquote_c_style(&line[..attr_start]);
		let attr = &line[attr_start + 2..info_start];
		let info = &line[info_start + 2..];
		tracing::trace!(path = %String::from_utf8_lossy(&path), "check-attr answer");
		record_value(&mut attributes, wanted, attr, info)?;
	}
	Ok(attributes)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
	haystack
		.windows(needle.len())
		.rposition(|window| window == needle)
}
