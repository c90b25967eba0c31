//! Git command execution.
//!
//! Every git invocation goes through the [`Git`] builder. Arguments are kept as
//! `OsString` and handed to the process directly, so paths with quotes,
//! brackets, trailing whitespace or non-UTF-8 bytes reach git untouched.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

use anyhow::{Context, Result};

use crate::error::Error;

/// Builder for git commands.
#[derive(Debug, Default)]
pub struct Git {
	cwd: Option<PathBuf>,
	args: Vec<OsString>,
}

impl Git {
	/// Set the current working directory for the command.
	pub fn cwd(mut self, path: &Path) -> Self {
		self.cwd = Some(path.to_path_buf());
		self
	}

	/// Add multiple arguments.
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		self.args
			.extend(args.into_iter().map(|s| s.as_ref().to_os_string()));
		self
	}

	/// Add a single argument.
	pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
		self.args.push(arg.as_ref().to_os_string());
		self
	}

	/// Human readable command line, used in logs and errors.
	pub fn describe(&self) -> String {
		let mut desc = String::from("git");
		for arg in &self.args {
			desc.push(' ');
			desc.push_str(&arg.to_string_lossy());
		}
		desc
	}

	fn command(&self) -> Command {
		let mut cmd = Command::new("git");
		if let Some(ref cwd) = self.cwd {
			cmd.current_dir(cwd);
		}
		cmd.args(&self.args);
		cmd
	}

	/// Execute and return raw output.
	pub fn output(self) -> Result<Output> {
		tracing::trace!(command = %self.describe(), cwd = ?self.cwd, "running git");
		self.command()
			.stdin(Stdio::null())
			.output()
			.with_context(|| format!("failed to execute: {}", self.describe()))
	}

	/// Execute and return stdout bytes, failing with [`Error::Shell`] on a
	/// non-zero exit.
	pub fn stdout_bytes(self) -> Result<Vec<u8>> {
		let desc = self.describe();
		let out = self.output()?;
		if !out.status.success() {
			let captured = if out.stderr.is_empty() {
				&out.stdout
			} else {
				&out.stderr
			};
			return Err(Error::Shell {
				command: desc,
				code: out.status.code(),
				output: String::from_utf8_lossy(captured).trim().to_owned(),
			}
			.into());
		}
		Ok(out.stdout)
	}

	/// Execute and require success.
	pub fn run(self) -> Result<()> {
		self.stdout_bytes().map(drop)
	}

	/// Spawn with piped stdin/stdout for request/response sessions.
	///
	/// `GIT_FLUSH=1` makes git flush its output after every record so that a
	/// blocking reader never waits on buffered data.
	pub fn spawn_piped(self) -> Result<Child> {
		tracing::debug!(command = %self.describe(), cwd = ?self.cwd, "spawning git session");
		self.command()
			.env("GIT_FLUSH", "1")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.spawn()
			.with_context(|| format!("failed to spawn: {}", self.describe()))
	}
}

/// Create a new git command builder.
pub fn git() -> Git {
	Git::default()
}
