//! Error taxonomy for archive creation.
//!
//! Library functions return `anyhow::Result` and attach context as they go;
//! the variants below are the failures callers may want to tell apart, and are
//! recoverable with `err.downcast_ref::<Error>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("{} is not part of a git repository", path.display())]
	NotAGitRepository { path: PathBuf },

	#[error("`{command}` failed ({}): {output}", exit_status(*code))]
	Shell {
		command: String,
		code: Option<i32>,
		output: String,
	},

	#[error("git of version 1.6.1 or higher is required, found {found}")]
	GitTooOld { found: String },

	#[error("unknown format: {0}")]
	UnknownFormat(String),

	#[error("{format} does not support compression level {level}")]
	UnsupportedCompression { format: String, level: u32 },

	#[error("unexpected output of git check-attr: {0}")]
	AttributeProtocol(String),

	#[error(
		"submodule {} is not initialized (use --force-submodules or --ignore-uninitialized-submodules)",
		path.display()
	)]
	UninitializedSubmodule { path: PathBuf },
}

fn exit_status(code: Option<i32>) -> String {
	match code {
		Some(code) => format!("exit code {code}"),
		None => "terminated by signal".to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shell_error_names_command_and_code() {
		let err = Error::Shell {
			command: "git ls-files".into(),
			code: Some(128),
			output: "fatal: not a git repository".into(),
		};
		assert_eq!(
			err.to_string(),
			"`git ls-files` failed (exit code 128): fatal: not a git repository"
		);
	}

	#[test]
	fn unsupported_compression_message() {
		let err = Error::UnsupportedCompression {
			format: "tar".into(),
			level: 3,
		};
		assert_eq!(err.to_string(), "tar does not support compression level 3");
	}
}
