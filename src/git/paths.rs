//! Conversion between git's byte-oriented path output and platform paths.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Split NUL-terminated (`-z`) output into paths, dropping the empty tail.
pub fn split_nul(output: &[u8]) -> Vec<PathBuf> {
	output
		.split(|&b| b == 0)
		.filter(|chunk| !chunk.is_empty())
		.map(|chunk| bytes_to_path(chunk.to_vec()))
		.collect()
}

/// Decode a path as git prints it without `-z`.
///
/// Paths containing control characters, `"`, `\` or (with the default
/// `core.quotePath`) bytes above 0x7f are wrapped in double quotes and use
/// C-style escapes, with octal triplets for raw bytes. Anything not starting
/// with `"` is returned verbatim.
pub fn unquote_c_style(input: &[u8]) -> Vec<u8> {
	let inner = match input {
		[b'"', inner @ .., b'"'] => inner,
		_ => return input.to_vec(),
	};

	let mut out = Vec::with_capacity(inner.len());
	let mut bytes = inner.iter().copied().peekable();
	while let Some(b) = bytes.next() {
		if b != b'\\' {
			out.push(b);
			continue;
		}
		let Some(escaped) = bytes.next() else {
			out.push(b'\\');
			break;
		};
		match escaped {
			b'a' => out.push(0x07),
			b'b' => out.push(0x08),
			b't' => out.push(b'\t'),
			b'n' => out.push(b'\n'),
			b'v' => out.push(0x0b),
			b'f' => out.push(0x0c),
			b'r' => out.push(b'\r'),
			b'0'..=b'7' => {
				let mut value = u32::from(escaped - b'0');
				for _ in 0..2 {
					match bytes.peek() {
						Some(&digit @ b'0'..=b'7') => {
							value = value * 8 + u32::from(digit - b'0');
							bytes.next();
						}
						_ => break,
					}
				}
				out.push((value & 0xff) as u8);
			}
			other => out.push(other),
		}
	}
	out
}

/// Convert raw path bytes from git into a platform path.
#[cfg(unix)]
pub fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
	use std::ffi::OsString;
	use std::os::unix::ffi::OsStringExt;

	PathBuf::from(OsString::from_vec(bytes))
}

/// Convert raw path bytes from git into a platform path.
///
/// Git writes UTF-8 with forward slashes on Windows.
#[cfg(not(unix))]
pub fn bytes_to_path(bytes: Vec<u8>) -> PathBuf {
	let text = String::from_utf8_lossy(&bytes);
	PathBuf::from(text.replace('/', "\\"))
}

/// Bytes of a repository-relative path in the form git expects on stdin.
#[cfg(unix)]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
	use std::os::unix::ffi::OsStrExt;

	Cow::Borrowed(path.as_os_str().as_bytes())
}

/// Bytes of a repository-relative path in the form git expects on stdin.
#[cfg(not(unix))]
pub fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
	Cow::Owned(path.to_string_lossy().replace('\\', "/").into_bytes())
}

/// Strip one trailing line terminator, leaving other whitespace alone.
pub fn trim_line_end(mut bytes: &[u8]) -> &[u8] {
	if let [rest @ .., b'\n'] = bytes {
		bytes = rest;
	}
	if let [rest @ .., b'\r'] = bytes {
		bytes = rest;
	}
	bytes
}
