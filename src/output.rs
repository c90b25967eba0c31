use std::path::Path;

use owo_colors::OwoColorize;

use crate::archiver::Summary;

/// Dry-run listing line, on stdout so it can be piped.
pub fn planned(source: &Path, archive_path: &Path) {
	println!("{} => {}", source.display(), archive_path.display());
}

pub fn note(text: &str) {
	eprintln!("{}", text.dimmed());
}

pub fn success(message: &str) {
	eprintln!("{}", message.green().bold());
}

pub fn error(message: &str) {
	eprintln!("{} {}", "error:".red().bold(), message);
}

pub fn summary(summary: &Summary) {
	let format = summary
		.format
		.map_or_else(|| "unknown format".to_owned(), |format| format.to_string());
	if summary.dry_run {
		note(&format!(
			"{} entries would be written to {} ({format})",
			summary.entries,
			summary.output.display(),
		));
	} else {
		success(&format!(
			"Wrote {} entries to {} ({format})",
			summary.entries,
			summary.output.display(),
		));
	}
}
