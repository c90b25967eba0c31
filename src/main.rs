use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser};
use git_archive_all::archive::Format;
use git_archive_all::config::default_prefix;
use git_archive_all::{ArchiveConfig, Archiver, CreateOptions, output};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
	name = "git-archive-all",
	about = "Archive a git repository together with all of its submodules",
	long_about = "git-archive-all writes every tracked file of a repository and of its \
                  submodules, recursively, into one tar or zip archive. Paths marked \
                  export-ignore in .gitattributes are left out at every level.",
	version
)]
struct Cli {
	/// Archive to create. Its extension selects the format unless --format is given.
	output: PathBuf,

	/// Prepend PREFIX to each path in the archive. Defaults to the output file
	/// name without its archive extensions; pass an empty string to disable.
	#[arg(long, value_name = "PREFIX")]
	prefix: Option<String>,

	/// Repository to archive (defaults to the current directory).
	#[arg(short = 'C', long = "repo", value_name = "PATH")]
	repo: Option<PathBuf>,

	/// Additional file or directory to add, tracked or not. Repeatable.
	#[arg(long, alias = "extra", value_name = "PATH")]
	include: Vec<PathBuf>,

	/// File or directory to leave out even if tracked. Repeatable.
	#[arg(long, value_name = "PATH")]
	exclude: Vec<PathBuf>,

	/// Ignore the [-]export-ignore attribute in .gitattributes.
	#[arg(long, visible_alias = "no-export-ignore", alias = "no-exclude")]
	ignore_gitattributes: bool,

	/// Skip submodules that are not checked out instead of failing.
	#[arg(long)]
	ignore_uninitialized_submodules: bool,

	/// Run `git submodule init && git submodule update` at each level first.
	#[arg(long)]
	force_submodules: bool,

	/// Show what would be archived without creating the archive.
	#[arg(long)]
	dry_run: bool,

	/// Archive format: tar, tgz, tbz2, txz or zip.
	#[arg(long, value_name = "FORMAT")]
	format: Option<Format>,

	/// Enable verbose logging.
	#[arg(short, long)]
	verbose: bool,

	#[command(flatten)]
	compression: CompressionLevel,
}

/// `-0` through `-9`.
#[derive(Args, Debug)]
#[group(id = "compression", multiple = false)]
struct CompressionLevel {
	#[arg(short = '0', hide = true)]
	level_0: bool,
	#[arg(short = '1', hide = true)]
	level_1: bool,
	#[arg(short = '2', hide = true)]
	level_2: bool,
	#[arg(short = '3', hide = true)]
	level_3: bool,
	#[arg(short = '4', hide = true)]
	level_4: bool,
	#[arg(short = '5', hide = true)]
	level_5: bool,
	#[arg(short = '6', hide = true)]
	level_6: bool,
	#[arg(short = '7', hide = true)]
	level_7: bool,
	#[arg(short = '8', hide = true)]
	level_8: bool,
	#[arg(short = '9', hide = true)]
	level_9: bool,
}

impl CompressionLevel {
	fn value(&self) -> Option<u32> {
		[
			self.level_0,
			self.level_1,
			self.level_2,
			self.level_3,
			self.level_4,
			self.level_5,
			self.level_6,
			self.level_7,
			self.level_8,
			self.level_9,
		]
		.iter()
		.position(|&set| set)
		.and_then(|level| u32::try_from(level).ok())
	}
}

fn init_logging(verbose: bool) {
	let default = if verbose { "git_archive_all=debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.without_time()
		.compact()
		.init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
	let prefix = match cli.prefix {
		Some(prefix) => PathBuf::from(prefix),
		None => default_prefix(&cli.output),
	};

	let mut config = ArchiveConfig::new()
		.prefix(prefix)
		.export_ignore(!cli.ignore_gitattributes)
		.force_submodules(cli.force_submodules)
		.ignore_uninitialized_submodules(cli.ignore_uninitialized_submodules);
	if let Some(repo) = cli.repo {
		config = config.repo(repo);
	}
	config.includes = cli.include;
	config.excludes = cli.exclude;

	let archiver = Archiver::new(config)?;
	let summary = archiver.create(
		&cli.output,
		&CreateOptions {
			dry_run: cli.dry_run,
			format: cli.format,
			compression_level: cli.compression.value(),
		},
	)?;
	output::summary(&summary);
	Ok(())
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	if cli.output.is_dir() {
		Cli::command()
			.error(
				ErrorKind::InvalidValue,
				format!("{} is a directory, not an output file", cli.output.display()),
			)
			.exit();
	}

	init_logging(cli.verbose);
	tracing::debug!("parsed arguments: {:?}", cli);

	match run(cli) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			output::error(&format!("{err:#}"));
			ExitCode::from(2)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn digit_flags_select_compression_level() {
		let cli = Cli::try_parse_from(["git-archive-all", "-7", "out.tgz"]).unwrap();
		assert_eq!(cli.compression.value(), Some(7));
		let cli = Cli::try_parse_from(["git-archive-all", "out.tgz"]).unwrap();
		assert_eq!(cli.compression.value(), None);
	}

	#[test]
	fn conflicting_levels_are_rejected() {
		assert!(Cli::try_parse_from(["git-archive-all", "-1", "-9", "out.tgz"]).is_err());
	}

	#[test]
	fn legacy_aliases_are_accepted() {
		let cli = Cli::try_parse_from([
			"git-archive-all",
			"--no-exclude",
			"--extra",
			"NOTICE",
			"-C",
			"repo",
			"out.zip",
		])
		.unwrap();
		assert!(cli.ignore_gitattributes);
		assert_eq!(cli.include, vec![PathBuf::from("NOTICE")]);
		assert_eq!(cli.repo, Some(PathBuf::from("repo")));
	}

	#[test]
	fn empty_prefix_is_allowed() {
		let cli = Cli::try_parse_from(["git-archive-all", "--prefix", "", "out.tar"]).unwrap();
		assert_eq!(cli.prefix.as_deref(), Some(""));
	}

	#[test]
	fn exactly_one_output_is_required() {
		assert!(Cli::try_parse_from(["git-archive-all"]).is_err());
		assert!(Cli::try_parse_from(["git-archive-all", "a.tar", "b.tar"]).is_err());
	}
}
