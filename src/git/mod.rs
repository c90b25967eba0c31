//! Git operations for git-archive-all.
//!
//! Everything that reads repository state shells out to the git binary through
//! the [`cmd::Git`] builder; `.gitmodules` is parsed with gix's config parser.

pub mod attributes;
pub mod cmd;
pub mod paths;
pub mod repository;
pub mod submodule;
pub mod version;

// Re-export commonly used items
pub use attributes::{AttrValue, AttributeChecker, EXPORT_IGNORE};
pub use cmd::git;
pub use version::GitVersion;
