pub mod archive;
pub mod archiver;
pub mod config;
pub mod error;
pub mod git;
pub mod output;
pub mod plan;
pub mod walker;

pub use archiver::{Archiver, Summary};
pub use config::{ArchiveConfig, CreateOptions};
pub use error::Error;
