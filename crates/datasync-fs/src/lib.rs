//! Filesystem primitives for datasync
//!
//! Provides normalized path handling, atomic file replacement and
//! format-agnostic configuration loading. Every write that touches a
//! synchronized data file goes through [`io::write_atomic`].

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use constants::SyncPath;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, validate_file_name};
