//! Command implementations for datasync-cli

pub mod log;
pub mod status;
pub mod sync;

pub use log::run_log;
pub use status::run_status;
pub use sync::{run_init, run_pull, run_push};
