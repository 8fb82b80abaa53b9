//! Command implementations
//!
//! Each module corresponds to a mode of the CLI.

pub mod notify;

// Re-export commonly used types
pub use notify::{run as notify_run, NotifyArgs, NotifyOptions};
