//! tagbatch engine library
//!
//! Reconciles image scans in a directory with spreadsheet records and
//! writes the record fields into each file through exiftool, several files
//! at a time.

pub mod config;
pub mod models;
pub mod run;
pub mod services;

pub use config::RunConfig;
pub use run::{start, RunHandle};
pub use tagbatch_common::{Error, Result};

/// Version string with build metadata
pub fn version_string() -> String {
    format!(
        "{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("TAGBATCH_GIT_HASH"),
        env!("TAGBATCH_BUILD_DATE"),
        env!("TAGBATCH_BUILD_PROFILE"),
    )
}
