//! # tagbatch Common Library
//!
//! Shared code for the tagbatch engine and its shells:
//! - Error and result types
//! - Bootstrap TOML configuration loading and resolution
//! - Run event types and the push channel that carries them

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
