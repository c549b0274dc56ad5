//! Call-graph aware source documentation with incremental page rebuilds

pub mod config;
pub mod core;
pub mod error;

pub use config::Config;
pub use error::{DocwrightError, Result};
