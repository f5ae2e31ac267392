//! `ant-core` — shared configuration for the ant scheduler binaries.

pub mod config;
pub mod error;

pub use config::AntConfig;
pub use error::{CoreError, Result};
