pub mod config;
pub mod error;
pub mod limits;
pub mod templates;

pub use config::Config;
pub use error::ConfigError;
pub use limits::{NoteScanLimits, NoteTitleLimits};
