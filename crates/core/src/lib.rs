pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LoggingConfig, SkillsConfig};
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
