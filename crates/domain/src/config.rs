mod capture;
mod collector;
mod errors;
mod logging;
mod root;

pub use capture::CaptureConfig;
pub use collector::CollectorConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
