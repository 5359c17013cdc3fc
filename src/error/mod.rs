mod app;
mod config;
mod session;
mod validation;
mod wire;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use session::{FailureKind, SessionError};
pub use validation::ValidationError;
pub use wire::WireError;
