//! Controller error type.

use cf_io::DriverError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to spawn clock thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("invalid setting '{0}', expected OUT:KEY=VALUE")]
    InvalidSetting(String),
    #[error("output driver: {0}")]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
