//! Output driver trait and error types.

use cf_engine::Frame;

/// Error type for driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Channel index past the driver's last channel
    #[error("no output channel {0}")]
    NoChannel(usize),
    /// Driver used before `start` or after `stop`
    #[error("driver is not running")]
    NotRunning,
    #[error("driver I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for pin/DAC driver backends.
pub trait OutputDriver {
    /// Number of physical channels.
    fn channels(&self) -> usize;

    /// Drive one channel to `level` (DAC units; gate pins treat any
    /// non-zero level as high).
    fn write(&mut self, channel: usize, level: u16) -> Result<(), DriverError>;

    /// Push a whole frame, one channel at a time.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), DriverError> {
        for (channel, &level) in frame.levels.iter().enumerate().take(self.channels()) {
            self.write(channel, level)?;
        }
        self.flush()
    }

    /// Make written levels visible. Most backends have nothing to do.
    fn flush(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Start driving outputs.
    fn start(&mut self) -> Result<(), DriverError>;

    /// Stop driving outputs.
    fn stop(&mut self) -> Result<(), DriverError>;
}
