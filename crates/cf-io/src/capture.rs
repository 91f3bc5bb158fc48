//! In-memory backend that records every flushed frame.

use cf_ir::NUM_OUTPUTS;

use crate::traits::{DriverError, OutputDriver};

/// Keeps the level history per flush. Useful for tests and offline
/// inspection.
#[derive(Debug, Default)]
pub struct CaptureDriver {
    pending: [u16; NUM_OUTPUTS],
    history: Vec<[u16; NUM_OUTPUTS]>,
    running: bool,
}

impl CaptureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[[u16; NUM_OUTPUTS]] {
        &self.history
    }

    /// Number of low-to-high transitions seen on `channel`.
    pub fn rising_edges(&self, channel: usize) -> usize {
        let mut previous = 0;
        let mut count = 0;
        for levels in &self.history {
            let level = levels.get(channel).copied().unwrap_or(0);
            if previous == 0 && level > 0 {
                count += 1;
            }
            previous = level;
        }
        count
    }
}

impl OutputDriver for CaptureDriver {
    fn channels(&self) -> usize {
        NUM_OUTPUTS
    }

    fn write(&mut self, channel: usize, level: u16) -> Result<(), DriverError> {
        if !self.running {
            return Err(DriverError::NotRunning);
        }
        let slot = self.pending.get_mut(channel).ok_or(DriverError::NoChannel(channel))?;
        *slot = level;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DriverError> {
        self.history.push(self.pending);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        log::debug!("capture driver started");
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_engine::{Engine, EngineConfig};

    #[test]
    fn records_engine_frames() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.output_mut(1).set_divider(11); // x2
        let mut driver = CaptureDriver::new();
        driver.start().unwrap();
        for _ in 0..96 * 2 {
            let frame = engine.tick();
            driver.write_frame(&frame).unwrap();
        }
        assert_eq!(driver.history().len(), 192);
        assert_eq!(driver.rising_edges(0), 2);
        assert_eq!(driver.rising_edges(1), 4);
    }
}
