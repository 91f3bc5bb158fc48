//! Console backend: renders the outputs as a row of lamps and level bars.

use std::io::Write;

use cf_ir::{DAC_FULL_SCALE, NUM_OUTPUTS};

use crate::traits::{DriverError, OutputDriver};

/// Width of a level bar in characters.
const BAR_WIDTH: usize = 8;

/// Prints one line per flushed frame that differs from the last printed one.
pub struct ConsoleDriver<W: Write> {
    out: W,
    levels: [u16; NUM_OUTPUTS],
    printed: Option<[u16; NUM_OUTPUTS]>,
    running: bool,
}

impl<W: Write> ConsoleDriver<W> {
    pub fn new(out: W) -> Self {
        Self { out, levels: [0; NUM_OUTPUTS], printed: None, running: false }
    }

    /// Consume the driver and hand back the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// One display row for `levels`.
    pub fn render_row(levels: &[u16; NUM_OUTPUTS]) -> String {
        let mut row = String::new();
        for (i, &level) in levels.iter().enumerate() {
            let lamp = if level > 0 { '#' } else { '.' };
            let filled = level as usize * BAR_WIDTH / DAC_FULL_SCALE as usize;
            row.push_str(&format!(
                "{}{} [{}{}] ",
                i + 1,
                lamp,
                "=".repeat(filled),
                " ".repeat(BAR_WIDTH - filled)
            ));
        }
        row.trim_end().to_string()
    }
}

impl<W: Write> OutputDriver for ConsoleDriver<W> {
    fn channels(&self) -> usize {
        NUM_OUTPUTS
    }

    fn write(&mut self, channel: usize, level: u16) -> Result<(), DriverError> {
        if !self.running {
            return Err(DriverError::NotRunning);
        }
        let slot = self.levels.get_mut(channel).ok_or(DriverError::NoChannel(channel))?;
        *slot = level.min(DAC_FULL_SCALE);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DriverError> {
        if self.printed == Some(self.levels) {
            return Ok(());
        }
        writeln!(self.out, "{}", Self::render_row(&self.levels))?;
        self.out.flush()?;
        self.printed = Some(self.levels);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.running = false;
        self.levels = [0; NUM_OUTPUTS];
        self.printed = None;
        Ok(())
    }
}
