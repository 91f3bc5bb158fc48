//! Clock sources: internal tempo, tap tempo and external clock tracking.
//!
//! These hold only timing bookkeeping. The [`Engine`](crate::Engine) wires
//! them to the outputs.

use core::time::Duration;

use cf_ir::{DEFAULT_BPM, EXTERNAL_DIVIDERS, EXTERNAL_DIVIDER_COUNT, MAX_BPM, MIN_BPM};

/// Silence on the clock input longer than this hands control back to the
/// internal clock.
pub const EXTERNAL_TIMEOUT_MS: u64 = 2000;

/// A pause between taps longer than this starts a new tap sequence.
pub const TAP_TIMEOUT_MS: u64 = 2000;

/// External tempo estimates closer than this to the current BPM are ignored.
pub const BPM_HYSTERESIS: u16 = 3;

/// Edge intervals averaged for the external tempo estimate.
const INTERVAL_WINDOW: usize = 3;

/// Taps needed for a tap-tempo estimate.
const TAP_COUNT: usize = 3;

/// Master tempo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tempo {
    bpm: u16,
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: DEFAULT_BPM }
    }
}

impl Tempo {
    pub fn new(bpm: i32) -> Self {
        let mut tempo = Self::default();
        tempo.set_bpm(bpm);
        tempo
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    /// Set the tempo, clamped to `MIN_BPM..=MAX_BPM`. Returns the value
    /// actually stored.
    pub fn set_bpm(&mut self, bpm: i32) -> u16 {
        self.bpm = bpm.clamp(MIN_BPM as i32, MAX_BPM as i32) as u16;
        self.bpm
    }

    /// Time between two subdivision ticks at `ppqn` ticks per quarter note.
    pub fn tick_period(&self, ppqn: u32) -> Duration {
        let ticks_per_minute = self.bpm as u64 * ppqn.max(1) as u64;
        Duration::from_nanos(60_000_000_000 / ticks_per_minute)
    }
}

/// Result of a raw external edge that made it through the divider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Forwarded {
    /// Tempo implied by the recent edge spacing, if there is enough history
    pub estimated_bpm: Option<u16>,
    /// This pulse took over from the internal clock
    pub connected: bool,
}

/// Tracks the external clock input.
#[derive(Clone, Debug, Default)]
pub struct ExternalClock {
    divider_index: u8,
    active: bool,
    /// Raw edges seen, used for division
    edges: u64,
    last_edge_ms: Option<u64>,
    intervals: [u64; INTERVAL_WINDOW],
    interval_count: usize,
    next_interval: usize,
}

impl ExternalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn divider_index(&self) -> usize {
        self.divider_index as usize
    }

    pub fn set_divider(&mut self, index: i32) {
        self.divider_index = index.clamp(0, EXTERNAL_DIVIDER_COUNT as i32 - 1) as u8;
    }

    pub fn divider_label(&self) -> &'static str {
        EXTERNAL_DIVIDERS[self.divider_index as usize].1
    }

    fn division(&self) -> u64 {
        EXTERNAL_DIVIDERS[self.divider_index as usize].0 as u64
    }

    /// Register a raw rising edge at `now_ms`.
    ///
    /// Returns `Some` on every edge the divider lets through. The first
    /// edge after a timeout restarts the interval history.
    pub fn edge(&mut self, now_ms: u64) -> Option<Forwarded> {
        match self.last_edge_ms {
            Some(last) if now_ms.saturating_sub(last) <= EXTERNAL_TIMEOUT_MS => {
                self.intervals[self.next_interval] = now_ms - last;
                self.next_interval = (self.next_interval + 1) % INTERVAL_WINDOW;
                self.interval_count = (self.interval_count + 1).min(INTERVAL_WINDOW);
            }
            _ => {
                self.interval_count = 0;
                self.next_interval = 0;
                self.edges = 0;
            }
        }
        self.last_edge_ms = Some(now_ms);

        let forward = self.edges % self.division() == 0;
        self.edges = self.edges.wrapping_add(1);
        if !forward {
            return None;
        }

        let connected = !self.active;
        self.active = true;
        Some(Forwarded { estimated_bpm: self.estimate_bpm(), connected })
    }

    /// Tempo of the forwarded pulse train, one pulse per quarter note.
    pub fn estimate_bpm(&self) -> Option<u16> {
        if self.interval_count == 0 {
            return None;
        }
        let sum: u64 = self.intervals[..self.interval_count].iter().sum();
        let average = sum / self.interval_count as u64;
        if average == 0 {
            return None;
        }
        let bpm = 60_000 / (average * self.division());
        Some(bpm.min(u16::MAX as u64) as u16)
    }

    /// Check for a lost clock. Returns true exactly once, when the input
    /// has been silent past the timeout.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let timed_out = match self.last_edge_ms {
            Some(last) => now_ms.saturating_sub(last) > EXTERNAL_TIMEOUT_MS,
            None => false,
        };
        if self.active && timed_out {
            self.active = false;
            return true;
        }
        false
    }
}

/// Tap tempo over three taps.
///
/// After a complete sequence further taps are ignored until the
/// tap timeout has passed.
#[derive(Clone, Debug, Default)]
pub struct TapTempo {
    taps: [u64; TAP_COUNT],
    count: usize,
    last_tap_ms: Option<u64>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Taps recorded in the current sequence.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Register a tap. Returns the new BPM (unclamped) when this tap
    /// completes a sequence.
    pub fn tap(&mut self, now_ms: u64) -> Option<u16> {
        if let Some(last) = self.last_tap_ms {
            if now_ms.saturating_sub(last) > TAP_TIMEOUT_MS {
                self.count = 0;
            }
        }
        if self.count >= TAP_COUNT {
            return None;
        }

        self.taps[self.count] = now_ms;
        self.count += 1;
        self.last_tap_ms = Some(now_ms);
        if self.count < TAP_COUNT {
            return None;
        }

        let average = (self.taps[TAP_COUNT - 1] - self.taps[0]) / (TAP_COUNT as u64 - 1);
        if average == 0 {
            return None;
        }
        Some((60_000 / average).min(u16::MAX as u64) as u16)
    }
}
