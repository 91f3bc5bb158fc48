//! Persistable parameter sets.
//!
//! `OutputParams` carries every user-editable field of one output and
//! `Preset` bundles the four outputs with the master clock settings. These
//! are the shapes a parameter store loads and saves; how they are encoded
//! on flash is up to the store.

use crate::divider::{DIVIDER_COUNT, EXTERNAL_DIVIDER_COUNT, UNITY_DIVIDER};
use crate::euclidean::EuclideanParams;
use crate::swing::{MAX_SWING_EVERY, SWING_AMOUNT_COUNT};
use crate::waveform::Waveform;

/// Number of physical outputs on the module.
pub const NUM_OUTPUTS: usize = 4;

pub const MIN_BPM: u16 = 10;
pub const MAX_BPM: u16 = 300;
pub const DEFAULT_BPM: u16 = 120;

/// Editable settings of a single output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputParams {
    /// Index into `DIVIDERS`
    pub divider_index: u8,
    /// Percent of the period the gate stays high (1-99)
    pub duty_cycle: u8,
    /// Phase shift in percent of one period (0-100)
    pub phase: u8,
    /// DAC output level in percent (0-100)
    pub level: u8,
    /// DAC output offset in percent (0-100)
    pub offset: u8,
    /// Index into `SWING_AMOUNTS`
    pub swing_index: u8,
    /// Swing applies on every Nth cycle (1-16)
    pub swing_every: u8,
    /// Chance in percent that a cycle fires (0-100)
    pub probability: u8,
    /// Per-output run state
    pub enabled: bool,
    pub waveform: Waveform,
    pub euclidean: EuclideanParams,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            divider_index: UNITY_DIVIDER as u8,
            duty_cycle: 50,
            phase: 0,
            level: 100,
            offset: 0,
            swing_index: 0,
            swing_every: 2,
            probability: 100,
            enabled: true,
            waveform: Waveform::Gate,
            euclidean: EuclideanParams::default(),
        }
    }
}

impl OutputParams {
    /// Return a copy with every field forced into its legal range.
    pub fn clamped(self) -> Self {
        Self {
            divider_index: self.divider_index.min(DIVIDER_COUNT as u8 - 1),
            duty_cycle: self.duty_cycle.clamp(1, 99),
            phase: self.phase.min(100),
            level: self.level.min(100),
            offset: self.offset.min(100),
            swing_index: self.swing_index.min(SWING_AMOUNT_COUNT as u8 - 1),
            swing_every: self.swing_every.clamp(1, MAX_SWING_EVERY),
            probability: self.probability.min(100),
            enabled: self.enabled,
            waveform: self.waveform,
            euclidean: self.euclidean.clamped(),
        }
    }
}

/// A complete module snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preset {
    pub bpm: u16,
    /// Index into `EXTERNAL_DIVIDERS`
    pub external_divider_index: u8,
    pub outputs: [OutputParams; NUM_OUTPUTS],
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            external_divider_index: 0,
            outputs: [OutputParams::default(); NUM_OUTPUTS],
        }
    }
}

impl Preset {
    /// Return a copy with every field forced into its legal range.
    pub fn clamped(self) -> Self {
        Self {
            bpm: self.bpm.clamp(MIN_BPM, MAX_BPM),
            external_divider_index: self
                .external_divider_index
                .min(EXTERNAL_DIVIDER_COUNT as u8 - 1),
            outputs: self.outputs.map(OutputParams::clamped),
        }
    }
}
