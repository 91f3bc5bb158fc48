//! Core value types for the clockforge pulse engine.
//!
//! This crate holds the fixed tables (clock dividers, swing amounts,
//! waveform shapes) and the parameter types shared by the engine, the
//! controller and whatever stores presets. The Euclidean pattern generator
//! lives here too since it is a pure function of its parameters.
//!
//! Designed to be `no_std` compatible; nothing here allocates.

#![cfg_attr(not(feature = "std"), no_std)]

mod divider;
mod euclidean;
mod params;
mod swing;
mod waveform;

pub use divider::{
    Ratio, DIVIDERS, DIVIDER_COUNT, EXTERNAL_DIVIDERS, EXTERNAL_DIVIDER_COUNT, UNITY_DIVIDER,
};
pub use euclidean::{EuclideanParams, EuclideanRhythm, MAX_STEPS};
pub use params::{OutputParams, Preset, DEFAULT_BPM, MAX_BPM, MIN_BPM, NUM_OUTPUTS};
pub use swing::{
    swing_ticks, MAX_SWING_EVERY, SWING_AMOUNTS, SWING_AMOUNT_COUNT, SWING_LABELS, SWING_UNIT,
};
pub use waveform::{OutputKind, Waveform, DAC_FULL_SCALE, MAX_WAVE};
