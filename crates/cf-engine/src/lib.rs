//! Tick engine for the clockforge module.
//!
//! Turns a master tick stream (internal timer or external clock edges)
//! into gate and level frames for four outputs.

#![cfg_attr(not(feature = "std"), no_std)]

mod clock;
mod engine;
mod frame;
mod output;
pub mod waveform;

pub use clock::{
    ExternalClock, Forwarded, TapTempo, Tempo, BPM_HYSTERESIS, EXTERNAL_TIMEOUT_MS, TAP_TIMEOUT_MS,
};
pub use engine::{Engine, EngineConfig, DEFAULT_PPQN};
pub use frame::Frame;
pub use output::{Label, Output, TickOutput};
pub use waveform::WavePhase;
