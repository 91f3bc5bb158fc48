//! `OUT:KEY=VALUE` parameter assignments, as typed on the command line.

use std::str::FromStr;

use cf_engine::Output;
use cf_ir::{Waveform, DIVIDERS, NUM_OUTPUTS};

use crate::error::Error;

/// One assignment to one output parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Setting {
    /// Zero-based output index
    pub output: usize,
    pub key: Key,
    pub value: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Divider,
    Duty,
    Phase,
    Level,
    Offset,
    Swing,
    SwingEvery,
    Probability,
    Waveform,
    Enabled,
    Euclidean,
    Steps,
    Triggers,
    Rotation,
    Pad,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Number(i32),
    Flag(bool),
    Waveform(Waveform),
}

impl Key {
    fn from_name(name: &str) -> Option<Self> {
        let key = match name.to_ascii_lowercase().as_str() {
            "div" | "divider" => Key::Divider,
            "duty" => Key::Duty,
            "phase" => Key::Phase,
            "level" => Key::Level,
            "offset" => Key::Offset,
            "swing" => Key::Swing,
            "every" | "swing-every" => Key::SwingEvery,
            "prob" | "probability" => Key::Probability,
            "wave" | "waveform" => Key::Waveform,
            "on" | "enabled" => Key::Enabled,
            "euclid" | "euclidean" => Key::Euclidean,
            "steps" => Key::Steps,
            "triggers" | "hits" => Key::Triggers,
            "rot" | "rotation" => Key::Rotation,
            "pad" => Key::Pad,
            _ => return None,
        };
        Some(key)
    }

    fn parse_value(self, raw: &str) -> Option<Value> {
        match self {
            Key::Waveform => Waveform::from_name(raw).map(Value::Waveform),
            Key::Enabled | Key::Euclidean => parse_flag(raw).map(Value::Flag),
            Key::Divider => DIVIDERS
                .iter()
                .position(|r| r.label.eq_ignore_ascii_case(raw))
                .map(|i| Value::Number(i as i32))
                .or_else(|| raw.parse().ok().map(Value::Number)),
            _ => raw.trim_end_matches('%').parse().ok().map(Value::Number),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl FromStr for Setting {
    type Err = Error;

    /// Parse `OUT:KEY=VALUE` with `OUT` counted from 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSetting(s.to_string());

        let (out, assignment) = s.split_once(':').ok_or_else(invalid)?;
        let (key, value) = assignment.split_once('=').ok_or_else(invalid)?;

        let output: usize = out.trim().parse().map_err(|_| invalid())?;
        if !(1..=NUM_OUTPUTS).contains(&output) {
            return Err(invalid());
        }
        let key = Key::from_name(key.trim()).ok_or_else(invalid)?;
        let value = key.parse_value(value.trim()).ok_or_else(invalid)?;
        Ok(Self { output: output - 1, key, value })
    }
}

impl Setting {
    /// Apply to `output` through its clamping setters.
    pub fn apply(&self, output: &mut Output) {
        match (self.key, self.value) {
            (Key::Divider, Value::Number(n)) => output.set_divider(n),
            (Key::Duty, Value::Number(n)) => output.set_duty_cycle(n),
            (Key::Phase, Value::Number(n)) => output.set_phase(n),
            (Key::Level, Value::Number(n)) => output.set_level(n),
            (Key::Offset, Value::Number(n)) => output.set_offset(n),
            (Key::Swing, Value::Number(n)) => output.set_swing_amount(n),
            (Key::SwingEvery, Value::Number(n)) => output.set_swing_every(n),
            (Key::Probability, Value::Number(n)) => output.set_probability(n),
            (Key::Waveform, Value::Waveform(w)) => output.set_waveform(w),
            (Key::Enabled, Value::Flag(on)) => output.set_enabled(on),
            (Key::Euclidean, Value::Flag(on)) => output.set_euclidean(on),
            (Key::Steps, Value::Number(n)) => output.set_euclidean_steps(n),
            (Key::Triggers, Value::Number(n)) => output.set_euclidean_triggers(n),
            (Key::Rotation, Value::Number(n)) => output.set_euclidean_rotation(n),
            (Key::Pad, Value::Number(n)) => output.set_euclidean_padding(n),
            (key, value) => log::warn!("ignoring {:?} = {:?}", key, value),
        }
    }
}
