//! Waveform shapes and output kinds.

/// Internal amplitude domain for rendered shapes: samples live in
/// `0.0..=MAX_WAVE` before level/offset shaping.
pub const MAX_WAVE: f32 = 255.0;

/// Full-scale value of the 12-bit DAC.
pub const DAC_FULL_SCALE: u16 = 4095;

/// How a physical output is driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputKind {
    /// Logic-level gate pin: high or low only.
    #[default]
    Digital,
    /// DAC channel: continuous level with level/offset shaping.
    Dac,
}

/// Shape rendered by an output on each cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Plain on/off gate.
    #[default]
    Gate,
    Triangle,
    Sine,
    Parabolic,
    Sawtooth,
    ExpEnvelope,
    LogEnvelope,
    Random,
    SmoothRandom,
    SampleHold,
}

impl Waveform {
    /// Every shape, in menu order.
    pub const ALL: [Waveform; 10] = [
        Waveform::Gate,
        Waveform::Triangle,
        Waveform::Sine,
        Waveform::Parabolic,
        Waveform::Sawtooth,
        Waveform::ExpEnvelope,
        Waveform::LogEnvelope,
        Waveform::Random,
        Waveform::SmoothRandom,
        Waveform::SampleHold,
    ];

    /// Shape at a menu index; out-of-range indices clamp to the last shape.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short display name as shown on the module's screen.
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Gate => "Square",
            Waveform::Triangle => "Triangle",
            Waveform::Sine => "Sine",
            Waveform::Parabolic => "Parabolic",
            Waveform::Sawtooth => "Sawtooth",
            Waveform::ExpEnvelope => "ExpEnvelope",
            Waveform::LogEnvelope => "LogEnvelope",
            Waveform::Random => "Random",
            Waveform::SmoothRandom => "SmoothRdn",
            Waveform::SampleHold => "S&H",
        }
    }

    /// Parse a shape from its display name or variant name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| {
            w.name().eq_ignore_ascii_case(name) || w.variant_name().eq_ignore_ascii_case(name)
        })
    }

    fn variant_name(self) -> &'static str {
        match self {
            Waveform::Gate => "gate",
            Waveform::SmoothRandom => "smoothrandom",
            Waveform::SampleHold => "samplehold",
            other => other.name(),
        }
    }

    /// Envelopes run their own decay and ignore the duty-cycle cutoff.
    pub fn is_self_terminating(self) -> bool {
        matches!(self, Waveform::ExpEnvelope | Waveform::LogEnvelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_round_trip() {
        for (i, w) in Waveform::ALL.iter().enumerate() {
            assert_eq!(w.index(), i);
            assert_eq!(Waveform::from_index(i), *w);
        }
    }

    #[test]
    fn from_index_clamps() {
        assert_eq!(Waveform::from_index(42), Waveform::SampleHold);
    }

    #[test]
    fn from_name_accepts_both_spellings() {
        assert_eq!(Waveform::from_name("square"), Some(Waveform::Gate));
        assert_eq!(Waveform::from_name("gate"), Some(Waveform::Gate));
        assert_eq!(Waveform::from_name("S&H"), Some(Waveform::SampleHold));
        assert_eq!(Waveform::from_name("smoothrandom"), Some(Waveform::SmoothRandom));
        assert_eq!(Waveform::from_name("wobble"), None);
    }

    #[test]
    fn only_envelopes_self_terminate() {
        let envelopes: usize = Waveform::ALL.iter().filter(|w| w.is_self_terminating()).count();
        assert_eq!(envelopes, 2);
        assert!(!Waveform::Gate.is_self_terminating());
    }
}
