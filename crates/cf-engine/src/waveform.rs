//! Per-output waveform render state.
//!
//! The output unit decides *when* a cycle starts and ends; this module
//! decides what each shape does in between. `render` is called once per
//! tick for every shape except the plain gate, so continuous shapes evolve
//! across the whole cycle rather than only at its edges.

use cf_ir::{Waveform, MAX_WAVE};
use core::f32::consts::{PI, TAU};
use tinyrand::Rand;

/// ln(1000): the exponential envelope falls to 0.1% over its decay window.
const EXP_DECAY_SPAN: f32 = 6.907_755;

/// Random-walk step scale for the smooth random shape.
const WALK_RATE: f32 = 0.3;

/// Single-pole low-pass coefficient for the smooth random shape.
const SMOOTHING: f32 = 0.01;

/// Coarse lifecycle of the current shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavePhase {
    Idle,
    Active,
    /// Envelope past its attack, falling toward idle on its own schedule.
    Decaying,
}

/// Cycle geometry the renderer needs, in ticks.
#[derive(Clone, Copy, Debug)]
pub struct Cycle {
    /// Ticks in one output period
    pub period: f32,
    /// Duty cycle as a fraction (0.01-0.99)
    pub duty: f32,
}

impl Cycle {
    pub fn new(period_ticks: u32, duty_percent: u8) -> Self {
        Self { period: period_ticks as f32, duty: duty_percent as f32 / 100.0 }
    }

    fn active_ticks(&self) -> f32 {
        self.period * self.duty
    }
}

/// Mutable render state. Only the output unit touches it.
#[derive(Clone, Debug)]
pub struct WaveState {
    /// Shape is armed and rendering
    active: bool,
    /// Gate as reported to the outside world
    on: bool,
    /// Triangle direction
    rising: bool,
    /// Current sample in `0..=MAX_WAVE`
    value: f32,
    /// Ticks into the sine / half-sine phase
    phase_ticks: u32,
    /// Ticks since an envelope or random shape was triggered
    elapsed: u32,
    /// Remaining idle ticks before a sawtooth re-arms
    idle_ticks: u32,
    /// Smooth random: unfiltered walk position
    walk: f32,
    /// Smooth random: filtered output
    smooth: f32,
}

impl Default for WaveState {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveState {
    pub const fn new() -> Self {
        Self {
            active: false,
            on: false,
            rising: true,
            value: 0.0,
            phase_ticks: 0,
            elapsed: 0,
            idle_ticks: 0,
            walk: MAX_WAVE / 2.0,
            smooth: MAX_WAVE / 2.0,
        }
    }

    /// Whether the output currently reports its gate as high.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Current sample in `0..=MAX_WAVE`.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn phase(&self, waveform: Waveform) -> WavePhase {
        if waveform.is_self_terminating() {
            match (self.active, self.elapsed) {
                (false, _) => WavePhase::Idle,
                (true, 0..=1) => WavePhase::Active,
                (true, _) => WavePhase::Decaying,
            }
        } else if self.on {
            WavePhase::Active
        } else {
            WavePhase::Idle
        }
    }

    /// A cycle fired: arm the shape.
    ///
    /// Under an external clock the ramp shapes keep their phase so the
    /// re-phasing edge does not chop them.
    pub fn start(&mut self, waveform: Waveform, external: bool) {
        self.active = true;
        match waveform {
            Waveform::Gate => self.on = true,
            Waveform::Triangle | Waveform::Sine | Waveform::Parabolic | Waveform::Sawtooth => {
                if !external {
                    self.value = 0.0;
                    self.rising = true;
                    self.phase_ticks = 0;
                }
                self.idle_ticks = 0;
            }
            Waveform::ExpEnvelope | Waveform::LogEnvelope => {
                self.value = MAX_WAVE;
                self.elapsed = 0;
            }
            Waveform::Random | Waveform::SmoothRandom | Waveform::SampleHold => {
                self.elapsed = 0;
                self.on = true;
            }
        }
    }

    /// A cycle came up but did not fire (probability miss or Euclidean
    /// rest). Envelopes keep decaying; everything else goes quiet.
    pub fn skip(&mut self, waveform: Waveform) {
        if waveform.is_self_terminating() {
            return;
        }
        self.active = false;
        self.on = false;
        self.rising = true;
        self.value = 0.0;
        self.phase_ticks = 0;
        self.idle_ticks = 0;
    }

    /// Duty cycle elapsed. Only the gate disarms; continuous shapes drop
    /// their gate for this tick and re-raise it while still armed.
    pub fn stop(&mut self, waveform: Waveform) {
        match waveform {
            Waveform::Gate => {
                self.on = false;
                self.active = false;
            }
            Waveform::ExpEnvelope | Waveform::LogEnvelope => {}
            _ => self.on = false,
        }
    }

    /// Return to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance the shape by one tick.
    pub fn render<R: Rand>(&mut self, waveform: Waveform, cycle: Cycle, rng: &mut R) {
        match waveform {
            Waveform::Gate => {}
            Waveform::Triangle => self.triangle(cycle),
            Waveform::Sine => self.sine(cycle),
            Waveform::Parabolic => self.parabolic(cycle),
            Waveform::Sawtooth => self.sawtooth(cycle),
            Waveform::ExpEnvelope => self.envelope(cycle, exp_curve),
            Waveform::LogEnvelope => self.envelope(cycle, log_curve),
            Waveform::Random => self.random(rng),
            Waveform::SmoothRandom => self.smooth_random(rng),
            Waveform::SampleHold => self.sample_hold(rng),
        }
    }

    fn triangle(&mut self, cycle: Cycle) {
        if !self.active {
            return;
        }
        let rising_ticks = cycle.active_ticks();
        let falling_ticks = cycle.period - rising_ticks;

        if self.rising {
            self.value += MAX_WAVE / rising_ticks;
            if self.value >= MAX_WAVE {
                self.value = MAX_WAVE;
                self.rising = false;
            }
        } else {
            self.value -= MAX_WAVE / falling_ticks;
            if self.value <= 0.0 {
                self.value = 0.0;
                self.rising = true;
            }
        }
        self.on = true;
    }

    fn sine(&mut self, cycle: Cycle) {
        if !self.active {
            return;
        }
        let period = (cycle.period as u32).max(1);
        self.phase_ticks = (self.phase_ticks + 1) % period;

        // Start the cycle at the trough.
        let angle = TAU * self.phase_ticks as f32 / period as f32 + 1.5 * PI;
        let s = libm::sinf(angle);
        let exponent = cycle.duty * 2.0;
        let warped = if s > 0.0 {
            libm::powf(s, exponent)
        } else {
            -libm::powf(-s, exponent)
        };
        self.value = warped * MAX_WAVE / 2.0 + MAX_WAVE / 2.0;
        self.on = true;
    }

    fn parabolic(&mut self, cycle: Cycle) {
        if !self.active {
            return;
        }
        self.phase_ticks += 1;
        let active_ticks = cycle.active_ticks();
        if self.phase_ticks as f32 >= active_ticks {
            // Half-sine finished: idle for the rest of the period.
            self.phase_ticks = 0;
            self.active = false;
            self.on = false;
            self.value = 0.0;
            return;
        }
        self.value = libm::sinf(PI * self.phase_ticks as f32 / active_ticks) * MAX_WAVE;
        self.on = true;
    }

    fn sawtooth(&mut self, cycle: Cycle) {
        if self.active {
            let active_ticks = cycle.active_ticks();
            self.value += MAX_WAVE / active_ticks;
            if self.value >= MAX_WAVE {
                self.value = 0.0;
                self.active = false;
                self.on = false;
                self.idle_ticks = libm::roundf(cycle.period - active_ticks) as u32;
                return;
            }
            self.on = true;
        } else {
            if self.idle_ticks > 0 {
                self.idle_ticks -= 1;
                if self.idle_ticks == 0 {
                    self.active = true;
                }
            }
            self.on = false;
        }
    }

    fn envelope(&mut self, cycle: Cycle, curve: fn(f32, f32) -> f32) {
        if !self.active {
            return;
        }
        let decay_ticks = cycle.active_ticks();
        let t = self.elapsed as f32;
        if t >= decay_ticks {
            self.value = 0.0;
            self.active = false;
            self.on = false;
            self.elapsed = 0;
            return;
        }
        self.value = curve(t, decay_ticks) * MAX_WAVE;
        self.elapsed += 1;
        self.on = true;
    }

    fn random<R: Rand>(&mut self, rng: &mut R) {
        if !self.active {
            return;
        }
        self.value = rng.next_lim_u32(MAX_WAVE as u32 + 1) as f32;
        self.elapsed = self.elapsed.saturating_add(1);
        self.on = true;
    }

    fn smooth_random<R: Rand>(&mut self, rng: &mut R) {
        if !self.active {
            return;
        }
        let step = unit_noise(rng) * (MAX_WAVE / 2.0) * WALK_RATE;
        self.walk = (self.walk + step).clamp(0.0, MAX_WAVE);
        self.smooth = SMOOTHING * self.walk + (1.0 - SMOOTHING) * self.smooth;
        self.value = self.smooth;
        self.on = true;
    }

    fn sample_hold<R: Rand>(&mut self, rng: &mut R) {
        if !self.active {
            return;
        }
        if self.elapsed == 0 {
            self.value = rng.next_lim_u32(MAX_WAVE as u32 + 1) as f32;
        }
        self.elapsed = self.elapsed.saturating_add(1);
        self.on = true;
    }
}

fn exp_curve(t: f32, decay_ticks: f32) -> f32 {
    libm::expf(-(EXP_DECAY_SPAN / decay_ticks) * t)
}

fn log_curve(t: f32, decay_ticks: f32) -> f32 {
    libm::log10f(decay_ticks - t + 1.0) / libm::log10f(decay_ticks + 1.0)
}

/// Uniform noise in `[-1, 1]`.
fn unit_noise<R: Rand>(rng: &mut R) -> f32 {
    (rng.next_u32() as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
}
