//! A single clock output: parameters plus the per-tick state machine.

use core::fmt::Write;

use cf_ir::{
    swing_ticks, EuclideanParams, EuclideanRhythm, OutputKind, OutputParams, Ratio, Waveform,
    DAC_FULL_SCALE, DIVIDERS, DIVIDER_COUNT, MAX_SWING_EVERY, MAX_WAVE, SWING_AMOUNT_COUNT,
    SWING_LABELS, UNITY_DIVIDER,
};
use tinyrand::Rand;

use crate::waveform::{Cycle, WavePhase, WaveState};

/// Short display string for the UI.
pub type Label = heapless::String<8>;

/// What one output emits on a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutput {
    pub gate: bool,
    /// Level in DAC units (`0..=DAC_FULL_SCALE`). Digital outputs emit
    /// either 0 or full scale.
    pub level: u16,
}

/// One physical output channel.
///
/// Setters clamp silently and never fail. `tick` runs in the timer
/// interrupt path: it never allocates, never blocks and does constant
/// work per call.
#[derive(Clone, Debug)]
pub struct Output {
    id: u8,
    kind: OutputKind,
    params: OutputParams,
    rhythm: EuclideanRhythm,
    /// Euclidean cursor into `rhythm`
    step: usize,
    wave: WaveState,
    /// Per-output enabled flag captured when the master pause engaged
    saved_enabled: bool,
    master_running: bool,
    external: bool,
    /// External pulses seen since the external clock took over
    pulse_count: u64,
    /// An external pulse arrived and has not been consumed by `tick` yet
    pulse_pending: bool,
    /// Ticks since the last externally clocked cycle start
    pulse_ticks: u64,
    last: TickOutput,
    /// Gate value reported by the last `gate_changed` call
    seen_gate: bool,
}

impl Output {
    pub fn new(id: u8, kind: OutputKind) -> Self {
        let params = OutputParams::default();
        Self {
            id,
            kind,
            params,
            rhythm: EuclideanRhythm::generate(&params.euclidean),
            step: 0,
            wave: WaveState::new(),
            saved_enabled: params.enabled,
            master_running: true,
            external: false,
            pulse_count: 0,
            pulse_pending: false,
            pulse_ticks: 0,
            last: TickOutput::default(),
            seen_gate: false,
        }
    }

    // --- Tick ---

    /// Advance this output by one subdivision tick.
    ///
    /// `ppqn` is the active resolution and `global_tick` the shared tick
    /// counter. Returns the gate and level for this tick; a divider that
    /// resolves to a zero-length period leaves the previous output as is.
    pub fn tick<R: Rand>(&mut self, ppqn: u32, global_tick: u64, rng: &mut R) -> TickOutput {
        if !self.params.enabled {
            self.wave.reset();
            self.pulse_pending = false;
            return self.emit();
        }

        let ratio = self.ratio();
        let period = ratio.period_ticks(ppqn);
        if period == 0 {
            return self.last;
        }

        if self.external && ratio.is_division() {
            // The external pulse train sets the period: count pulses.
            let per_cycle = ratio.pulses_per_cycle() as u64;
            let mut started = false;
            if core::mem::take(&mut self.pulse_pending) {
                let position = self.pulse_count.wrapping_sub(1) % per_cycle;
                if position == 0 {
                    self.cycle_start(rng);
                    self.pulse_ticks = 0;
                    started = true;
                } else if position == self.pulse_duration(per_cycle as u32) {
                    self.cycle_end();
                }
            }
            // One pulse per cycle leaves no pulse to end on; fall back to ticks.
            if per_cycle == 1 && !started {
                self.pulse_ticks = self.pulse_ticks.saturating_add(1);
                if self.pulse_ticks == self.pulse_duration(period) {
                    self.cycle_end();
                }
            }
        } else {
            let position = self.cycle_position(ppqn, period, global_tick);
            if position == 0 || global_tick == 0 {
                self.cycle_start(rng);
            } else if position == self.pulse_duration(period) {
                self.cycle_end();
            }
        }

        if self.params.waveform != Waveform::Gate {
            let cycle = Cycle::new(period, self.params.duty_cycle);
            self.wave.render(self.params.waveform, cycle, rng);
        }

        self.emit()
    }

    /// Count one (already divided) external clock pulse. The next `tick`
    /// uses it when this output divides an external clock.
    pub fn external_pulse(&mut self) {
        self.pulse_count = self.pulse_count.wrapping_add(1);
        self.pulse_pending = true;
    }

    /// Offset of `global_tick` into the current cycle after swing and
    /// phase shift.
    fn cycle_position(&self, ppqn: u32, period: u32, global_tick: u64) -> u64 {
        let period = period as i64;
        let tick = global_tick as i64;
        let every = self.params.swing_every.max(1) as i64;

        let swung = if (tick / period) % every == 0 {
            tick - swing_ticks(self.params.swing_index as usize, ppqn) as i64
        } else {
            tick
        };
        let phase_offset = period * self.params.phase as i64 / 100;
        (swung - phase_offset).rem_euclid(period) as u64
    }

    /// Ticks (or external pulses) the gate stays high. At least one so a
    /// falling edge always exists for periods longer than one unit.
    fn pulse_duration(&self, period: u32) -> u64 {
        (period as u64 * self.params.duty_cycle as u64 / 100).max(1)
    }

    fn cycle_start<R: Rand>(&mut self, rng: &mut R) {
        let fire = if self.params.euclidean.enabled {
            let hit = self.rhythm.get(self.step);
            self.step += 1;
            if self.step >= self.rhythm.len() {
                self.step = 0;
            }
            hit
        } else {
            rng.next_lim_u32(100) < self.params.probability as u32
        };

        if fire {
            self.wave.start(self.params.waveform, self.external);
        } else {
            self.wave.skip(self.params.waveform);
        }
    }

    fn cycle_end(&mut self) {
        if !self.params.waveform.is_self_terminating() {
            self.wave.stop(self.params.waveform);
        }
    }

    fn emit(&mut self) -> TickOutput {
        let gate = self.wave.is_on();
        self.last = TickOutput { gate, level: self.level_for(gate) };
        self.last
    }

    /// Map the gate and rendered sample to DAC units.
    fn level_for(&self, gate: bool) -> u16 {
        match self.kind {
            OutputKind::Digital => {
                if gate {
                    DAC_FULL_SCALE
                } else {
                    0
                }
            }
            OutputKind::Dac => {
                let offset = self.params.offset as f32 / 100.0 * MAX_WAVE;
                let shaped = if gate {
                    let sample = match self.params.waveform {
                        Waveform::Gate => MAX_WAVE,
                        _ => self.wave.value(),
                    };
                    (sample * self.params.level as f32 / 100.0 + offset).clamp(0.0, MAX_WAVE)
                } else {
                    offset
                };
                (shaped * DAC_FULL_SCALE as f32 / MAX_WAVE) as u16
            }
        }
    }

    // --- Run state ---

    pub fn is_enabled(&self) -> bool {
        self.params.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.params.enabled = enabled;
    }

    pub fn toggle_enabled(&mut self) {
        self.set_enabled(!self.params.enabled);
    }

    /// Master pause/resume. Pausing remembers this output's own enabled
    /// flag; resuming puts it back.
    pub fn set_master_state(&mut self, running: bool) {
        if self.master_running == running {
            return;
        }
        self.master_running = running;
        if running {
            self.params.enabled = self.saved_enabled;
        } else {
            self.saved_enabled = self.params.enabled;
            self.params.enabled = false;
        }
    }

    pub fn toggle_master_state(&mut self) {
        self.set_master_state(!self.master_running);
    }

    pub fn is_master_running(&self) -> bool {
        self.master_running
    }

    /// Mark this output as slaved to (or released from) an external clock.
    ///
    /// The divider setting is left alone; sub-unity ratios already in place
    /// switch to pulse counting.
    pub fn set_external_clock(&mut self, external: bool) {
        if self.external == external {
            return;
        }
        self.external = external;
        self.pulse_count = 0;
        self.pulse_pending = false;
        self.pulse_ticks = 0;
    }

    pub fn is_external_clock(&self) -> bool {
        self.external
    }

    // --- Divider ---

    pub fn ratio(&self) -> Ratio {
        DIVIDERS[self.params.divider_index as usize]
    }

    pub fn divider_index(&self) -> usize {
        self.params.divider_index as usize
    }

    /// Under an external clock only the `x1` and faster ratios are legal.
    pub fn set_divider(&mut self, index: i32) {
        let low = if self.external { UNITY_DIVIDER as i32 } else { 0 };
        self.params.divider_index = index.clamp(low, DIVIDER_COUNT as i32 - 1) as u8;
    }

    pub fn divider_label(&self) -> &'static str {
        self.ratio().label
    }

    // --- Duty cycle, phase, level, offset ---

    pub fn duty_cycle(&self) -> u8 {
        self.params.duty_cycle
    }

    pub fn set_duty_cycle(&mut self, duty: i32) {
        self.params.duty_cycle = duty.clamp(1, 99) as u8;
    }

    pub fn duty_cycle_label(&self) -> Label {
        percent_label(self.params.duty_cycle)
    }

    pub fn phase(&self) -> u8 {
        self.params.phase
    }

    pub fn set_phase(&mut self, phase: i32) {
        self.params.phase = phase.clamp(0, 100) as u8;
    }

    pub fn phase_label(&self) -> Label {
        percent_label(self.params.phase)
    }

    pub fn level(&self) -> u8 {
        self.params.level
    }

    pub fn set_level(&mut self, level: i32) {
        self.params.level = level.clamp(0, 100) as u8;
    }

    pub fn level_label(&self) -> Label {
        percent_label(self.params.level)
    }

    pub fn offset(&self) -> u8 {
        self.params.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.params.offset = offset.clamp(0, 100) as u8;
    }

    pub fn offset_label(&self) -> Label {
        percent_label(self.params.offset)
    }

    // --- Swing ---

    pub fn swing_index(&self) -> usize {
        self.params.swing_index as usize
    }

    pub fn set_swing_amount(&mut self, index: i32) {
        self.params.swing_index = index.clamp(0, SWING_AMOUNT_COUNT as i32 - 1) as u8;
    }

    pub fn swing_label(&self) -> &'static str {
        SWING_LABELS[self.params.swing_index as usize]
    }

    pub fn swing_every(&self) -> u8 {
        self.params.swing_every
    }

    pub fn set_swing_every(&mut self, every: i32) {
        self.params.swing_every = every.clamp(1, MAX_SWING_EVERY as i32) as u8;
    }

    // --- Probability ---

    pub fn probability(&self) -> u8 {
        self.params.probability
    }

    pub fn set_probability(&mut self, probability: i32) {
        self.params.probability = probability.clamp(0, 100) as u8;
    }

    pub fn probability_label(&self) -> Label {
        percent_label(self.params.probability)
    }

    // --- Waveform ---

    pub fn waveform(&self) -> Waveform {
        self.params.waveform
    }

    /// Switching shapes drops any half-rendered state of the old one.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        if self.params.waveform != waveform {
            self.params.waveform = waveform;
            self.wave.reset();
        }
    }

    pub fn waveform_name(&self) -> &'static str {
        self.params.waveform.name()
    }

    pub fn wave_phase(&self) -> WavePhase {
        self.wave.phase(self.params.waveform)
    }

    // --- Euclidean ---

    pub fn euclidean(&self) -> &EuclideanParams {
        &self.params.euclidean
    }

    pub fn rhythm(&self) -> &EuclideanRhythm {
        &self.rhythm
    }

    /// Index of the step the next cycle will read.
    pub fn euclidean_step(&self) -> usize {
        self.step
    }

    /// Enabling regenerates the pattern from the current settings, which
    /// may have changed while it was off.
    pub fn set_euclidean(&mut self, enabled: bool) {
        let was = self.params.euclidean.enabled;
        self.params.euclidean.enabled = enabled;
        if enabled && !was {
            self.regenerate();
        }
    }

    pub fn toggle_euclidean(&mut self) {
        self.set_euclidean(!self.params.euclidean.enabled);
    }

    pub fn set_euclidean_steps(&mut self, steps: i32) {
        if self.params.euclidean.set_steps(steps) {
            self.pattern_changed();
        }
    }

    pub fn set_euclidean_triggers(&mut self, triggers: i32) {
        if self.params.euclidean.set_triggers(triggers) {
            self.pattern_changed();
        }
    }

    pub fn set_euclidean_rotation(&mut self, rotation: i32) {
        if self.params.euclidean.set_rotation(rotation) {
            self.pattern_changed();
        }
    }

    pub fn set_euclidean_padding(&mut self, pad: i32) {
        if self.params.euclidean.set_pad(pad) {
            self.pattern_changed();
        }
    }

    fn pattern_changed(&mut self) {
        if self.params.euclidean.enabled {
            self.regenerate();
        }
    }

    fn regenerate(&mut self) {
        self.rhythm = EuclideanRhythm::generate(&self.params.euclidean);
        if self.step >= self.rhythm.len() {
            self.step = 0;
        }
        let e = &self.params.euclidean;
        log::debug!(
            "output {}: euclidean E({},{}) rotation {} pad {}",
            self.id,
            e.triggers,
            e.steps,
            e.rotation,
            e.pad
        );
    }

    // --- Identity and state readout ---

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    /// Gate as of the last tick.
    pub fn gate(&self) -> bool {
        self.last.gate
    }

    /// Whether the gate changed since the previous call.
    pub fn gate_changed(&mut self) -> bool {
        let gate = self.last.gate;
        let changed = gate != self.seen_gate;
        self.seen_gate = gate;
        changed
    }

    // --- Snapshot ---

    pub fn params(&self) -> OutputParams {
        let mut params = self.params;
        if !self.master_running {
            params.enabled = self.saved_enabled;
        }
        params
    }

    /// Replace every parameter at once. Values are clamped, the Euclidean
    /// pattern is rebuilt a single time and, while the master pause is
    /// engaged, the enabled flag is held back until resume.
    pub fn apply_params(&mut self, params: &OutputParams) {
        let mut p = params.clamped();
        if self.external {
            p.divider_index = p.divider_index.max(UNITY_DIVIDER as u8);
        }
        if !self.master_running {
            self.saved_enabled = p.enabled;
            p.enabled = false;
        }
        if p.waveform != self.params.waveform {
            self.wave.reset();
        }
        self.params = p;
        self.step = 0;
        if p.euclidean.enabled {
            self.regenerate();
        }
    }
}

fn percent_label(value: u8) -> Label {
    let mut label = Label::new();
    let _ = write!(label, "{}%", value);
    label
}
