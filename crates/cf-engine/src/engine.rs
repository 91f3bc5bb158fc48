//! Tick dispatcher for the four outputs.

use core::time::Duration;

use cf_ir::{OutputKind, Preset, NUM_OUTPUTS};
use tinyrand::{Seeded, Wyrand};

use crate::clock::{ExternalClock, TapTempo, Tempo, BPM_HYSTERESIS};
use crate::frame::Frame;
use crate::output::Output;

/// Hardware resolution: ticks per quarter note.
pub const DEFAULT_PPQN: u32 = 96;

/// Fixed engine settings chosen at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub ppqn: u32,
    /// How each output is driven; fixed for the lifetime of the engine
    pub kinds: [OutputKind; NUM_OUTPUTS],
    /// RNG seed for probability and random shapes
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ppqn: DEFAULT_PPQN,
            kinds: [OutputKind::Digital, OutputKind::Digital, OutputKind::Dac, OutputKind::Dac],
            seed: 0x5eed_c10c,
        }
    }
}

/// The module's timing core.
///
/// Plain owned state: whoever holds `&mut Engine` has exclusive access,
/// which is what makes a multi-field update atomic with respect to `tick`.
pub struct Engine {
    config: EngineConfig,
    outputs: [Output; NUM_OUTPUTS],
    /// Global tick counter, reset to 0 on every external pulse
    tick: u64,
    /// Ticks dispatched since construction, never reset
    total_ticks: u64,
    tempo: Tempo,
    /// Internal tempo to restore when the external clock goes away
    internal_bpm: u16,
    external: ExternalClock,
    tap: TapTempo,
    rng: Wyrand,
    paused: bool,
    frame: Frame,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = EngineConfig { ppqn: config.ppqn.max(1), ..config };
        let outputs = core::array::from_fn(|i| Output::new(i as u8 + 1, config.kinds[i]));
        let tempo = Tempo::default();
        Self {
            config,
            outputs,
            tick: 0,
            total_ticks: 0,
            tempo,
            internal_bpm: tempo.bpm(),
            external: ExternalClock::new(),
            tap: TapTempo::new(),
            rng: Wyrand::seed(config.seed),
            paused: false,
            frame: Frame::silence(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ppqn(&self) -> u32 {
        self.config.ppqn
    }

    // --- Ticking ---

    /// One timer interrupt: tick every output and publish the frame.
    #[cfg(not(feature = "alloc_check"))]
    pub fn tick(&mut self) -> Frame {
        self.dispatch()
    }

    /// One timer interrupt, aborting on any heap allocation.
    #[cfg(feature = "alloc_check")]
    pub fn tick(&mut self) -> Frame {
        assert_no_alloc::assert_no_alloc(|| self.dispatch())
    }

    fn dispatch(&mut self) -> Frame {
        let mut frame = Frame { tick: self.total_ticks, ..Frame::silence() };
        for (i, output) in self.outputs.iter_mut().enumerate() {
            let out = output.tick(self.config.ppqn, self.tick, &mut self.rng);
            frame.levels[i] = out.level;
            frame.set_gate(i, out.gate);
        }
        self.tick = self.tick.wrapping_add(1);
        self.total_ticks = self.total_ticks.wrapping_add(1);
        self.frame = frame;
        frame
    }

    /// Frame produced by the most recent tick.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Current value of the global tick counter.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    // --- Tempo ---

    pub fn bpm(&self) -> u16 {
        self.tempo.bpm()
    }

    /// Set the internal tempo. Returns the clamped value.
    pub fn set_bpm(&mut self, bpm: i32) -> u16 {
        let bpm = self.tempo.set_bpm(bpm);
        if !self.external.is_active() {
            self.internal_bpm = bpm;
        }
        bpm
    }

    /// Timer period for the current tempo.
    pub fn tick_period(&self) -> Duration {
        self.tempo.tick_period(self.config.ppqn)
    }

    /// Register a tap at `now_ms`. Returns the new BPM when the tap
    /// completes a sequence. Taps are ignored under an external clock.
    pub fn tap(&mut self, now_ms: u64) -> Option<u16> {
        if self.external.is_active() {
            return None;
        }
        let bpm = self.tap.tap(now_ms)?;
        let bpm = self.set_bpm(bpm as i32);
        log::debug!("tap tempo: {} BPM", bpm);
        Some(bpm)
    }

    // --- External clock ---

    pub fn is_external_clock(&self) -> bool {
        self.external.is_active()
    }

    pub fn external_divider_index(&self) -> usize {
        self.external.divider_index()
    }

    pub fn set_external_divider(&mut self, index: i32) {
        self.external.set_divider(index);
    }

    pub fn external_divider_label(&self) -> &'static str {
        self.external.divider_label()
    }

    /// Raw rising edge on the clock input at `now_ms`.
    ///
    /// Edges the divider lets through re-phase the tick counter, adopt the
    /// measured tempo and run one tick. Returns that tick's frame.
    pub fn external_edge(&mut self, now_ms: u64) -> Option<Frame> {
        let pulse = self.external.edge(now_ms)?;

        if pulse.connected {
            self.internal_bpm = self.tempo.bpm();
            for output in self.outputs.iter_mut() {
                output.set_external_clock(true);
            }
            log::info!("external clock connected");
        }
        if let Some(estimate) = pulse.estimated_bpm {
            if estimate.abs_diff(self.tempo.bpm()) > BPM_HYSTERESIS {
                let bpm = self.tempo.set_bpm(estimate as i32);
                log::debug!("external clock tempo: {} BPM", bpm);
            }
        }

        for output in self.outputs.iter_mut() {
            output.external_pulse();
        }
        self.tick = 0;
        Some(self.tick())
    }

    /// Main-loop housekeeping: fall back to the internal clock after the
    /// external input has gone quiet. Returns true when that happened.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if !self.external.poll(now_ms) {
            return false;
        }
        self.tempo.set_bpm(self.internal_bpm as i32);
        for output in self.outputs.iter_mut() {
            output.set_external_clock(false);
        }
        log::info!("external clock lost, back to internal {} BPM", self.internal_bpm);
        true
    }

    // --- Master pause ---

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.set_paused(true);
    }

    pub fn resume(&mut self) {
        self.set_paused(false);
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        for output in self.outputs.iter_mut() {
            output.set_master_state(!paused);
        }
        log::debug!("master {}", if paused { "paused" } else { "running" });
    }

    // --- Outputs ---

    pub fn outputs(&self) -> &[Output; NUM_OUTPUTS] {
        &self.outputs
    }

    /// Output at `index`, clamped to the last output.
    pub fn output(&self, index: usize) -> &Output {
        &self.outputs[index.min(NUM_OUTPUTS - 1)]
    }

    pub fn output_mut(&mut self, index: usize) -> &mut Output {
        &mut self.outputs[index.min(NUM_OUTPUTS - 1)]
    }

    // --- Parameter store seam ---

    /// Everything a parameter store needs to persist.
    pub fn snapshot(&self) -> Preset {
        Preset {
            bpm: self.internal_bpm,
            external_divider_index: self.external.divider_index() as u8,
            outputs: core::array::from_fn(|i| self.outputs[i].params()),
        }
    }

    /// Restore a snapshot. Out-of-range fields are clamped.
    pub fn apply_preset(&mut self, preset: &Preset) {
        let preset = preset.clamped();
        self.set_bpm(preset.bpm as i32);
        self.internal_bpm = preset.bpm;
        self.external.set_divider(preset.external_divider_index as i32);
        for (output, params) in self.outputs.iter_mut().zip(preset.outputs.iter()) {
            output.apply_params(params);
        }
        log::debug!("preset applied at {} BPM", preset.bpm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_ir::{OutputParams, Waveform, DAC_FULL_SCALE, UNITY_DIVIDER};

    fn engine() -> Engine {
        Engine::new(EngineConfig::default())
    }

    fn run(engine: &mut Engine, ticks: usize) -> Vec<Frame> {
        (0..ticks).map(|_| engine.tick()).collect()
    }

    #[test]
    fn default_layout() {
        let e = engine();
        assert_eq!(e.ppqn(), 96);
        assert_eq!(e.output(0).kind(), OutputKind::Digital);
        assert_eq!(e.output(3).kind(), OutputKind::Dac);
        assert_eq!(e.output(0).id(), 1);
        assert_eq!(e.bpm(), 120);
    }

    #[test]
    fn all_outputs_pulse_together_by_default() {
        let mut e = engine();
        let frames = run(&mut e, 192);
        assert_eq!(frames[0].gates, 0b1111);
        assert_eq!(frames[47].gates, 0b1111);
        assert_eq!(frames[48].gates, 0);
        assert_eq!(frames[96].gates, 0b1111);
        assert_eq!(frames[0].levels, [DAC_FULL_SCALE; 4]);
        assert_eq!(frames[191].tick, 191);
        assert_eq!(e.frame(), frames[191]);
    }

    #[test]
    fn output_index_clamps() {
        let mut e = engine();
        e.output_mut(40).set_duty_cycle(10);
        assert_eq!(e.output(3).duty_cycle(), 10);
    }

    #[test]
    fn pause_and_resume_restore_individual_state() {
        let mut e = engine();
        e.output_mut(1).set_enabled(false);
        e.pause();
        assert!(e.outputs().iter().all(|o| !o.is_enabled()));
        let frames = run(&mut e, 10);
        assert!(frames.iter().all(|f| f.gates == 0));
        e.toggle_pause();
        assert!(!e.is_paused());
        let enabled: Vec<bool> = e.outputs().iter().map(|o| o.is_enabled()).collect();
        assert_eq!(enabled, vec![true, false, true, true]);
    }

    #[test]
    fn tick_period_follows_bpm() {
        let mut e = engine();
        assert_eq!(e.set_bpm(400), 300);
        assert_eq!(e.tick_period(), Duration::from_nanos(60_000_000_000 / (300 * 96)));
        assert_eq!(e.set_bpm(60), 60);
        assert_eq!(e.tick_period(), Duration::from_nanos(60_000_000_000 / 5760));
    }

    #[test]
    fn tap_sets_tempo() {
        let mut e = engine();
        e.tap(0);
        e.tap(400);
        assert_eq!(e.tap(800), Some(150));
        assert_eq!(e.bpm(), 150);
    }

    #[test]
    fn external_edges_take_over_and_rephase() {
        let mut e = engine();
        e.set_bpm(90);
        run(&mut e, 30);
        assert_eq!(e.current_tick(), 30);

        let frame = e.external_edge(1000).unwrap();
        assert!(e.is_external_clock());
        assert!(e.outputs().iter().all(|o| o.is_external_clock()));
        assert!(frame.gate(0));
        assert_eq!(e.current_tick(), 1);

        e.external_edge(1500);
        e.external_edge(2000);
        assert_eq!(e.bpm(), 120);
    }

    #[test]
    fn external_tempo_within_hysteresis_is_ignored() {
        let mut e = engine();
        e.set_bpm(121);
        e.external_edge(0);
        e.external_edge(500);
        assert_eq!(e.bpm(), 121);
    }

    #[test]
    fn external_timeout_restores_internal_tempo() {
        let mut e = engine();
        e.set_bpm(100);
        e.external_edge(0);
        e.external_edge(250);
        assert_eq!(e.bpm(), 240);
        assert!(!e.poll(2000));
        assert!(e.poll(2251));
        assert!(!e.is_external_clock());
        assert!(e.outputs().iter().all(|o| !o.is_external_clock()));
        assert_eq!(e.bpm(), 100);
    }

    #[test]
    fn taps_ignored_under_external_clock() {
        let mut e = engine();
        e.external_edge(0);
        assert_eq!(e.tap(10), None);
        assert_eq!(e.tap(20), None);
        assert_eq!(e.tap(30), None);
    }

    #[test]
    fn external_divider_skips_edges() {
        let mut e = engine();
        e.set_external_divider(1); // /2
        assert!(e.external_edge(0).is_some());
        assert!(e.external_edge(250).is_none());
        assert!(e.external_edge(500).is_some());
        assert_eq!(e.external_divider_label(), "/2");
    }

    #[test]
    fn divided_output_counts_external_pulses() {
        let mut e = engine();
        e.output_mut(0).set_divider(7); // /2
        let gates: Vec<bool> = (0..6).map(|i| e.external_edge(i * 500).unwrap().gate(0)).collect();
        assert_eq!(gates, vec![true, false, true, false, true, false]);
    }

    #[test]
    fn preset_round_trip() {
        let mut e = engine();
        e.set_bpm(133);
        e.set_external_divider(3);
        e.output_mut(2).set_waveform(Waveform::SmoothRandom);
        e.output_mut(1).set_euclidean(true);
        e.output_mut(0).set_probability(40);
        let preset = e.snapshot();

        let mut other = engine();
        other.apply_preset(&preset);
        assert_eq!(other.snapshot(), preset);
        assert_eq!(other.bpm(), 133);
        assert_eq!(other.output(1).rhythm(), e.output(1).rhythm());
    }

    #[test]
    fn preset_is_clamped_on_apply() {
        let mut e = engine();
        let mut preset = Preset::default();
        preset.bpm = 1;
        preset.outputs[0] = OutputParams { duty_cycle: 0, ..OutputParams::default() };
        e.apply_preset(&preset);
        assert_eq!(e.bpm(), 10);
        assert_eq!(e.output(0).duty_cycle(), 1);
    }

    #[test]
    fn snapshot_during_pause_keeps_enabled_flags() {
        let mut e = engine();
        e.pause();
        assert!(e.snapshot().outputs.iter().all(|p| p.enabled));
    }

    #[test]
    fn same_seed_same_output() {
        let mut a = engine();
        let mut b = engine();
        for e in [&mut a, &mut b] {
            e.output_mut(0).set_probability(50);
            e.output_mut(3).set_waveform(Waveform::Random);
        }
        assert_eq!(run(&mut a, 1000), run(&mut b, 1000));
    }

    #[test]
    fn external_rejects_sub_unity_dividers() {
        let mut e = engine();
        e.external_edge(0);
        e.output_mut(0).set_divider(0);
        assert_eq!(e.output(0).divider_index(), UNITY_DIVIDER);
    }
}
