//! End-to-end traces: configure the module through the controller, render
//! offline, and check the rhythm each output produces.

use cf_master::{frames_to_wav, Controller, EngineConfig, Frame, Setting, Waveform};

const PPQN: usize = 96;

fn controller(settings: &[&str]) -> Controller {
    let ctrl = Controller::new(EngineConfig::default());
    for s in settings {
        let setting: Setting = s.parse().unwrap();
        ctrl.apply_setting(&setting);
    }
    ctrl
}

/// Tick indices where `output`'s gate goes high.
fn onsets(frames: &[Frame], output: usize) -> Vec<usize> {
    let mut previous = false;
    let mut hits = Vec::new();
    for (i, f) in frames.iter().enumerate() {
        let on = f.gate(output);
        if on && !previous {
            hits.push(i);
        }
        previous = on;
    }
    hits
}

#[test]
fn dividers_and_multipliers_line_up() {
    let ctrl = controller(&["1:div=x1", "2:div=x4", "3:div=/2", "4:div=x1.5"]);
    let frames = ctrl.render_ticks(PPQN * 4);

    assert_eq!(onsets(&frames, 0), vec![0, 96, 192, 288]);
    assert_eq!(onsets(&frames, 1).len(), 16);
    assert_eq!(onsets(&frames, 2), vec![0, 192]);
    assert_eq!(onsets(&frames, 3), vec![0, 64, 128, 192, 256, 320]);
}

#[test]
fn euclidean_tresillo_over_two_bars() {
    let ctrl = controller(&["1:div=x4", "1:steps=8", "1:hits=3", "1:rot=0", "1:euclid=on"]);
    let frames = ctrl.render_ticks(PPQN * 4);
    let steps: Vec<usize> = onsets(&frames, 0).iter().map(|t| t / 24).collect();
    assert_eq!(steps, vec![0, 3, 6, 8, 11, 14]);
}

#[test]
fn swung_sixteenths() {
    let ctrl = controller(&["2:div=x4", "2:duty=25", "2:swing=6", "2:every=2"]);
    let frames = ctrl.render_ticks(PPQN);
    // 12/96 swing on the even cycles, none on the odd ones
    assert_eq!(onsets(&frames, 1), vec![0, 24, 60, 72]);
}

#[test]
fn disabled_output_stays_silent() {
    let ctrl = controller(&["3:on=off"]);
    let frames = ctrl.render_ticks(PPQN * 2);
    assert!(frames.iter().all(|f| !f.gate(2) && f.levels[2] == 0));
    assert_eq!(onsets(&frames, 0).len(), 2);
}

#[test]
fn dac_offset_is_idle_level() {
    let ctrl = controller(&["4:offset=50", "4:level=50"]);
    let frames = ctrl.render_ticks(PPQN);
    let high = frames[0].levels[3];
    let low = frames[60].levels[3];
    assert!(high > low);
    assert!((2040..=2050).contains(&low), "idle level {}", low);
    assert!(high >= 4090, "high level {}", high);
}

#[test]
fn sine_trace_spans_the_dac_range() {
    let ctrl = controller(&["3:wave=sine"]);
    let frames = ctrl.render_ticks(PPQN);
    let levels: Vec<u16> = frames.iter().map(|f| f.levels[2]).collect();
    let max = *levels.iter().max().unwrap();
    let min = *levels.iter().min().unwrap();
    assert!(max > 4000);
    assert!(min < 100);
    // Starts low, peaks mid-cycle
    assert!(levels[0] < levels[47]);
}

#[test]
fn preset_survives_a_round_trip() {
    let ctrl = controller(&["1:prob=30", "2:wave=expenvelope", "3:euclid=on", "4:phase=25"]);
    let preset = ctrl.with_engine(|e| e.snapshot());

    let other = Controller::new(EngineConfig::default());
    other.with_engine(|e| e.apply_preset(&preset));
    assert_eq!(other.with_engine(|e| e.snapshot()), preset);
    assert_eq!(other.with_engine(|e| e.output(1).waveform()), Waveform::ExpEnvelope);
    assert_eq!(ctrl.render_ticks(PPQN * 8), other.render_ticks(PPQN * 8));
}

#[test]
fn wav_trace_matches_frames() {
    let ctrl = controller(&["2:div=x2"]);
    let frames = ctrl.render_ticks(PPQN);
    let wav = ctrl.render_to_wav(1);
    assert_eq!(wav, frames_to_wav(&frames, ctrl.tick_rate()));

    // Output 2 is high at tick 48, output 1 is not.
    let at = 44 + 48 * 8;
    let out1 = i16::from_le_bytes([wav[at], wav[at + 1]]);
    let out2 = i16::from_le_bytes([wav[at + 2], wav[at + 3]]);
    assert_eq!(out1, 0);
    assert_eq!(out2, i16::MAX);
}
