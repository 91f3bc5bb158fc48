//! Allocation-free tick path tests.
//!
//! These tests verify that `Engine::tick()` and `Engine::external_edge()`
//! do not allocate. Every waveform and every clock mode is exercised for
//! several bars so rarely taken branches (envelope termination, sawtooth
//! re-arm, Euclidean wrap, probability misses) run under the guard.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use cf_engine::{Engine, EngineConfig};
use cf_ir::Waveform;

const BARS: usize = 16;

fn ticks(engine: &Engine) -> usize {
    engine.ppqn() as usize * 4 * BARS
}

/// Configure every output with `waveform` and some modulation, then tick
/// for `BARS` bars, aborting on any heap allocation.
fn assert_tick_alloc_free(waveform: Waveform) {
    let mut engine = Engine::new(EngineConfig::default());
    for (i, divider) in [9, 11, 5, 17].into_iter().enumerate() {
        let out = engine.output_mut(i);
        out.set_waveform(waveform);
        out.set_divider(divider);
        out.set_probability(70);
        out.set_swing_amount(i as i32 + 1);
    }
    engine.output_mut(1).set_euclidean(true);
    engine.output_mut(2).set_phase(30);

    let n = ticks(&engine);
    assert_no_alloc(|| {
        for _ in 0..n {
            engine.tick();
        }
    });
}

#[test]
fn gate_alloc_free() {
    assert_tick_alloc_free(Waveform::Gate);
}

#[test]
fn ramps_alloc_free() {
    assert_tick_alloc_free(Waveform::Triangle);
    assert_tick_alloc_free(Waveform::Sine);
    assert_tick_alloc_free(Waveform::Parabolic);
    assert_tick_alloc_free(Waveform::Sawtooth);
}

#[test]
fn envelopes_alloc_free() {
    assert_tick_alloc_free(Waveform::ExpEnvelope);
    assert_tick_alloc_free(Waveform::LogEnvelope);
}

#[test]
fn random_shapes_alloc_free() {
    assert_tick_alloc_free(Waveform::Random);
    assert_tick_alloc_free(Waveform::SmoothRandom);
    assert_tick_alloc_free(Waveform::SampleHold);
}

#[test]
fn external_clock_alloc_free() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.output_mut(0).set_divider(5);
    engine.output_mut(3).set_waveform(Waveform::Sine);
    engine.set_external_divider(1);

    assert_no_alloc(|| {
        for edge in 0..64u64 {
            engine.external_edge(edge * 250);
            for _ in 0..24 {
                engine.tick();
            }
        }
    });
}

#[test]
fn pause_resume_alloc_free() {
    let mut engine = Engine::new(EngineConfig::default());
    assert_no_alloc(|| {
        for i in 0..2000 {
            if i % 300 == 0 {
                engine.toggle_pause();
            }
            engine.tick();
        }
    });
}
