//! Headless controller for the clockforge module.
//!
//! Runs the engine on a clock thread that stands in for the hardware timer
//! interrupt, hands frames to the main loop through a ring buffer, and
//! renders offline traces for export.

mod error;
mod setting;
mod wav;

use cf_engine::Engine;
use cf_io::OutputDriver;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

// Re-export common types so callers don't need cf-ir/cf-engine directly.
pub use cf_engine::{EngineConfig, Frame, Output};
pub use cf_ir::{OutputParams, Preset, Waveform, NUM_OUTPUTS};

pub use error::Error;
pub use setting::{Key, Setting, Value};
pub use wav::{frames_to_wav, level_to_sample, write_wav};

/// Frames buffered between the clock thread and the main loop.
const FRAME_BUFFER: usize = 1024;

/// A clock thread that falls this many periods behind stops trying to
/// catch up and re-anchors its deadline.
const MAX_LAG_TICKS: u32 = 16;

/// State guarded by the engine lock. Ticks from the clock thread and from
/// external edges both publish through `frames`.
struct Core {
    engine: Engine,
    frames: Option<HeapProd<Frame>>,
}

impl Core {
    fn publish(&mut self, frame: Frame) {
        if let Some(producer) = self.frames.as_mut() {
            // A full buffer means nobody is reading; drop the frame.
            let _ = producer.try_push(frame);
        }
    }
}

/// Headless module controller: owns the engine and the clock thread.
pub struct Controller {
    config: EngineConfig,
    core: Arc<Mutex<Core>>,
    epoch: Instant,
    clock: Option<ClockHandle>,
    frames: Option<HeapCons<Frame>>,
}

struct ClockHandle {
    stop_signal: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            core: Arc::new(Mutex::new(Core { engine: Engine::new(config), frames: None })),
            epoch: Instant::now(),
            clock: None,
            frames: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        lock_core(&self.core)
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Run `f` with exclusive access to the engine. This is the critical
    /// section: the clock thread cannot tick while `f` runs.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.lock().engine)
    }

    // --- Real-time clock ---

    pub fn start(&mut self) -> Result<(), Error> {
        self.stop();

        let (producer, consumer) = HeapRb::<Frame>::new(FRAME_BUFFER).split();
        self.lock().frames = Some(producer);
        self.frames = Some(consumer);

        let stop_signal = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let core = self.core.clone();
        let stop = stop_signal.clone();
        let count = ticks.clone();
        let epoch = self.epoch;

        let thread = std::thread::Builder::new()
            .name("clockforge-clock".into())
            .spawn(move || clock_thread(core, stop, count, epoch))
            .map_err(Error::Spawn)?;

        log::info!("clock started at {} BPM", self.with_engine(|e| e.bpm()));
        self.clock = Some(ClockHandle { stop_signal, ticks, thread: Some(thread) });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = clock.thread.take() {
                if handle.join().is_err() {
                    log::error!("clock thread panicked");
                }
            }
            self.lock().frames = None;
            log::info!("clock stopped after {} ticks", clock.ticks.load(Ordering::Relaxed));
        }
    }

    pub fn is_running(&self) -> bool {
        self.clock
            .as_ref()
            .and_then(|c| c.thread.as_ref())
            .is_some_and(|t| !t.is_finished())
    }

    /// Ticks run by the clock thread since the last `start`.
    pub fn ticks(&self) -> u64 {
        self.clock.as_ref().map_or(0, |c| c.ticks.load(Ordering::Relaxed))
    }

    // --- Clock input ---

    /// A rising edge arrived on the external clock input now.
    pub fn external_edge(&self) -> Option<Frame> {
        let now = self.now_ms();
        let mut core = self.lock();
        let frame = core.engine.external_edge(now)?;
        core.publish(frame);
        Some(frame)
    }

    /// Tap-tempo button press now.
    pub fn tap(&self) -> Option<u16> {
        let now = self.now_ms();
        self.with_engine(|e| e.tap(now))
    }

    /// External clock timeout check.
    pub fn poll(&self) -> bool {
        let now = self.now_ms();
        self.with_engine(|e| e.poll(now))
    }

    /// Apply one parsed `OUT:KEY=VALUE` assignment.
    pub fn apply_setting(&self, setting: &Setting) {
        self.with_engine(|e| setting.apply(e.output_mut(setting.output)));
    }

    // --- Main loop ---

    /// Every frame published since the last drain, oldest first.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if let Some(consumer) = self.frames.as_mut() {
            while let Some(frame) = consumer.try_pop() {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drain pending frames into `driver`. Returns how many were written.
    pub fn drive(&mut self, driver: &mut impl OutputDriver) -> Result<usize, Error> {
        let frames = self.drain_frames();
        for frame in &frames {
            driver.write_frame(frame)?;
        }
        Ok(frames.len())
    }

    // --- Offline rendering ---

    /// Render `ticks` ticks of the current settings on a fresh engine,
    /// leaving the live one untouched.
    pub fn render_ticks(&self, ticks: usize) -> Vec<Frame> {
        let preset = self.with_engine(|e| e.snapshot());
        let mut engine = Engine::new(self.config);
        engine.apply_preset(&preset);
        (0..ticks).map(|_| engine.tick()).collect()
    }

    /// Tick rate at the current tempo, rounded to whole hertz.
    pub fn tick_rate(&self) -> u32 {
        let bpm = self.with_engine(|e| e.bpm()) as u32;
        ((bpm * self.config.ppqn + 30) / 60).max(1)
    }

    /// Render `beats` quarter notes as a 4-channel WAV trace.
    pub fn render_to_wav(&self, beats: u32) -> Vec<u8> {
        let frames = self.render_ticks((beats * self.config.ppqn) as usize);
        wav::frames_to_wav(&frames, self.tick_rate())
    }

    pub fn export_wav(&self, path: impl AsRef<Path>, beats: u32) -> Result<(), Error> {
        let bytes = self.render_to_wav(beats);
        std::fs::write(path.as_ref(), bytes)?;
        log::info!("wrote {} beats to {}", beats, path.as_ref().display());
        Ok(())
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock_core(core: &Mutex<Core>) -> MutexGuard<'_, Core> {
    // Engine state is always internally consistent between calls, so a
    // panic elsewhere does not invalidate it.
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

fn clock_thread(
    core: Arc<Mutex<Core>>,
    stop_signal: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    epoch: Instant,
) {
    let mut deadline = Instant::now();
    let mut count: u64 = 0;

    while !stop_signal.load(Ordering::Relaxed) {
        let period = {
            let mut core = lock_core(&core);
            let now_ms = epoch.elapsed().as_millis() as u64;
            core.engine.poll(now_ms);
            let frame = core.engine.tick();
            core.publish(frame);
            core.engine.tick_period()
        };
        count += 1;
        ticks.store(count, Ordering::Relaxed);

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        } else if now - deadline > period * MAX_LAG_TICKS {
            log::warn!("clock thread fell behind by {:?}", now - deadline);
            deadline = now;
        }
    }
}
