//! Euclidean rhythm parameters and the pattern generator.
//!
//! A Euclidean rhythm spreads `triggers` onsets as evenly as possible over
//! `steps` slots (Bjorklund's algorithm), optionally rotated, followed by
//! `pad` silent slots that lengthen the cycle without adding steps.

use arrayvec::ArrayVec;

/// Hard upper bound on `steps + pad`.
pub const MAX_STEPS: usize = 64;

/// User-facing Euclidean settings for one output.
///
/// Invariants (kept by the setters and by [`EuclideanParams::clamped`]):
/// `1 <= triggers <= steps`, `rotation < steps`, `steps + pad <= 64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EuclideanParams {
    pub enabled: bool,
    pub steps: u8,
    pub triggers: u8,
    pub rotation: u8,
    pub pad: u8,
}

impl Default for EuclideanParams {
    fn default() -> Self {
        Self { enabled: false, steps: 10, triggers: 6, rotation: 1, pad: 0 }
    }
}

impl EuclideanParams {
    /// Return a copy with every field forced into its legal range.
    pub fn clamped(self) -> Self {
        let mut p = self;
        p.steps = self.steps.clamp(1, MAX_STEPS as u8);
        p.triggers = self.triggers.clamp(1, p.steps);
        p.rotation = self.rotation.min(p.steps - 1);
        p.pad = self.pad.min(MAX_STEPS as u8 - p.steps);
        p
    }

    /// Total cycle length in steps, padding included.
    pub fn len(&self) -> usize {
        self.steps as usize + self.pad as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the step count, pulling triggers, rotation and padding back
    /// inside the new bounds. Returns whether anything changed.
    pub fn set_steps(&mut self, steps: i32) -> bool {
        let before = *self;
        self.steps = steps.clamp(1, MAX_STEPS as i32) as u8;
        self.triggers = self.triggers.min(self.steps);
        self.rotation = self.rotation.min(self.steps - 1);
        self.pad = self.pad.min(MAX_STEPS as u8 - self.steps);
        *self != before
    }

    pub fn set_triggers(&mut self, triggers: i32) -> bool {
        let before = self.triggers;
        self.triggers = triggers.clamp(1, self.steps as i32) as u8;
        self.triggers != before
    }

    pub fn set_rotation(&mut self, rotation: i32) -> bool {
        let before = self.rotation;
        self.rotation = rotation.clamp(0, self.steps as i32 - 1) as u8;
        self.rotation != before
    }

    pub fn set_pad(&mut self, pad: i32) -> bool {
        let before = self.pad;
        self.pad = pad.clamp(0, MAX_STEPS as i32 - self.steps as i32) as u8;
        self.pad != before
    }
}

/// A generated pattern: `steps` meaningful slots followed by `pad` false
/// slots. Always regenerated whole, never patched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EuclideanRhythm {
    slots: ArrayVec<bool, MAX_STEPS>,
    steps: u8,
}

impl Default for EuclideanRhythm {
    fn default() -> Self {
        Self::generate(&EuclideanParams::default())
    }
}

impl EuclideanRhythm {
    /// Build the pattern for `params`. Out-of-range params are clamped
    /// first, except that zero triggers yields an all-false pattern.
    pub fn generate(params: &EuclideanParams) -> Self {
        let zero_triggers = params.triggers == 0;
        let p = params.clamped();
        let steps = p.steps as usize;
        let pulses = if zero_triggers { 0 } else { p.triggers as usize };

        let mut rhythm = Self { slots: ArrayVec::new(), steps: p.steps };
        bjorklund(steps, pulses, &mut rhythm.slots);

        // Canonical form starts on an onset.
        if let Some(first) = rhythm.slots.iter().position(|&s| s) {
            rhythm.slots[..steps].rotate_left(first);
        }
        rhythm.rotate_left(p.rotation as usize);

        for _ in 0..p.pad {
            let _ = rhythm.slots.try_push(false);
        }
        rhythm
    }

    /// Cyclically rotate the meaningful steps left by `n`; padding stays put.
    pub fn rotate_left(&mut self, n: usize) {
        let steps = self.steps as usize;
        if steps > 0 {
            self.slots[..steps].rotate_left(n % steps);
        }
    }

    /// Slot value, false past the end.
    pub fn get(&self, index: usize) -> bool {
        self.slots.get(index).copied().unwrap_or(false)
    }

    /// Cycle length including padding.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn steps(&self) -> usize {
        self.steps as usize
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.slots
    }

    /// Number of onsets in the pattern.
    pub fn trigger_count(&self) -> usize {
        self.slots.iter().filter(|&&s| s).count()
    }
}

/// Bjorklund's algorithm over fixed-size tables. Appends exactly `steps`
/// slots to `out`.
fn bjorklund(steps: usize, pulses: usize, out: &mut ArrayVec<bool, MAX_STEPS>) {
    if pulses == 0 || pulses >= steps {
        for _ in 0..steps {
            let _ = out.try_push(pulses > 0);
        }
        return;
    }

    let mut counts = [0usize; MAX_STEPS];
    let mut remainders = [0usize; MAX_STEPS];
    let mut divisor = steps - pulses;
    remainders[0] = pulses;
    let mut level = 0;
    loop {
        counts[level] = divisor / remainders[level];
        remainders[level + 1] = divisor % remainders[level];
        divisor = remainders[level];
        level += 1;
        if remainders[level] <= 1 {
            break;
        }
    }
    counts[level] = divisor;

    build(level as isize, &counts, &remainders, out);
}

// Recursion depth is bounded by the Euclid step count of (steps, pulses),
// under 10 for anything that fits in 64 slots.
fn build(
    level: isize,
    counts: &[usize; MAX_STEPS],
    remainders: &[usize; MAX_STEPS],
    out: &mut ArrayVec<bool, MAX_STEPS>,
) {
    match level {
        -1 => {
            let _ = out.try_push(false);
        }
        -2 => {
            let _ = out.try_push(true);
        }
        _ => {
            let l = level as usize;
            for _ in 0..counts[l] {
                build(level - 1, counts, remainders, out);
            }
            if remainders[l] != 0 {
                build(level - 2, counts, remainders, out);
            }
        }
    }
}
