//! Clock divider/multiplier table.
//!
//! Each output runs at a rational multiple of the master clock. Ratios are
//! kept as exact fractions so period arithmetic stays in integers: at 96
//! PPQN every entry resolves to a whole number of ticks.

/// A clock ratio relative to the master quarter note.
///
/// `num / den` > 1 multiplies (shorter period), < 1 divides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ratio {
    pub num: u32,
    pub den: u32,
    pub label: &'static str,
}

impl Ratio {
    const fn new(num: u32, den: u32, label: &'static str) -> Self {
        Self { num, den, label }
    }

    /// Ticks in one cycle at the given resolution. Zero when the ratio is
    /// too fast for `ppqn` to express.
    pub const fn period_ticks(&self, ppqn: u32) -> u32 {
        if self.num == 0 {
            return 0;
        }
        ((ppqn as u64 * self.den as u64) / self.num as u64) as u32
    }

    /// Whether this ratio divides the master clock (ratio below unity).
    pub const fn is_division(&self) -> bool {
        self.num < self.den
    }

    /// Integer reciprocal of the ratio, e.g. 4 for `/4`, 1 for `/1.5`.
    /// Used to count external pulses. Never zero.
    pub const fn pulses_per_cycle(&self) -> u32 {
        let n = if self.num == 0 { 1 } else { self.den / self.num };
        if n == 0 { 1 } else { n }
    }
}

/// Number of entries in [`DIVIDERS`].
pub const DIVIDER_COUNT: usize = 18;

/// Index of the `x1` entry: the default, and the slowest ratio allowed
/// while slaved to an external clock.
pub const UNITY_DIVIDER: usize = 9;

/// Divider table ordered from slowest to fastest.
pub const DIVIDERS: [Ratio; DIVIDER_COUNT] = [
    Ratio::new(1, 128, "/128"),
    Ratio::new(1, 64, "/64"),
    Ratio::new(1, 32, "/32"),
    Ratio::new(1, 16, "/16"),
    Ratio::new(1, 8, "/8"),
    Ratio::new(1, 4, "/4"),
    Ratio::new(1, 3, "/3"),
    Ratio::new(1, 2, "/2"),
    Ratio::new(2, 3, "/1.5"),
    Ratio::new(1, 1, "x1"),
    Ratio::new(3, 2, "x1.5"),
    Ratio::new(2, 1, "x2"),
    Ratio::new(3, 1, "x3"),
    Ratio::new(4, 1, "x4"),
    Ratio::new(8, 1, "x8"),
    Ratio::new(16, 1, "x16"),
    Ratio::new(24, 1, "x24"),
    Ratio::new(32, 1, "x32"),
];

/// Number of entries in [`EXTERNAL_DIVIDERS`].
pub const EXTERNAL_DIVIDER_COUNT: usize = 5;

/// Divisions applied to raw external clock edges before they reach the
/// outputs: `(edges per forwarded pulse, label)`.
pub const EXTERNAL_DIVIDERS: [(u32, &str); EXTERNAL_DIVIDER_COUNT] =
    [(1, "x1"), (2, "/2"), (4, "/4"), (8, "/8"), (16, "/16")];
