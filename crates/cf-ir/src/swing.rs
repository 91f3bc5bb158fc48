//! Swing amounts.
//!
//! The TR-909 shuffle delays every other 1/16th by 2/96 of a beat for
//! setting 1, 4/96 for 2, up to 12/96 for 6. The amounts below are in
//! those 96ths and get rescaled to the engine's PPQN at tick time.

/// Resolution the swing table is written in.
pub const SWING_UNIT: u32 = 96;

/// Number of swing settings.
pub const SWING_AMOUNT_COUNT: usize = 7;

/// Swing offsets in 96ths of a quarter note.
pub const SWING_AMOUNTS: [u32; SWING_AMOUNT_COUNT] = [0, 2, 4, 6, 8, 10, 12];

pub const SWING_LABELS: [&str; SWING_AMOUNT_COUNT] =
    ["0", "2/96", "4/96", "6/96", "8/96", "10/96", "12/96"];

/// Largest "swing every N cycles" setting.
pub const MAX_SWING_EVERY: u8 = 16;

/// Swing offset in ticks for a table index at the given resolution.
pub fn swing_ticks(index: usize, ppqn: u32) -> u32 {
    let amount = SWING_AMOUNTS[index.min(SWING_AMOUNT_COUNT - 1)];
    amount * ppqn / SWING_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swing_ticks_at_native_resolution() {
        assert_eq!(swing_ticks(0, 96), 0);
        assert_eq!(swing_ticks(3, 96), 6);
        assert_eq!(swing_ticks(6, 96), 12);
    }

    #[test]
    fn swing_ticks_rescale_with_ppqn() {
        assert_eq!(swing_ticks(6, 192), 24);
        assert_eq!(swing_ticks(6, 24), 3);
    }

    #[test]
    fn swing_index_is_clamped() {
        assert_eq!(swing_ticks(99, 96), 12);
    }
}
