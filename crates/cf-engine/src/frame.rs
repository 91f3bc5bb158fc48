//! Output frame type.

use cf_ir::NUM_OUTPUTS;

/// Everything the module drives on one tick: four levels plus the gate bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    /// Engine tick this frame was produced on
    pub tick: u64,
    /// Output levels in DAC units
    pub levels: [u16; NUM_OUTPUTS],
    /// Bit `i` set when output `i`'s gate is high
    pub gates: u8,
}

impl Frame {
    /// All outputs low.
    pub const fn silence() -> Self {
        Self { tick: 0, levels: [0; NUM_OUTPUTS], gates: 0 }
    }

    /// Gate of output `index`; false for indices past the last output.
    pub fn gate(&self, index: usize) -> bool {
        index < NUM_OUTPUTS && self.gates & (1 << index) != 0
    }

    pub fn set_gate(&mut self, index: usize, on: bool) {
        if index >= NUM_OUTPUTS {
            return;
        }
        if on {
            self.gates |= 1 << index;
        } else {
            self.gates &= !(1 << index);
        }
    }

    /// Outputs whose gate differs between `self` and `previous`.
    pub fn edges(&self, previous: &Frame) -> u8 {
        self.gates ^ previous.gates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_bits() {
        let mut f = Frame::silence();
        f.set_gate(2, true);
        assert!(f.gate(2));
        assert!(!f.gate(1));
        assert!(!f.gate(9));
        f.set_gate(2, false);
        assert_eq!(f.gates, 0);
    }

    #[test]
    fn edges_between_frames() {
        let mut a = Frame::silence();
        a.set_gate(0, true);
        let mut b = a;
        b.set_gate(0, false);
        b.set_gate(3, true);
        assert_eq!(b.edges(&a), 0b1001);
    }
}
