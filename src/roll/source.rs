use crate::common::{NonZeroUInt, UInt};
use rand::Rng;

/// Source of uniformly distributed die faces. Draws are consumed strictly
/// sequentially; the order in which the evaluator asks is a public
/// contract, which is what makes [`ReplaySource`] usable in tests.
pub trait RandomSource {
    /// One uniform value in `[1, sides]`.
    fn roll(&mut self, sides: NonZeroUInt) -> UInt;

    /// `count` independent values in `[1, sides]`, in draw order.
    fn roll_n(&mut self, count: usize, sides: NonZeroUInt) -> Vec<UInt> {
        (0..count).map(|_| self.roll(sides)).collect()
    }
}

impl<R: Rng> RandomSource for R {
    fn roll(&mut self, sides: NonZeroUInt) -> UInt {
        self.gen_range(1..=sides.get())
    }
}

/// Deterministic source replaying a fixed script of values. Values outside
/// `[1, sides]` are folded into range, and the script wraps around when
/// exhausted, so a short script can drive an arbitrarily long evaluation.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    values: Vec<UInt>,
    cursor: usize,
}

impl ReplaySource {
    pub fn new(values: Vec<UInt>) -> Self {
        Self { values, cursor: 0 }
    }

    /// How many draws have been consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ReplaySource {
    fn roll(&mut self, sides: NonZeroUInt) -> UInt {
        if self.values.is_empty() {
            return 1;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        (value.max(1) - 1) % sides.get() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sides(n: UInt) -> NonZeroUInt {
        NonZeroUInt::new(n).unwrap()
    }

    #[test]
    fn test_rng_rolls_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let roll = rng.roll(sides(6));
            assert!((1..=6).contains(&roll));
        }
    }

    #[test]
    fn test_replay_in_order() {
        let mut src = ReplaySource::new(vec![3, 4, 5, 6]);
        assert_eq!(src.roll_n(4, sides(6)), vec![3, 4, 5, 6]);
        assert_eq!(src.consumed(), 4);
    }

    #[test]
    fn test_replay_wraps_and_folds() {
        let mut src = ReplaySource::new(vec![6, 7]);
        assert_eq!(src.roll(sides(6)), 6);
        // 7 folds into range on a d6.
        assert_eq!(src.roll(sides(6)), 1);
        // Script exhausted: wrap around.
        assert_eq!(src.roll(sides(6)), 6);
    }
}
