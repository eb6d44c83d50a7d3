use super::ctx::EvalContext;
use super::result::{Breakdown, DiceResult, ExplodedDie, ResultKind};
use super::source::RandomSource;
use crate::common::{Comparator, Int, NonZeroUInt, UInt};
use crate::parse::ast::{Dice, Modifier};

/// Rolls the base pool once, then threads that SAME roll set through every
/// modifier in parse order: `4d6!kh3` keeps the highest three of the
/// exploded per-die totals. Re-rolling the base per modifier would consume
/// extra draws and break the replay ordering contract.
pub(crate) fn eval_dice<R: RandomSource>(
    ctx: &mut EvalContext<'_, R>,
    dice: Dice,
    modifiers: &[Modifier],
) -> crate::Result<DiceResult> {
    let firsts = ctx.draw_batch(dice.count() as usize, dice.sides)?;
    let mut pool = Pool::new(dice.sides, firsts);
    let original: Vec<Int> = pool.values();

    let mut breakdown = Breakdown::default();
    let mut threshold = None;
    let mut selected = false;

    for &modifier in modifiers {
        match modifier {
            Modifier::Exploding => pool.explode(ctx, false)?,
            Modifier::CompoundExploding => pool.explode(ctx, true)?,
            Modifier::KeepHighest(n) => {
                pool.keep(n.get() as usize, true);
                selected = true;
            }
            Modifier::KeepLowest(n) => {
                pool.keep(n.get() as usize, false);
                selected = true;
            }
            Modifier::DropHighest(n) => {
                pool.drop(n.get() as usize, true);
                selected = true;
            }
            Modifier::DropLowest(n) => {
                pool.drop(n.get() as usize, false);
                selected = true;
            }
            Modifier::Threshold(cmp, value) => threshold = Some(pool.count_successes(cmp, value)),
        }
    }

    if !modifiers.is_empty() {
        breakdown.original_rolls = Some(original);
        breakdown.modifiers = Some(
            modifiers
                .iter()
                .map(Modifier::describe)
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
    let explosions = pool.explosions();
    if !explosions.is_empty() {
        breakdown.explosions = Some(explosions);
    }
    if selected {
        breakdown.kept = Some(pool.kept_values());
        breakdown.dropped = Some(pool.dropped_values());
    }

    let rolls = pool.values();
    let (kind, total) = match threshold {
        Some((successes, failures)) => {
            breakdown.successes = Some(successes);
            breakdown.failures = Some(failures);
            (ResultKind::Pool, Int::from(successes))
        }
        None if modifiers.is_empty() => (ResultKind::Dice, pool.kept_sum()),
        None => (ResultKind::Modified, pool.kept_sum()),
    };

    Ok(DiceResult {
        rolls,
        total,
        kind,
        breakdown,
    })
}

#[derive(Debug, Clone)]
struct RolledDie {
    first: UInt,
    extra: Vec<UInt>,
    kept: bool,
}

impl RolledDie {
    fn new(first: UInt) -> Self {
        Self {
            first,
            extra: Vec::new(),
            kept: true,
        }
    }

    /// The die's contribution: the first roll plus all bonus rolls.
    fn value(&self) -> Int {
        Int::from(self.first) + self.extra.iter().map(|&x| Int::from(x)).sum::<Int>()
    }
}

#[derive(Debug, Clone)]
struct Pool {
    sides: NonZeroUInt,
    dice: Vec<RolledDie>,
}

impl Pool {
    fn new(sides: NonZeroUInt, firsts: Vec<UInt>) -> Self {
        Self {
            sides,
            dice: firsts.into_iter().map(RolledDie::new).collect(),
        }
    }

    /// Per-die totals in draw order, dropped dice included.
    fn values(&self) -> Vec<Int> {
        self.dice.iter().map(RolledDie::value).collect()
    }

    /// Simple exploding grants exactly one bonus roll per die on the
    /// maximum face; compound exploding keeps re-rolling while the newest
    /// bonus is again the maximum. Bonus draws happen in die order.
    fn explode<R: RandomSource>(
        &mut self,
        ctx: &mut EvalContext<'_, R>,
        compound: bool,
    ) -> crate::Result<()> {
        let max = self.sides.get();
        for i in 0..self.dice.len() {
            if self.dice[i].first != max {
                continue;
            }
            loop {
                let bonus = ctx.draw(self.sides)?;
                self.dice[i].extra.push(bonus);
                if !compound || bonus != max {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Indices of the still-kept dice, sorted ascending by value (stable:
    /// ties stay in draw order).
    fn sorted_kept_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.dice.len()).filter(|&i| self.dice[i].kept).collect();
        indices.sort_by_key(|&i| self.dice[i].value());
        indices
    }

    fn keep(&mut self, n: usize, highest: bool) {
        let sorted = self.sorted_kept_indices();
        let discard = if highest {
            &sorted[..sorted.len().saturating_sub(n)]
        } else {
            &sorted[n.min(sorted.len())..]
        };
        for &i in discard {
            self.dice[i].kept = false;
        }
    }

    fn drop(&mut self, n: usize, highest: bool) {
        let sorted = self.sorted_kept_indices();
        let discard = if highest {
            &sorted[sorted.len().saturating_sub(n)..]
        } else {
            &sorted[..n.min(sorted.len())]
        };
        for &i in discard {
            self.dice[i].kept = false;
        }
    }

    /// Successes and failures among the kept dice.
    fn count_successes(&self, cmp: Comparator, value: Int) -> (UInt, UInt) {
        let mut successes = 0;
        let mut failures = 0;
        for die in self.dice.iter().filter(|d| d.kept) {
            if cmp.compare(die.value(), value) {
                successes += 1;
            } else {
                failures += 1;
            }
        }
        (successes, failures)
    }

    fn kept_sum(&self) -> Int {
        self.dice
            .iter()
            .filter(|d| d.kept)
            .map(RolledDie::value)
            .sum()
    }

    /// Kept per-die totals, ascending.
    fn kept_values(&self) -> Vec<Int> {
        let mut values: Vec<Int> = self
            .dice
            .iter()
            .filter(|d| d.kept)
            .map(RolledDie::value)
            .collect();
        values.sort_unstable();
        values
    }

    /// Dropped per-die totals, ascending.
    fn dropped_values(&self) -> Vec<Int> {
        let mut values: Vec<Int> = self
            .dice
            .iter()
            .filter(|d| !d.kept)
            .map(RolledDie::value)
            .collect();
        values.sort_unstable();
        values
    }

    fn explosions(&self) -> Vec<ExplodedDie> {
        self.dice
            .iter()
            .filter(|d| !d.extra.is_empty())
            .map(|d| ExplodedDie {
                original: Int::from(d.first),
                chain: d.extra.iter().map(|&x| Int::from(x)).collect(),
                total: d.value(),
            })
            .collect()
    }
}
