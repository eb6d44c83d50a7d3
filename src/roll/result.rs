use crate::common::{Int, UInt};
use crate::outcome::Outcome;
use std::fmt;

/// What produced a result; determines how `total` relates to `rolls`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResultKind {
    Literal,
    /// Unmodified dice: `total` is the sum of `rolls`.
    Dice,
    /// Dice after keep/drop/explosion: `total` is the sum of the kept dice
    /// recorded in the breakdown.
    Modified,
    /// Success-counting pool: `total` is the success count, not a sum.
    Pool,
    /// A collapsed arithmetic value; dice granularity is gone.
    Arithmetic,
    /// A raw table draw.
    Table,
    /// A tagged group: `total` is the sum of the tagged sub-totals.
    Tagged,
}

/// One die that hit its maximum face and earned bonus rolls.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExplodedDie {
    pub original: Int,
    pub chain: Vec<Int>,
    pub total: Int,
}

/// Per-modifier detail. Fields are populated only by the modifier that
/// produced them; everything needed to reproduce `total` from `rolls` is
/// here, never in hidden state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Breakdown {
    pub original_rolls: Option<Vec<Int>>,
    pub kept: Option<Vec<Int>>,
    pub dropped: Option<Vec<Int>>,
    pub explosions: Option<Vec<ExplodedDie>>,
    pub successes: Option<UInt>,
    pub failures: Option<UInt>,
    pub modifiers: Option<String>,
    pub tagged: Option<Vec<TaggedDieResult>>,
    pub outcome: Option<Outcome>,
}

/// The structured result of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub struct DiceResult {
    pub rolls: Vec<Int>,
    pub total: Int,
    pub kind: ResultKind,
    pub breakdown: Breakdown,
}

impl DiceResult {
    pub fn literal(value: Int) -> Self {
        Self {
            rolls: vec![value],
            total: value,
            kind: ResultKind::Literal,
            breakdown: Breakdown::default(),
        }
    }

    pub fn arithmetic(total: Int) -> Self {
        Self {
            rolls: vec![total],
            total,
            kind: ResultKind::Arithmetic,
            breakdown: Breakdown::default(),
        }
    }
}

impl fmt::Display for DiceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResultKind::Pool => write!(f, "{} successes", self.total)?,
            _ => fmt::Display::fmt(&self.total, f)?,
        }
        if self.rolls.len() > 1 {
            write!(f, " {:?}", self.rolls)?;
        }
        if let Some(outcome) = &self.breakdown.outcome {
            write!(f, " ({})", outcome.result_label)?;
        }
        Ok(())
    }
}

/// One tagged sub-roll inside a tagged group; transient, produced during
/// evaluation and handed to the outcome rule.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedDieResult {
    pub tag: String,
    pub result: DiceResult,
}

impl TaggedDieResult {
    pub fn total(&self) -> Int {
        self.result.total
    }
}
