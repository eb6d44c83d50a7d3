use super::pool;
use super::result::{Breakdown, DiceResult, ResultKind, TaggedDieResult};
use super::source::RandomSource;
use crate::common::{BinaryOperator, Int, NonZeroUInt, UInt, UnaryOperator};
use crate::error::Error;
use crate::outcome::{HigherTagWins, OutcomeRule};
use crate::parse::ast::{Expr, OutcomeRuleKind};
use crate::table::{TableError, TableManager};
use crate::vars::VariableContext;

/// Default ceiling on the number of draws one evaluation may consume.
/// Compound explosion is the only otherwise-unbounded work.
pub const DEFAULT_ROLL_BUDGET: usize = 1000;

/// Everything one evaluation needs: the random source, the optional
/// collaborators, and the roll budget. No implicit global state; callers
/// construct a context per evaluation session.
pub struct EvalContext<'a, R> {
    source: &'a mut R,
    tables: Option<&'a mut TableManager>,
    vars: Option<&'a mut VariableContext>,
    max_rolls: Option<usize>,
    rolls: usize,
}

impl<'a, R: RandomSource> EvalContext<'a, R> {
    pub fn new(source: &'a mut R) -> Self {
        Self {
            source,
            tables: None,
            vars: None,
            max_rolls: Some(DEFAULT_ROLL_BUDGET),
            rolls: 0,
        }
    }

    pub fn with_tables(mut self, tables: &'a mut TableManager) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_vars(mut self, vars: &'a mut VariableContext) -> Self {
        self.vars = Some(vars);
        self
    }

    /// `None` removes the budget entirely.
    pub fn with_roll_budget(mut self, max_rolls: Option<usize>) -> Self {
        self.max_rolls = max_rolls;
        self
    }

    fn count_rolls(&mut self, n: usize) -> crate::Result<()> {
        self.rolls += n;
        if let Some(max) = self.max_rolls {
            if self.rolls > max {
                return Err(Error::TooManyRolls(max));
            }
        }
        Ok(())
    }

    pub(crate) fn draw(&mut self, sides: NonZeroUInt) -> crate::Result<UInt> {
        self.count_rolls(1)?;
        Ok(self.source.roll(sides))
    }

    pub(crate) fn draw_batch(
        &mut self,
        count: usize,
        sides: NonZeroUInt,
    ) -> crate::Result<Vec<UInt>> {
        self.count_rolls(count)?;
        Ok(self.source.roll_n(count, sides))
    }

    /// Evaluates one tree node. Draw order is fixed by the tree shape:
    /// left before right, base roll before modifier bonuses, tagged
    /// entries in declaration order. Reordering is a breaking change.
    pub fn eval(&mut self, expr: &Expr) -> crate::Result<DiceResult> {
        match expr {
            Expr::Literal(x) => Ok(DiceResult::literal(*x)),
            Expr::Dice(dice) => pool::eval_dice(self, *dice, &[]),
            Expr::Modified { dice, modifier } => {
                pool::eval_dice(self, *dice, std::slice::from_ref(modifier))
            }
            Expr::MultiModified { dice, modifiers } => pool::eval_dice(self, *dice, modifiers),
            Expr::Binary { op, left, right } => {
                // Both sides are always evaluated; there is no
                // short-circuiting, so draw consumption stays predictable.
                let lhs = self.eval(left)?.total;
                let rhs = self.eval(right)?.total;
                let total = match op {
                    BinaryOperator::Add => lhs + rhs,
                    BinaryOperator::Sub => lhs - rhs,
                    BinaryOperator::Mul => lhs * rhs,
                    BinaryOperator::Div => {
                        if rhs == 0 {
                            return Err(Error::DivisionByZero);
                        }
                        lhs / rhs
                    }
                };
                Ok(DiceResult::arithmetic(total))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?.total;
                let total = match op {
                    UnaryOperator::Pos => value,
                    UnaryOperator::Neg => -value,
                };
                Ok(DiceResult::arithmetic(total))
            }
            Expr::Group(inner) => self.eval(inner),
            Expr::TableLookup { name } => {
                self.count_rolls(1)?;
                let tables = match self.tables.as_deref() {
                    Some(tables) => tables,
                    None => return Err(Error::Table(TableError::NotFound(name.clone()))),
                };
                // As a sub-expression a table lookup is only the numeric
                // draw; text resolution goes through TableManager::evaluate.
                let draw = tables.roll_value(name, &mut *self.source)?;
                Ok(DiceResult {
                    rolls: vec![Int::from(draw)],
                    total: Int::from(draw),
                    kind: ResultKind::Table,
                    breakdown: Breakdown {
                        modifiers: Some(format!("@{}", name)),
                        ..Breakdown::default()
                    },
                })
            }
            Expr::VarDecl { name, expr } => {
                match self.vars.as_deref() {
                    None => return Err(Error::NoVariableStore),
                    Some(vars) if vars.is_declared(name) => {
                        return Err(Error::VariableRedeclaration(name.clone()))
                    }
                    Some(_) => {}
                }
                let result = self.eval(expr)?;
                if let Some(vars) = self.vars.as_deref_mut() {
                    // The NODE is stored, not the value: every later
                    // reference re-evaluates it.
                    vars.declare(name.clone(), (**expr).clone())?;
                }
                Ok(result)
            }
            Expr::VarRef { name } => {
                let node = self
                    .vars
                    .as_deref()
                    .and_then(|vars| vars.lookup(name).cloned());
                match node {
                    Some(node) => self.eval(&node),
                    None => Err(Error::UndeclaredVariable(name.clone())),
                }
            }
            Expr::TaggedGroup { entries, rule } => {
                let mut tagged = Vec::with_capacity(entries.len());
                for (tag, sub) in entries {
                    let result = self.eval(sub)?;
                    tagged.push(TaggedDieResult {
                        tag: tag.clone(),
                        result,
                    });
                }
                let rule: &dyn OutcomeRule = match rule {
                    OutcomeRuleKind::HigherTag => &HigherTagWins,
                };
                let outcome = rule.decide(&tagged);
                let rolls: Vec<Int> = tagged.iter().map(TaggedDieResult::total).collect();
                let total = rolls.iter().sum();
                Ok(DiceResult {
                    rolls,
                    total,
                    kind: ResultKind::Tagged,
                    breakdown: Breakdown {
                        tagged: Some(tagged),
                        outcome: Some(outcome),
                        ..Breakdown::default()
                    },
                })
            }
        }
    }
}
