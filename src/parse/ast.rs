use crate::common::{BinaryOperator, Comparator, Int, NonEmpty, NonZeroUInt, UInt, UnaryOperator};
use std::fmt::{self, Write};

/// A bare dice roll, `XdY`. Both the count and the number of sides are
/// at least 1 by construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Dice {
    pub count: NonZeroUInt,
    pub sides: NonZeroUInt,
}

impl Dice {
    pub const fn new(count: NonZeroUInt, sides: NonZeroUInt) -> Self {
        Self { count, sides }
    }

    pub fn count(&self) -> UInt {
        self.count.get()
    }

    pub fn sides(&self) -> UInt {
        self.sides.get()
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)
    }
}

/// A single dice modifier, applied in parse order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Modifier {
    Exploding,
    CompoundExploding,
    KeepHighest(NonZeroUInt),
    KeepLowest(NonZeroUInt),
    DropHighest(NonZeroUInt),
    DropLowest(NonZeroUInt),
    Threshold(Comparator, Int),
}

impl Modifier {
    /// Human-readable form used in result breakdowns.
    pub fn describe(&self) -> String {
        match self {
            Self::Exploding => "exploding".to_string(),
            Self::CompoundExploding => "compound exploding".to_string(),
            Self::KeepHighest(n) => format!("keep highest {}", n),
            Self::KeepLowest(n) => format!("keep lowest {}", n),
            Self::DropHighest(n) => format!("drop highest {}", n),
            Self::DropLowest(n) => format!("drop lowest {}", n),
            Self::Threshold(cmp, v) => format!("count successes {} {}", cmp, v),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exploding => f.write_char('!'),
            Self::CompoundExploding => f.write_str("!!"),
            Self::KeepHighest(n) => write!(f, "kh{}", n),
            Self::KeepLowest(n) => write!(f, "kl{}", n),
            Self::DropHighest(n) => write!(f, "dh{}", n),
            Self::DropLowest(n) => write!(f, "dl{}", n),
            Self::Threshold(cmp, v) => write!(f, "{}{}", cmp, v),
        }
    }
}

/// The outcome-rule literals the grammar recognizes. Held as its own enum
/// so further rule spellings extend here without touching the parser's
/// tagged-group production.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OutcomeRuleKind {
    HigherTag,
}

impl fmt::Display for OutcomeRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HigherTag => f.write_str("higher_tag determines outcome"),
        }
    }
}

/// One parsed expression. Children are exclusively owned, so trees are
/// acyclic by construction; tables cross-reference by name only.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Int),
    Dice(Dice),
    Modified {
        dice: Dice,
        modifier: Modifier,
    },
    MultiModified {
        dice: Dice,
        modifiers: NonEmpty<Modifier>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Preserves explicit parenthesization for display round-tripping;
    /// evaluation order already lives in the tree shape.
    Group(Box<Expr>),
    TableLookup {
        name: String,
    },
    VarDecl {
        name: String,
        expr: Box<Expr>,
    },
    VarRef {
        name: String,
    },
    TaggedGroup {
        entries: NonEmpty<(String, Expr)>,
        rule: OutcomeRuleKind,
    },
}

impl Expr {
    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn group(inner: Expr) -> Self {
        Self::Group(Box::new(inner))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(x) => fmt::Display::fmt(x, f),
            Self::Dice(dice) => fmt::Display::fmt(dice, f),
            Self::Modified { dice, modifier } => write!(f, "{}{}", dice, modifier),
            Self::MultiModified { dice, modifiers } => {
                fmt::Display::fmt(dice, f)?;
                for m in modifiers {
                    fmt::Display::fmt(m, f)?;
                }
                Ok(())
            }
            Self::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Self::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Self::Group(inner) => write!(f, "({})", inner),
            Self::TableLookup { name } => write!(f, "@{}", name),
            Self::VarDecl { name, expr } => write!(f, "{} = {}", name, expr),
            Self::VarRef { name } => f.write_str(name),
            Self::TaggedGroup { entries, rule } => {
                f.write_char('[')?;
                for (i, (tag, expr)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", tag, expr)?;
                }
                write!(f, "] => {}", rule)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::vec1;

    fn d(count: UInt, sides: UInt) -> Dice {
        Dice::new(
            NonZeroUInt::new(count).unwrap(),
            NonZeroUInt::new(sides).unwrap(),
        )
    }

    #[test]
    fn test_display_dice() {
        assert_eq!(d(2, 6).to_string(), "2d6");
        assert_eq!(
            Expr::Modified {
                dice: d(4, 6),
                modifier: Modifier::KeepHighest(NonZeroUInt::new(3).unwrap()),
            }
            .to_string(),
            "4d6kh3"
        );
        assert_eq!(
            Expr::MultiModified {
                dice: d(4, 6),
                modifiers: vec1![
                    Modifier::Exploding,
                    Modifier::Threshold(Comparator::GreaterEqual, 5)
                ],
            }
            .to_string(),
            "4d6!>=5"
        );
    }

    #[test]
    fn test_display_compound() {
        let expr = Expr::binary(
            BinaryOperator::Mul,
            Expr::group(Expr::binary(
                BinaryOperator::Add,
                Expr::Dice(d(2, 6)),
                Expr::Literal(3),
            )),
            Expr::Literal(2),
        );
        assert_eq!(expr.to_string(), "(2d6 + 3) * 2");
    }

    #[test]
    fn test_display_tagged_group() {
        let expr = Expr::TaggedGroup {
            entries: vec1![
                ("atk".to_string(), Expr::Dice(d(1, 20))),
                ("def".to_string(), Expr::Dice(d(1, 20))),
            ],
            rule: OutcomeRuleKind::HigherTag,
        };
        assert_eq!(
            expr.to_string(),
            "[atk: 1d20, def: 1d20] => higher_tag determines outcome"
        );
    }
}
