use std::fmt::{self, Write};
use std::num::NonZeroU32;

/// The type of evaluated totals and individual roll values.
pub type Int = i64;
/// The type of die face values, counts, sides and table weights.
pub type UInt = u32;
pub type NonZeroUInt = NonZeroU32;

pub type NonEmpty<T> = vec1::Vec1<T>;
pub use vec1::vec1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOperator {
    Pos,
    Neg,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::Pos => '+',
            Self::Neg => '-',
        };
        f.write_char(c)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Comparator {
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl Comparator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterEqual => ">=",
            Self::LessEqual => "<=",
        }
    }

    pub fn compare(&self, lhs: Int, rhs: Int) -> bool {
        match self {
            Self::Greater => lhs > rhs,
            Self::Less => lhs < rhs,
            Self::GreaterEqual => lhs >= rhs,
            Self::LessEqual => lhs <= rhs,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_compare() {
        assert!(Comparator::Greater.compare(4, 3));
        assert!(!Comparator::Greater.compare(3, 3));
        assert!(Comparator::GreaterEqual.compare(3, 3));
        assert!(Comparator::Less.compare(2, 3));
        assert!(Comparator::LessEqual.compare(3, 3));
        assert!(!Comparator::LessEqual.compare(4, 3));
    }

    #[test]
    fn test_display() {
        assert_eq!(Comparator::GreaterEqual.to_string(), ">=");
        assert_eq!(BinaryOperator::Mul.to_string(), "*");
        assert_eq!(UnaryOperator::Neg.to_string(), "-");
    }
}
