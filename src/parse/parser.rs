use super::ast::{Dice, Expr, Modifier, OutcomeRuleKind};
use super::lexer::{tokenize, Token, TokenKind};
use crate::common::{
    BinaryOperator, Comparator, Int, NonEmpty, NonZeroUInt, UInt, UnaryOperator,
};
use std::fmt;

type PResult<T = Expr> = Result<T, ParseError>;

/// Parses one statement: a variable declaration or a single expression.
/// Input remaining after a complete statement is an error.
pub fn parse(src: &str) -> PResult {
    Parser::new(src).parse_statement()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("error at line {line}, column {column} ({lexeme:?}): {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: u32,
    pub column: u32,
    pub lexeme: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken {
        found: &'static str,
        expected: Vec<&'static str>,
    },
    UnexpectedEndOfInput {
        expected: Vec<&'static str>,
    },
    UnknownCharacter,
    MalformedNumber,
    InvalidDice,
    InvalidKeepDrop {
        requested: Int,
        rolled: UInt,
        dropping: bool,
    },
    NegativeThreshold,
    UnclosedParentheses,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { found, expected } => {
                write!(f, "unexpected token: found {}, expected ", found)?;
                fmt_expected(expected, f)
            }
            Self::UnexpectedEndOfInput { expected } => {
                write!(f, "unexpected end of input: expected ")?;
                fmt_expected(expected, f)
            }
            Self::UnknownCharacter => write!(f, "unrecognized character"),
            Self::MalformedNumber => write!(f, "malformed numeric literal"),
            Self::InvalidDice => {
                write!(f, "invalid dice notation: count and sides must be at least 1")
            }
            Self::InvalidKeepDrop {
                requested,
                rolled,
                dropping,
            } => {
                let verb = if *dropping { "drop" } else { "keep" };
                write!(
                    f,
                    "cannot {} {} of {} rolled dice",
                    verb, requested, rolled
                )
            }
            Self::NegativeThreshold => write!(f, "threshold value must not be negative"),
            Self::UnclosedParentheses => write!(f, "unclosed parentheses"),
        }
    }
}

fn fmt_expected(expected: &[&'static str], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expected {
        [] => Ok(()),
        [single] => f.write_str(single),
        [first, second] => write!(f, "{} or {}", first, second),
        [init @ .., last] => {
            for exp in init {
                write!(f, "{}, ", exp)?;
            }
            write!(f, "or {}", last)
        }
    }
}

impl ParseError {
    /// Best-effort correction advice. Advisory only: the error's kind is
    /// the contract, the suggestion is free text.
    pub fn suggestion(&self) -> Option<String> {
        match &self.kind {
            ParseErrorKind::UnclosedParentheses => Some("add a closing ')'".to_string()),
            ParseErrorKind::UnexpectedToken { found, .. }
                if matches!(*found, "'!'" | "'!!'" | "'kh'" | "'kl'" | "'dh'" | "'dl'") =>
            {
                Some(
                    "dice modifiers only follow dice; prefix the number with the dice \
                     marker (e.g. `d6!`)"
                        .to_string(),
                )
            }
            _ => None,
        }
    }
}

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            tokens: tokenize(src),
            pos: 0,
        }
    }

    fn peek(&self) -> &Token<'a> {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_second_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == TokenKind::Newline {
            self.advance();
        }
    }

    fn error_here<T>(&self, kind: ParseErrorKind) -> PResult<T> {
        let token = self.peek();
        Err(ParseError {
            kind,
            line: token.line,
            column: token.column,
            lexeme: token.lexeme.to_string(),
        })
    }

    fn unexpected<T>(&self, expected: Vec<&'static str>) -> PResult<T> {
        let kind = match self.peek_kind() {
            TokenKind::Eof => ParseErrorKind::UnexpectedEndOfInput { expected },
            TokenKind::Unknown => ParseErrorKind::UnknownCharacter,
            TokenKind::BadNumber => ParseErrorKind::MalformedNumber,
            TokenKind::ZeroDice => ParseErrorKind::InvalidDice,
            found => ParseErrorKind::UnexpectedToken {
                found: found.as_str(),
                expected,
            },
        };
        self.error_here(kind)
    }

    pub fn parse_statement(&mut self) -> PResult {
        self.skip_newlines();

        // An identifier followed by `=` is a declaration; followed by
        // anything else it is a reference. Pure lookahead, no backtracking.
        let expr = if self.peek_kind() == TokenKind::Ident
            && self.peek_second_kind() == TokenKind::Assign
        {
            let name = self.advance().lexeme.to_string();
            self.advance(); // `=`
            let rhs = self.parse_expression()?;
            Expr::VarDecl {
                name,
                expr: Box::new(rhs),
            }
        } else {
            self.parse_expression()?
        };

        self.skip_newlines();
        if self.peek_kind() != TokenKind::Eof {
            return self.unexpected(vec!["end of input"]);
        }
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> PResult {
        self.parse_addition()
    }

    fn parse_addition(&mut self) -> PResult {
        let mut lhs = self.parse_multiplication()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplication()?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_multiplication(&mut self) -> PResult {
        let mut lhs = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOperator::Mul,
                TokenKind::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult {
        let op = match self.peek_kind() {
            TokenKind::Plus => UnaryOperator::Pos,
            TokenKind::Minus => UnaryOperator::Neg,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::unary(op, operand))
    }

    fn parse_primary(&mut self) -> PResult {
        match self.peek_kind() {
            TokenKind::LeftBracket => self.parse_tagged_group(),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                if self.peek_kind() != TokenKind::RightParen {
                    return self.error_here(ParseErrorKind::UnclosedParentheses);
                }
                self.advance();
                Ok(Expr::group(inner))
            }
            TokenKind::At => {
                self.advance();
                if self.peek_kind() != TokenKind::Ident {
                    return self.unexpected(vec!["table name"]);
                }
                let name = self.advance().lexeme.to_string();
                Ok(Expr::TableLookup { name })
            }
            TokenKind::Integer(x) => {
                self.advance();
                Ok(Expr::Literal(x))
            }
            TokenKind::Dice(dice) => {
                self.advance();
                self.parse_modifiers(dice)
            }
            TokenKind::Ident => {
                let name = self.advance().lexeme.to_string();
                Ok(Expr::VarRef { name })
            }
            _ => self.unexpected(vec![
                "<integer>",
                "<dice>",
                "'('",
                "'['",
                "'@'",
                "<identifier>",
            ]),
        }
    }

    /// After the base `XdY`: optionally one exploding marker, then
    /// optionally one keep/drop, then optionally one threshold.
    fn parse_modifiers(&mut self, dice: Dice) -> PResult {
        let mut modifiers = Vec::new();

        match self.peek_kind() {
            TokenKind::Bang => {
                self.advance();
                modifiers.push(Modifier::Exploding);
            }
            TokenKind::BangBang => {
                self.advance();
                modifiers.push(Modifier::CompoundExploding);
            }
            _ => {}
        }

        if let Some(modifier) = self.parse_keep_drop(dice)? {
            modifiers.push(modifier);
        }

        if let Some(modifier) = self.parse_threshold()? {
            modifiers.push(modifier);
        }

        Ok(match modifiers.len() {
            0 => Expr::Dice(dice),
            1 => Expr::Modified {
                dice,
                modifier: modifiers[0],
            },
            // Length checked just above.
            _ => Expr::MultiModified {
                dice,
                modifiers: NonEmpty::try_from_vec(modifiers).unwrap(),
            },
        })
    }

    fn parse_keep_drop(&mut self, dice: Dice) -> PResult<Option<Modifier>> {
        let (count, dropping, highest) = match self.peek_kind() {
            TokenKind::KeepHighest(n) => (Int::from(n), false, true),
            TokenKind::KeepLowest(n) => (Int::from(n), false, false),
            TokenKind::DropHighest(n) => (Int::from(n), true, true),
            TokenKind::DropLowest(n) => (Int::from(n), true, false),
            TokenKind::KwKeep | TokenKind::KwDrop => {
                return self.parse_long_keep_drop(dice).map(Some)
            }
            _ => return Ok(None),
        };
        self.advance();
        self.build_keep_drop(dice, count, dropping, highest)
            .map(Some)
    }

    fn parse_long_keep_drop(&mut self, dice: Dice) -> PResult<Modifier> {
        let dropping = self.peek_kind() == TokenKind::KwDrop;
        self.advance();

        let highest = match self.peek_kind() {
            TokenKind::KwHighest => true,
            TokenKind::KwLowest => false,
            _ => return self.unexpected(vec!["'highest'", "'lowest'"]),
        };
        self.advance();

        let count = match self.peek_kind() {
            TokenKind::Integer(x) => x,
            _ => return self.unexpected(vec!["<integer>"]),
        };
        self.advance();

        self.build_keep_drop(dice, count, dropping, highest)
    }

    /// Keep counts must not exceed the dice count; drop counts must leave
    /// at least one die. Both must be positive. Never clamped.
    fn build_keep_drop(
        &self,
        dice: Dice,
        count: Int,
        dropping: bool,
        highest: bool,
    ) -> PResult<Modifier> {
        let rolled = dice.count();
        let in_bounds = if dropping {
            count > 0 && count < Int::from(rolled)
        } else {
            count > 0 && count <= Int::from(rolled)
        };
        if !in_bounds {
            return self.error_here(ParseErrorKind::InvalidKeepDrop {
                requested: count,
                rolled,
                dropping,
            });
        }
        // In bounds, so the count fits a positive u32.
        let n = NonZeroUInt::new(count as UInt).unwrap();
        Ok(match (dropping, highest) {
            (false, true) => Modifier::KeepHighest(n),
            (false, false) => Modifier::KeepLowest(n),
            (true, true) => Modifier::DropHighest(n),
            (true, false) => Modifier::DropLowest(n),
        })
    }

    fn parse_threshold(&mut self) -> PResult<Option<Modifier>> {
        let cmp = match self.peek_kind() {
            TokenKind::GreaterEqual => Comparator::GreaterEqual,
            TokenKind::LessEqual => Comparator::LessEqual,
            TokenKind::GreaterThan => Comparator::Greater,
            TokenKind::LessThan => Comparator::Less,
            _ => return Ok(None),
        };
        self.advance();

        match self.peek_kind() {
            // Values above the die's sides are allowed (an intentionally
            // impossible threshold); negative values are not.
            TokenKind::Minus => self.error_here(ParseErrorKind::NegativeThreshold),
            TokenKind::Integer(value) => {
                self.advance();
                Ok(Some(Modifier::Threshold(cmp, value)))
            }
            _ => self.unexpected(vec!["<integer>"]),
        }
    }

    fn parse_tagged_group(&mut self) -> PResult {
        self.advance(); // `[`

        let first = self.parse_tagged_entry()?;
        let mut entries = NonEmpty::new(first);
        while self.peek_kind() == TokenKind::Comma {
            self.advance();
            entries.push(self.parse_tagged_entry()?);
        }

        if self.peek_kind() != TokenKind::RightBracket {
            return self.unexpected(vec!["','", "']'"]);
        }
        self.advance();

        if self.peek_kind() != TokenKind::FatArrow {
            return self.unexpected(vec!["'=>'"]);
        }
        self.advance();

        let rule = self.parse_outcome_rule()?;
        Ok(Expr::TaggedGroup { entries, rule })
    }

    fn parse_tagged_entry(&mut self) -> PResult<(String, Expr)> {
        if self.peek_kind() != TokenKind::Ident {
            return self.unexpected(vec!["tag identifier"]);
        }
        let tag = self.advance().lexeme.to_string();

        if self.peek_kind() != TokenKind::Colon {
            return self.unexpected(vec!["':'"]);
        }
        self.advance();

        let dice = match self.peek_kind() {
            TokenKind::Dice(dice) => {
                self.advance();
                self.parse_modifiers(dice)?
            }
            _ => return self.unexpected(vec!["<dice>"]),
        };
        Ok((tag, dice))
    }

    fn parse_outcome_rule(&mut self) -> PResult<OutcomeRuleKind> {
        for expected in [
            (TokenKind::KwHigherTag, "'higher_tag'"),
            (TokenKind::KwDetermines, "'determines'"),
            (TokenKind::KwOutcome, "'outcome'"),
        ] {
            if self.peek_kind() != expected.0 {
                return self.unexpected(vec![expected.1]);
            }
            self.advance();
        }
        Ok(OutcomeRuleKind::HigherTag)
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

    fn nz(n: UInt) -> NonZeroUInt {
        NonZeroUInt::new(n).unwrap()
    }

    fn check(src: &str, expected: Expr) {
        assert_eq!(parse(src).unwrap(), expected, "input: {:?}", src);
    }

    fn check_err(src: &str, expected: ParseErrorKind) {
        assert_eq!(parse(src).unwrap_err().kind, expected, "input: {:?}", src);
    }

    #[test]
    fn test_parse_literals_and_dice() {
        check("42", Expr::Literal(42));
        check("2d6", Expr::Dice(d(2, 6)));
        check("d20", Expr::Dice(d(1, 20)));
    }

    #[test]
    fn test_parse_modifiers() {
        check(
            "4d6kh3",
            Expr::Modified {
                dice: d(4, 6),
                modifier: Modifier::KeepHighest(nz(3)),
            },
        );
        check(
            "4d6 keep lowest 2",
            Expr::Modified {
                dice: d(4, 6),
                modifier: Modifier::KeepLowest(nz(2)),
            },
        );
        check(
            "5d10 drop highest 1",
            Expr::Modified {
                dice: d(5, 10),
                modifier: Modifier::DropHighest(nz(1)),
            },
        );
        check(
            "d6!",
            Expr::Modified {
                dice: d(1, 6),
                modifier: Modifier::Exploding,
            },
        );
        check(
            "3d6!!",
            Expr::Modified {
                dice: d(3, 6),
                modifier: Modifier::CompoundExploding,
            },
        );
        check(
            "5d6>=4",
            Expr::Modified {
                dice: d(5, 6),
                modifier: Modifier::Threshold(Comparator::GreaterEqual, 4),
            },
        );
    }

    #[test]
    fn test_parse_modifier_chain_preserves_order() {
        check(
            "4d6!kh3>=5",
            Expr::MultiModified {
                dice: d(4, 6),
                modifiers: vec1![
                    Modifier::Exploding,
                    Modifier::KeepHighest(nz(3)),
                    Modifier::Threshold(Comparator::GreaterEqual, 5),
                ],
            },
        );
    }

    #[test]
    fn test_threshold_above_sides_is_allowed() {
        check(
            "2d6>7",
            Expr::Modified {
                dice: d(2, 6),
                modifier: Modifier::Threshold(Comparator::Greater, 7),
            },
        );
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        check(
            "1 + 2 * 3",
            Expr::binary(
                BinaryOperator::Add,
                Expr::Literal(1),
                Expr::binary(BinaryOperator::Mul, Expr::Literal(2), Expr::Literal(3)),
            ),
        );
        check(
            "1 - 2 - 3",
            Expr::binary(
                BinaryOperator::Sub,
                Expr::binary(BinaryOperator::Sub, Expr::Literal(1), Expr::Literal(2)),
                Expr::Literal(3),
            ),
        );
        check(
            "(2d6+3)*2",
            Expr::binary(
                BinaryOperator::Mul,
                Expr::group(Expr::binary(
                    BinaryOperator::Add,
                    Expr::Dice(d(2, 6)),
                    Expr::Literal(3),
                )),
                Expr::Literal(2),
            ),
        );
        check(
            "-d6",
            Expr::unary(UnaryOperator::Neg, Expr::Dice(d(1, 6))),
        );
    }

    #[test]
    fn test_parse_variables() {
        check(
            "hp = 2d8 + 2",
            Expr::VarDecl {
                name: "hp".to_string(),
                expr: Box::new(Expr::binary(
                    BinaryOperator::Add,
                    Expr::Dice(d(2, 8)),
                    Expr::Literal(2),
                )),
            },
        );
        check(
            "hp",
            Expr::VarRef {
                name: "hp".to_string(),
            },
        );
        check(
            "hp + 1",
            Expr::binary(
                BinaryOperator::Add,
                Expr::VarRef {
                    name: "hp".to_string(),
                },
                Expr::Literal(1),
            ),
        );
    }

    #[test]
    fn test_parse_table_lookup() {
        check(
            "@loot",
            Expr::TableLookup {
                name: "loot".to_string(),
            },
        );
        check_err("@", ParseErrorKind::UnexpectedEndOfInput {
            expected: vec!["table name"],
        });
    }

    #[test]
    fn test_parse_tagged_group() {
        check(
            "[atk: 1d20, def: 1d20kh1] => higher_tag determines outcome",
            Expr::TaggedGroup {
                entries: vec1![
                    ("atk".to_string(), Expr::Dice(d(1, 20))),
                    (
                        "def".to_string(),
                        Expr::Modified {
                            dice: d(1, 20),
                            modifier: Modifier::KeepHighest(nz(1)),
                        }
                    ),
                ],
                rule: OutcomeRuleKind::HigherTag,
            },
        );
    }

    #[test]
    fn test_keep_drop_bounds() {
        check_err(
            "4d6kh5",
            ParseErrorKind::InvalidKeepDrop {
                requested: 5,
                rolled: 4,
                dropping: false,
            },
        );
        check_err(
            "4d6dl4",
            ParseErrorKind::InvalidKeepDrop {
                requested: 4,
                rolled: 4,
                dropping: true,
            },
        );
        check_err(
            "4d6kh0",
            ParseErrorKind::InvalidKeepDrop {
                requested: 0,
                rolled: 4,
                dropping: false,
            },
        );
        // Keeping every die is fine.
        check(
            "4d6kh4",
            Expr::Modified {
                dice: d(4, 6),
                modifier: Modifier::KeepHighest(nz(4)),
            },
        );
    }

    #[test]
    fn test_invalid_dice() {
        check_err("0d6", ParseErrorKind::InvalidDice);
        check_err("2d0", ParseErrorKind::InvalidDice);
    }

    #[test]
    fn test_negative_threshold() {
        check_err("5d6>=-1", ParseErrorKind::NegativeThreshold);
    }

    #[test]
    fn test_unclosed_parentheses() {
        check_err("(2d6 + 3", ParseErrorKind::UnclosedParentheses);
        assert!(parse("(2d6 + 3").unwrap_err().suggestion().is_some());
    }

    #[test]
    fn test_trailing_input_rejected() {
        check_err(
            "2d6 5",
            ParseErrorKind::UnexpectedToken {
                found: "<integer>",
                expected: vec!["end of input"],
            },
        );
    }

    #[test]
    fn test_unknown_character() {
        check_err("2d6 # 4", ParseErrorKind::UnknownCharacter);
    }

    #[test]
    fn test_error_positions() {
        let err = parse("2d6 +").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 6);

        let err = parse("2d6 5").unwrap_err();
        assert_eq!(err.column, 5);
        assert_eq!(err.lexeme, "5");
    }

    #[test]
    fn test_modifier_after_bare_number_suggestion() {
        let err = parse("6!").unwrap_err();
        assert!(err.suggestion().unwrap().contains("dice marker"));
    }

    #[test]
    fn test_display_round_trip() {
        for src in [
            "4d6kh3",
            "4d6!kh3>=5",
            "2d6!!",
            "(2d6 + 3) * 2",
            "-d6 + 4",
            "@loot",
            "hp = 2d8 + 2",
            "[atk: 1d20, def: 2d6!] => higher_tag determines outcome",
        ] {
            let first = parse(src).unwrap();
            let second = parse(&first.to_string()).unwrap();
            assert_eq!(first, second, "round trip failed for {:?}", src);
        }
    }
}
