use super::ast::Dice;
use crate::common::{Int, NonZeroUInt, UInt};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Raw lexeme classification. `TokenKind` mirrors this with the two kinds
/// the scanner itself never yields (`Eof`, `BadNumber`).
#[derive(Logos, Debug, Copy, Clone, PartialEq)]
enum Lexeme {
    #[regex(r"[0-9]+", |lex| lex.slice().parse())]
    Integer(Int),

    #[regex(r"([1-9][0-9]*)?d[1-9][0-9]*", |lex| parse_dice(lex.slice()), priority = 6)]
    Dice(Dice),

    // A dice literal with a zero count or zero sides. Carried through to the
    // parser so the error names the notation instead of a stray character.
    #[regex(r"0[0-9]*d[0-9]+", priority = 6)]
    #[regex(r"[0-9]*d0[0-9]*", priority = 7)]
    ZeroDice,

    // Short keep/drop forms are keywords only when digits follow; longest
    // match turns `khword` into a plain identifier.
    #[regex(r"kh[0-9]+", |lex| parse_count(lex.slice()), priority = 4)]
    KeepHighest(UInt),
    #[regex(r"kl[0-9]+", |lex| parse_count(lex.slice()), priority = 4)]
    KeepLowest(UInt),
    #[regex(r"dh[0-9]+", |lex| parse_count(lex.slice()), priority = 4)]
    DropHighest(UInt),
    #[regex(r"dl[0-9]+", |lex| parse_count(lex.slice()), priority = 4)]
    DropLowest(UInt),

    #[token("keep", ignore(ascii_case))]
    KwKeep,
    #[token("drop", ignore(ascii_case))]
    KwDrop,
    #[token("highest", ignore(ascii_case))]
    KwHighest,
    #[token("lowest", ignore(ascii_case))]
    KwLowest,
    #[token("higher_tag", ignore(ascii_case))]
    KwHigherTag,
    #[token("determines", ignore(ascii_case))]
    KwDetermines,
    #[token("outcome", ignore(ascii_case))]
    KwOutcome,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("@")]
    At,

    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,
    #[token("=")]
    Assign,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token("!!")]
    BangBang,
    #[token("!")]
    Bang,

    #[token(">=")]
    GreaterEqual,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    GreaterThan,
    #[token("<")]
    LessThan,

    #[token("\n")]
    Newline,

    #[regex(r"[ \t\r]+", logos::skip)]
    #[error]
    Unknown,
}

// `unwrap` is fine here: logos has verified the shape of the slice.
fn parse_dice(s: &str) -> Result<Dice, std::num::ParseIntError> {
    let (count, sides) = s.split_once('d').unwrap();
    let count = if count.is_empty() {
        NonZeroUInt::new(1).unwrap()
    } else {
        count.parse()?
    };
    let sides = sides.parse()?;
    Ok(Dice::new(count, sides))
}

fn parse_count(s: &str) -> Result<UInt, std::num::ParseIntError> {
    s[2..].parse()
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind {
    Integer(Int),
    Dice(Dice),
    ZeroDice,
    KeepHighest(UInt),
    KeepLowest(UInt),
    DropHighest(UInt),
    DropLowest(UInt),
    KwKeep,
    KwDrop,
    KwHighest,
    KwLowest,
    KwHigherTag,
    KwDetermines,
    KwOutcome,
    Ident,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Colon,
    Comma,
    At,
    FatArrow,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    BangBang,
    Bang,
    GreaterEqual,
    LessEqual,
    GreaterThan,
    LessThan,
    Newline,
    /// A character sequence no rule matched. Represented, never dropped.
    Unknown,
    /// An integer literal too large for `Int`.
    BadNumber,
    /// Explicit end-of-input marker, always the final token.
    Eof,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        use TokenKind::*;

        match self {
            Integer(_) => "<integer>",
            Dice(_) => "<dice>",
            ZeroDice => "<invalid dice>",
            KeepHighest(_) => "'kh'",
            KeepLowest(_) => "'kl'",
            DropHighest(_) => "'dh'",
            DropLowest(_) => "'dl'",
            KwKeep => "'keep'",
            KwDrop => "'drop'",
            KwHighest => "'highest'",
            KwLowest => "'lowest'",
            KwHigherTag => "'higher_tag'",
            KwDetermines => "'determines'",
            KwOutcome => "'outcome'",
            Ident => "<identifier>",
            LeftParen => "'('",
            RightParen => "')'",
            LeftBracket => "'['",
            RightBracket => "']'",
            Colon => "':'",
            Comma => "','",
            At => "'@'",
            FatArrow => "'=>'",
            Arrow => "'->'",
            Assign => "'='",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            BangBang => "'!!'",
            Bang => "'!'",
            GreaterEqual => "'>='",
            LessEqual => "'<='",
            GreaterThan => "'>'",
            LessThan => "'<'",
            Newline => "<newline>",
            Unknown => "<unknown>",
            BadNumber => "<malformed number>",
            Eof => "<end of input>",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Lexeme> for TokenKind {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::Integer(x) => Self::Integer(x),
            Lexeme::Dice(d) => Self::Dice(d),
            Lexeme::ZeroDice => Self::ZeroDice,
            Lexeme::KeepHighest(n) => Self::KeepHighest(n),
            Lexeme::KeepLowest(n) => Self::KeepLowest(n),
            Lexeme::DropHighest(n) => Self::DropHighest(n),
            Lexeme::DropLowest(n) => Self::DropLowest(n),
            Lexeme::KwKeep => Self::KwKeep,
            Lexeme::KwDrop => Self::KwDrop,
            Lexeme::KwHighest => Self::KwHighest,
            Lexeme::KwLowest => Self::KwLowest,
            Lexeme::KwHigherTag => Self::KwHigherTag,
            Lexeme::KwDetermines => Self::KwDetermines,
            Lexeme::KwOutcome => Self::KwOutcome,
            Lexeme::Ident => Self::Ident,
            Lexeme::LeftParen => Self::LeftParen,
            Lexeme::RightParen => Self::RightParen,
            Lexeme::LeftBracket => Self::LeftBracket,
            Lexeme::RightBracket => Self::RightBracket,
            Lexeme::Colon => Self::Colon,
            Lexeme::Comma => Self::Comma,
            Lexeme::At => Self::At,
            Lexeme::FatArrow => Self::FatArrow,
            Lexeme::Arrow => Self::Arrow,
            Lexeme::Assign => Self::Assign,
            Lexeme::Plus => Self::Plus,
            Lexeme::Minus => Self::Minus,
            Lexeme::Star => Self::Star,
            Lexeme::Slash => Self::Slash,
            Lexeme::BangBang => Self::BangBang,
            Lexeme::Bang => Self::Bang,
            Lexeme::GreaterEqual => Self::GreaterEqual,
            Lexeme::LessEqual => Self::LessEqual,
            Lexeme::GreaterThan => Self::GreaterThan,
            Lexeme::LessThan => Self::LessThan,
            Lexeme::Newline => Self::Newline,
            Lexeme::Unknown => Self::Unknown,
        }
    }
}

/// One scanned token with its position. Lexemes borrow from the source;
/// tokens live only as long as one parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
    /// 1-based.
    pub line: u32,
    /// 1-based byte column within the line.
    pub column: u32,
}

/// Scans the whole input. Never fails: unmatchable characters become
/// `Unknown` tokens, overflowing integer literals become `BadNumber`, and
/// the stream always ends with an `Eof` token.
pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexeme::lexer(src);
    let mut tokens = Vec::new();
    let mut line: u32 = 1;
    let mut line_start: usize = 0;

    while let Some(lexeme) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let mut kind = TokenKind::from(lexeme);
        if kind == TokenKind::Unknown && slice.bytes().all(|b| b.is_ascii_digit()) {
            kind = TokenKind::BadNumber;
        }
        tokens.push(Token {
            kind,
            lexeme: slice,
            span: span.clone(),
            line,
            column: (span.start - line_start + 1) as u32,
        });
        if kind == TokenKind::Newline {
            line += 1;
            line_start = span.end;
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        lexeme: "",
        span: src.len()..src.len(),
        line,
        column: (src.len() - line_start + 1) as u32,
    });
    tokens
}
