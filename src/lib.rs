//! An interpreter for a dice-rolling expression language.
//!
//! Source text is parsed into an expression tree, then evaluated against a
//! [`RandomSource`]. Evaluation can optionally draw on registered
//! [`RandomTable`]s and a [`VariableContext`] of named expressions.
//!
//! ```
//! use dicelang::{parse, EvalContext};
//!
//! let expr = parse("4d6kh3 + 2")?;
//! let mut rng = rand::thread_rng();
//! let result = EvalContext::new(&mut rng).eval(&expr)?;
//! assert!((5..=20).contains(&result.total));
//! # Ok::<(), dicelang::Error>(())
//! ```
//!
//! Tests substitute [`ReplaySource`] for the RNG: draws are consumed in a
//! fixed order, so a scripted sequence of values makes any evaluation
//! deterministic.

pub mod common;
pub mod error;
pub mod outcome;
pub mod parse;
pub mod roll;
pub mod table;
pub mod vars;

pub use error::Error;
pub use parse::{parse, ParseError};
pub use parse::ast::Expr;
pub use roll::{DiceResult, EvalContext, RandomSource, ReplaySource};
pub use table::{RandomTable, TableError, TableManager};
pub use vars::VariableContext;

pub type Result<T, E = Error> = std::result::Result<T, E>;
