use crate::common::Int;
use crate::parse::ParseError;
use crate::table::TableError;

/// Any failure from parsing or evaluation.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("division by zero")]
    DivisionByZero,
    #[error("variable {0:?} has not been declared")]
    UndeclaredVariable(String),
    #[error("variable {0:?} is already declared")]
    VariableRedeclaration(String),
    #[error("the expression declares a variable but no variable store was provided")]
    NoVariableStore,
    #[error("evaluation exceeded the budget of {0} rolls")]
    TooManyRolls(usize),
    #[error("value {value} is out of range ({min}..={max})")]
    OutOfRange { value: Int, min: Int, max: Int },
    #[error("{msg}")]
    Context {
        msg: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps the error with a caller-side description of what was being
    /// attempted.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        Self::Context {
            msg: msg.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error, with any context layers removed.
    pub fn root(&self) -> &Self {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    /// A fix the user could try, when one is known.
    pub fn suggestion(&self) -> Option<String> {
        match self.root() {
            Self::Parse(parse) => parse.suggestion(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn test_context_wrapping() {
        let err = Error::DivisionByZero.with_context("while evaluating damage");
        assert_eq!(err.to_string(), "while evaluating damage");
        assert_eq!(err.root(), &Error::DivisionByZero);

        let nested = err.with_context("while resolving the attack");
        assert_eq!(nested.root(), &Error::DivisionByZero);
    }

    #[test]
    fn test_parse_errors_convert() {
        let err: Error = parse("(1 + 2").unwrap_err().into();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(err.suggestion(), Some("add a closing ')'".to_string()));
    }

    #[test]
    fn test_suggestion_survives_context() {
        let err: Error = parse("(1 + 2").unwrap_err().into();
        let wrapped = err.with_context("while reading input");
        assert!(wrapped.suggestion().is_some());
    }
}
