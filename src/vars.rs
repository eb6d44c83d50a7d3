use crate::error::Error;
use crate::parse::ast::Expr;
use std::collections::HashMap;

/// Named expressions. A declaration binds the parsed NODE, not a value, so
/// `x = 2d6` re-rolls at every reference to `x`. Bindings are immutable
/// once declared.
#[derive(Debug, Default)]
pub struct VariableContext {
    map: HashMap<String, Expr>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `expr`. Declaring a name twice is an error; there is
    /// no shadowing and no reassignment.
    pub fn declare(&mut self, name: String, expr: Expr) -> crate::Result<()> {
        if self.map.contains_key(&name) {
            return Err(Error::VariableRedeclaration(name));
        }
        self.map.insert(name, expr);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Expr> {
        self.map.get(name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Declared names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn test_declare_and_lookup() {
        let mut vars = VariableContext::new();
        let expr = parse("2d6 + 1").unwrap();
        vars.declare("bonus".to_string(), expr.clone()).unwrap();
        assert!(vars.is_declared("bonus"));
        assert_eq!(vars.lookup("bonus"), Some(&expr));
        assert_eq!(vars.lookup("other"), None);
    }

    #[test]
    fn test_redeclaration_rejected() {
        let mut vars = VariableContext::new();
        vars.declare("x".to_string(), Expr::Literal(1)).unwrap();
        let err = vars.declare("x".to_string(), Expr::Literal(2)).unwrap_err();
        assert_eq!(err, Error::VariableRedeclaration("x".to_string()));
        // The original binding is untouched.
        assert_eq!(vars.lookup("x"), Some(&Expr::Literal(1)));
    }

    #[test]
    fn test_names() {
        let mut vars = VariableContext::new();
        vars.declare("a".to_string(), Expr::Literal(1)).unwrap();
        vars.declare("b".to_string(), Expr::Literal(2)).unwrap();
        let mut names: Vec<&str> = vars.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b"]);
    }
}
