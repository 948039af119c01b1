//! Validation Gate
//!
//! Holds the registered field names and the predicate deciding on their text.

use std::collections::HashSet;

use crate::error::PredicateError;

/// Decides whether a field's text is acceptable.
///
/// Any `Fn(&str, &str) -> bool` taking `(data, field_name)` is a predicate.
/// Implement the trait directly to report failures the predicate cannot
/// decide on; those abort the run.
pub trait FieldPredicate {
    fn check(&self, data: &str, field: &str) -> Result<bool, PredicateError>;
}

impl<F> FieldPredicate for F
where
    F: Fn(&str, &str) -> bool,
{
    fn check(&self, data: &str, field: &str) -> Result<bool, PredicateError> {
        Ok(self(data, field))
    }
}

/// Registered fields plus the predicate that validates them
pub struct ValidationGate<'p> {
    fields: HashSet<String>,
    predicate: &'p dyn FieldPredicate,
}

impl<'p> ValidationGate<'p> {
    pub fn new<I, S>(fields: I, predicate: &'p dyn FieldPredicate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidationGate {
            fields: fields.into_iter().map(Into::into).collect(),
            predicate,
        }
    }

    /// Whether text inside `name` has to be validated
    pub fn is_registered(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    /// Validate the complete text of one registered field occurrence.
    /// Unregistered fields pass without consulting the predicate.
    pub fn check(&self, data: &str, field: &str) -> Result<bool, PredicateError> {
        if !self.is_registered(field) {
            return Ok(true);
        }
        self.predicate.check(data, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Unavailable;

    impl FieldPredicate for Unavailable {
        fn check(&self, _data: &str, field: &str) -> Result<bool, PredicateError> {
            Err(PredicateError::new(field, "service unavailable"))
        }
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |data: &str, _field: &str| data == "ok";
        let gate = ValidationGate::new(["price"], &predicate);
        assert_eq!(gate.check("ok", "price"), Ok(true));
        assert_eq!(gate.check("bad", "price"), Ok(false));
    }

    #[test]
    fn test_unregistered_field_passes_without_call() {
        let calls = Cell::new(0);
        let predicate = |_: &str, _: &str| {
            calls.set(calls.get() + 1);
            false
        };
        let gate = ValidationGate::new(["price"], &predicate);
        assert!(!gate.is_registered("name"));
        assert_eq!(gate.check("anything", "name"), Ok(true));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_fallible_predicate() {
        let gate = ValidationGate::new(vec!["price".to_string()], &Unavailable);
        let err = gate.check("1", "price").unwrap_err();
        assert_eq!(err.field, "price");
    }
}
