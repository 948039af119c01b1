//! Rule-based field predicate
//!
//! A [`RuleSet`] decides on field values from a list of per-field checks,
//! usually loaded from the `[[rules]]` array of the config file. A field
//! without a rule never passes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chunker::gate::FieldPredicate;
use crate::error::PredicateError;

/// Check applied to one field's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCheck {
    /// Non-empty, and the leading integer is greater than zero
    PositiveInteger,
    /// Must not contain any of the listed substrings
    ExcludeSubstrings(Vec<String>),
}

impl RuleCheck {
    pub fn passes(&self, data: &str) -> bool {
        match self {
            RuleCheck::PositiveInteger => !data.is_empty() && data != "0" && leading_integer(data) > 0,
            RuleCheck::ExcludeSubstrings(values) => !values.iter().any(|v| data.contains(v.as_str())),
        }
    }
}

/// A check bound to a field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub check: RuleCheck,
}

/// Field predicate backed by a rule list
///
/// Several rules for the same field must all pass.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: HashMap<String, Vec<RuleCheck>>,
    /// Field names in first-seen order
    order: Vec<String>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = FieldRule>) -> Self {
        let mut set = RuleSet::default();
        for rule in rules {
            set.add(rule);
        }
        set
    }

    pub fn add(&mut self, rule: FieldRule) {
        match self.rules.get_mut(&rule.field) {
            Some(checks) => checks.push(rule.check),
            None => {
                self.order.push(rule.field.clone());
                self.rules.insert(rule.field, vec![rule.check]);
            }
        }
    }

    /// Fields that have at least one rule
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn passes(&self, data: &str, field: &str) -> bool {
        match self.rules.get(field) {
            Some(checks) => checks.iter().all(|check| check.passes(data)),
            None => false,
        }
    }
}

impl FieldPredicate for RuleSet {
    fn check(&self, data: &str, field: &str) -> Result<bool, PredicateError> {
        Ok(self.passes(data, field))
    }
}

/// Leading integer of `text` read like C `atoi`: optional whitespace,
/// optional sign, then digits. Anything else yields 0; overflow saturates.
fn leading_integer(text: &str) -> i64 {
    let rest = text.trim_start();
    let (negative, digits) = match rest.as_bytes().first() {
        Some(b'-') => (true, &rest[1..]),
        Some(b'+') => (false, &rest[1..]),
        _ => (false, rest),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if negative {
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop_rules() -> RuleSet {
        RuleSet::new([
            FieldRule {
                field: "weight_kg".to_owned(),
                check: RuleCheck::PositiveInteger,
            },
            FieldRule {
                field: "serie".to_owned(),
                check: RuleCheck::ExcludeSubstrings(vec!["WOODY desky".to_owned()]),
            },
            FieldRule {
                field: "categoryText".to_owned(),
                check: RuleCheck::ExcludeSubstrings(vec!["Burkolatok".to_owned(), "| Mosogatók |".to_owned()]),
            },
        ])
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("5"), 5);
        assert_eq!(leading_integer("  12kg"), 12);
        assert_eq!(leading_integer("-3"), -3);
        assert_eq!(leading_integer("+7"), 7);
        assert_eq!(leading_integer("0.5"), 0);
        assert_eq!(leading_integer("abc"), 0);
        assert_eq!(leading_integer(""), 0);
        assert_eq!(leading_integer("99999999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_positive_integer() {
        let rules = shop_rules();
        assert!(rules.passes("5", "weight_kg"));
        assert!(rules.passes("2.5", "weight_kg"));
        assert!(!rules.passes("0", "weight_kg"));
        assert!(!rules.passes("", "weight_kg"));
        assert!(!rules.passes("-1", "weight_kg"));
        assert!(!rules.passes("heavy", "weight_kg"));
    }

    #[test]
    fn test_exclude_substrings() {
        let rules = shop_rules();
        assert!(rules.passes("DESK", "serie"));
        assert!(!rules.passes("Series WOODY desky 2", "serie"));
        assert!(!rules.passes("Fürdőszoba | Mosogatók | acél", "categoryText"));
        assert!(rules.passes("Csaptelepek", "categoryText"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(!shop_rules().passes("anything", "product"));
    }

    #[test]
    fn test_multiple_rules_per_field() {
        let mut rules = shop_rules();
        rules.add(FieldRule {
            field: "weight_kg".to_owned(),
            check: RuleCheck::ExcludeSubstrings(vec!["13".to_owned()]),
        });
        assert!(rules.passes("12", "weight_kg"));
        assert!(!rules.passes("13", "weight_kg"));
        assert_eq!(rules.fields().collect::<Vec<_>>(), vec!["weight_kg", "serie", "categoryText"]);
    }

    #[test]
    fn test_as_predicate() {
        let rules = shop_rules();
        let predicate: &dyn FieldPredicate = &rules;
        assert_eq!(predicate.check("1", "weight_kg"), Ok(true));
        assert_eq!(predicate.check("0", "weight_kg"), Ok(false));
    }
}
