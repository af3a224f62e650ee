//! The shared constraint vocabulary.
//!
//! A [`Constraints`] set is an immutable description attached to a read
//! request. It is evaluated only against the value returned at read time,
//! never cached, and always in the same clause order: length/arity, then
//! numeric bounds, then custom predicates. The first violation aborts the
//! read with an [`AbandonExtraction::Constraint`] carrying the offending
//! value and the expected condition.

use std::fmt;
use std::sync::Arc;

use crate::error::{AbandonExtraction, Result};
use crate::types::value::Value;

/// Per-element validator: `None` means the element passes, `Some(reason)`
/// is a human-readable rejection embedded in the diagnostic.
pub type ElementValidator = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// One clause of the closed constraint vocabulary.
#[derive(Clone)]
pub enum Constraint {
    /// Inclusive numeric range, applied to the value or to every element.
    Range {
        /// Lower bound, inclusive.
        min: f64,
        /// Upper bound, inclusive.
        max: f64,
    },
    /// Exact sequence length (or string character count).
    ExactLength(usize),
    /// Minimum sequence length (or string character count).
    MinLength(usize),
    /// Custom per-element validator.
    ElementPredicate(ElementValidator),
    /// Whether null content is permitted. Defaults to forbidden.
    NullableContent(bool),
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Range { min, max } => write!(f, "Range {{ min: {min}, max: {max} }}"),
            Constraint::ExactLength(n) => write!(f, "ExactLength({n})"),
            Constraint::MinLength(n) => write!(f, "MinLength({n})"),
            Constraint::ElementPredicate(_) => write!(f, "ElementPredicate(..)"),
            Constraint::NullableContent(allowed) => write!(f, "NullableContent({allowed})"),
        }
    }
}

/// An immutable set of constraints for one read request.
#[derive(Clone, Debug, Default)]
pub struct Constraints {
    clauses: Vec<Constraint>,
}

impl Constraints {
    /// Create an empty constraint set (every value passes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the value (or each element) to fall in `min..=max`.
    pub fn range(mut self, min: impl Into<f64>, max: impl Into<f64>) -> Self {
        self.clauses.push(Constraint::Range {
            min: min.into(),
            max: max.into(),
        });
        self
    }

    /// Require an exact sequence length.
    pub fn exact_length(mut self, n: usize) -> Self {
        self.clauses.push(Constraint::ExactLength(n));
        self
    }

    /// Require a minimum sequence length.
    pub fn min_length(mut self, n: usize) -> Self {
        self.clauses.push(Constraint::MinLength(n));
        self
    }

    /// Attach a custom per-element validator.
    pub fn element<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.clauses
            .push(Constraint::ElementPredicate(Arc::new(validator)));
        self
    }

    /// Permit (or forbid) null content. Forbidden when the clause is absent.
    pub fn nullable(mut self, allowed: bool) -> Self {
        self.clauses.push(Constraint::NullableContent(allowed));
        self
    }

    /// Whether the set contains no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of clauses in the set.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Evaluate every clause against a freshly-read value.
    ///
    /// Order is fixed regardless of builder order: null tolerance and
    /// length/arity first, numeric bounds second, custom predicates last.
    pub(crate) fn check(&self, member: &str, value: &Value) -> Result<()> {
        let nulls_allowed = self
            .clauses
            .iter()
            .rev()
            .find_map(|c| match c {
                Constraint::NullableContent(allowed) => Some(*allowed),
                _ => None,
            })
            .unwrap_or(false);

        if value.is_null() {
            if nulls_allowed {
                // Nothing further to measure on a permitted null.
                return Ok(());
            }
            return Err(violation(member, "value is null but null content is not permitted"));
        }
        if let Value::Seq(items) = value {
            if !nulls_allowed {
                if let Some(i) = items.iter().position(Value::is_null) {
                    return Err(violation(
                        member,
                        format!("element {i} of {value} is null but null content is not permitted"),
                    ));
                }
            }
        }

        for clause in &self.clauses {
            match clause {
                Constraint::ExactLength(n) => {
                    let len = measured_length(member, value)?;
                    if len != *n {
                        return Err(violation(
                            member,
                            format!("expected length {n}, observed length {len} in {value}"),
                        ));
                    }
                }
                Constraint::MinLength(n) => {
                    let len = measured_length(member, value)?;
                    if len < *n {
                        return Err(violation(
                            member,
                            format!("expected length of at least {n}, observed length {len} in {value}"),
                        ));
                    }
                }
                _ => {}
            }
        }

        for clause in &self.clauses {
            if let Constraint::Range { min, max } = clause {
                check_range(member, value, *min, *max)?;
            }
        }

        for clause in &self.clauses {
            if let Constraint::ElementPredicate(validator) = clause {
                check_elements(member, value, validator)?;
            }
        }

        Ok(())
    }
}

fn violation(member: &str, detail: impl Into<String>) -> AbandonExtraction {
    AbandonExtraction::Constraint {
        member: member.to_owned(),
        detail: detail.into(),
    }
}

fn measured_length(member: &str, value: &Value) -> Result<usize> {
    value.length().ok_or_else(|| {
        violation(
            member,
            format!("a length constraint applies but {value} has no length"),
        )
    })
}

fn check_range(member: &str, value: &Value, min: f64, max: f64) -> Result<()> {
    let check_one = |v: &Value, position: Option<usize>| -> Result<()> {
        let n = v.as_f64().ok_or_else(|| match position {
            Some(i) => violation(
                member,
                format!("element {i} ({v}) is not numeric but a range constraint applies"),
            ),
            None => violation(
                member,
                format!("{v} is not numeric but a range constraint applies"),
            ),
        })?;
        if n < min || n > max {
            return Err(match position {
                Some(i) => violation(
                    member,
                    format!("expected {min}\u{2013}{max}, observed {n} at element {i}"),
                ),
                None => violation(member, format!("expected {min}\u{2013}{max}, observed {n}")),
            });
        }
        Ok(())
    };

    match value {
        Value::Seq(items) => {
            for (i, item) in items.iter().enumerate() {
                if item.is_null() {
                    // Already vetted by the null-content pass.
                    continue;
                }
                check_one(item, Some(i))?;
            }
            Ok(())
        }
        other => check_one(other, None),
    }
}

fn check_elements(member: &str, value: &Value, validator: &ElementValidator) -> Result<()> {
    match value {
        Value::Seq(items) => {
            for (i, item) in items.iter().enumerate() {
                if let Some(reason) = validator(item) {
                    return Err(violation(member, format!("element {i} ({item}): {reason}")));
                }
            }
            Ok(())
        }
        other => match validator(other) {
            Some(reason) => Err(violation(member, format!("{other}: {reason}"))),
            None => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn check(constraints: &Constraints, value: &Value) -> Result<()> {
        constraints.check("member", value)
    }

    #[test]
    fn empty_set_accepts_everything_but_null() {
        let c = Constraints::new();
        assert!(check(&c, &Value::Int(5)).is_ok());
        assert!(check(&c, &Value::from("anything")).is_ok());
        assert!(check(&c, &Value::Null).is_err());
    }

    #[test]
    fn range_rejects_below_min() {
        let c = Constraints::new().range(0, 6);
        let err = check(&c, &Value::Int(-1)).unwrap_err();
        assert!(err.to_string().contains("observed -1"));
    }

    #[test]
    fn range_rejects_above_max() {
        let c = Constraints::new().range(0, 6);
        assert!(check(&c, &Value::Int(7)).is_err());
        assert!(check(&c, &Value::Int(6)).is_ok());
        assert!(check(&c, &Value::Int(0)).is_ok());
    }

    #[test]
    fn range_applies_per_element() {
        let c = Constraints::new().range(0, 6);
        assert!(check(&c, &Value::from(vec![0i64, 3, 6])).is_ok());
        let err = check(&c, &Value::from(vec![0i64, 9])).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn exact_length_rejects_wrong_length() {
        let c = Constraints::new().exact_length(3);
        assert!(check(&c, &Value::from(vec![1i64, 2, 3])).is_ok());
        assert!(check(&c, &Value::from(vec![1i64, 2])).is_err());
        // Strings measure in characters.
        assert!(check(&c, &Value::from("abc")).is_ok());
        assert!(check(&c, &Value::from("abcd")).is_err());
    }

    #[test]
    fn min_length_rejects_short_sequences() {
        let c = Constraints::new().min_length(2);
        assert!(check(&c, &Value::from(vec![1i64, 2])).is_ok());
        assert!(check(&c, &Value::from(vec![1i64])).is_err());
    }

    #[test]
    fn element_predicate_reports_reason_and_index() {
        let c = Constraints::new().element(|v| match v {
            Value::Int(n) if n % 2 == 0 => None,
            other => Some(format!("{other} is not even")),
        });
        assert!(check(&c, &Value::from(vec![2i64, 4])).is_ok());
        let err = check(&c, &Value::from(vec![2i64, 3])).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("element 1"));
        assert!(rendered.contains("is not even"));
    }

    #[test]
    fn null_content_forbidden_by_default() {
        let c = Constraints::new().exact_length(2);
        let err = check(&c, &Value::Seq(vec![Value::Int(1), Value::Null])).unwrap_err();
        assert!(err.to_string().contains("null content"));
    }

    #[test]
    fn nullable_permits_null_value_and_elements() {
        let c = Constraints::new().nullable(true);
        assert!(check(&c, &Value::Null).is_ok());
        let c = Constraints::new().exact_length(2).nullable(true);
        assert!(check(&c, &Value::Seq(vec![Value::Int(1), Value::Null])).is_ok());
    }

    #[test]
    fn length_is_checked_before_bounds() {
        // Violates both clauses; the length diagnostic must win.
        let c = Constraints::new().range(0, 1).exact_length(3);
        let err = check(&c, &Value::from(vec![9i64])).unwrap_err();
        assert!(err.to_string().contains("expected length 3"));
    }

    #[test]
    fn bounds_are_checked_before_predicates() {
        let c = Constraints::new()
            .element(|_| Some("predicate ran".into()))
            .range(0, 1);
        let err = check(&c, &Value::Int(9)).unwrap_err();
        assert!(err.to_string().contains("expected 0\u{2013}1"));
    }

    proptest! {
        #[test]
        fn values_inside_range_always_pass(min in -1000i64..0, max in 0i64..1000, v in -1000i64..1000) {
            let c = Constraints::new().range(min as f64, max as f64);
            let outcome = c.check("member", &Value::Int(v));
            prop_assert_eq!(outcome.is_ok(), v >= min && v <= max);
        }

        #[test]
        fn exact_length_matches_iff_equal(n in 0usize..8, len in 0usize..8) {
            let c = Constraints::new().exact_length(n);
            let value = Value::Seq(vec![Value::Int(1); len]);
            prop_assert_eq!(c.check("member", &value).is_ok(), len == n);
        }
    }
}
