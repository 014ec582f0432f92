//! Integer intervals built incrementally from literal and expression bounds.
//!
//! A `Range` is all integers in `[min, max]` inclusive. `at_least`/`at_most`
//! calls AND additional constraints onto the existing bounds rather than
//! overwriting them: the effective minimum is the largest of every lower
//! bound supplied so far (literal or expression), and the effective maximum
//! is the smallest of every upper bound supplied. A range with `min > max` is
//! empty.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::expression::Expression;

/// The two extremes of a non-empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtremeValues {
    pub min: i64,
    pub max: i64,
}

/// An integer interval, built up from literal and expression bounds.
///
/// A malformed expression passed to the string-taking `at_least`/`at_most`
/// is not reported immediately: it is recorded and surfaced the first time
/// `extremes()` or `needed_variables()` is called, matching the upstream
/// behavior of lazily storing `parameter_status_` rather than failing at
/// construction time.
#[derive(Debug, Clone)]
pub struct Range {
    min: i64,
    max: i64,
    parameter_status: std::result::Result<(), String>,
    min_exprs: Vec<Expression>,
    max_exprs: Vec<Expression>,
}

impl Default for Range {
    /// A range covering every 64-bit signed integer.
    fn default() -> Self {
        Range {
            min: i64::MIN,
            max: i64::MAX,
            parameter_status: Ok(()),
            min_exprs: Vec::new(),
            max_exprs: Vec::new(),
        }
    }
}

impl Range {
    /// A range covering `[minimum, maximum]`. Empty if `minimum > maximum`.
    pub fn new(minimum: i64, maximum: i64) -> Self {
        Range { min: minimum, max: maximum, ..Default::default() }
    }

    /// ANDs in the constraint "this range is at least `minimum`".
    pub fn at_least(&mut self, minimum: i64) {
        self.min = self.min.max(minimum);
    }

    /// ANDs in the constraint "this range is at least `integer_expression`".
    /// A parse failure here is stored and surfaced lazily by `extremes()` /
    /// `needed_variables()`, not returned here.
    pub fn at_least_expr(&mut self, integer_expression: impl AsRef<str>) {
        self.push_bound_expr(integer_expression, true);
    }

    /// ANDs in the constraint "this range is at most `maximum`".
    pub fn at_most(&mut self, maximum: i64) {
        self.max = self.max.min(maximum);
    }

    /// ANDs in the constraint "this range is at most `integer_expression`".
    /// A parse failure here is stored and surfaced lazily by `extremes()` /
    /// `needed_variables()`, not returned here.
    pub fn at_most_expr(&mut self, integer_expression: impl AsRef<str>) {
        self.push_bound_expr(integer_expression, false);
    }

    fn push_bound_expr(&mut self, integer_expression: impl AsRef<str>, lower: bool) {
        match Expression::parse(integer_expression.as_ref()) {
            Ok(expr) => {
                if lower {
                    self.min_exprs.push(expr);
                } else {
                    self.max_exprs.push(expr);
                }
            }
            Err(err) => {
                if self.parameter_status.is_ok() {
                    self.parameter_status = Err(err.to_string());
                }
            }
        }
    }

    /// The two extremes of this range, or `None` if it is empty.
    ///
    /// `variables` provides the values needed to evaluate any expression
    /// bounds; a bound expression referencing a name absent from `variables`
    /// fails with `Error::FailedPrecondition`.
    pub fn extremes(&self, variables: &HashMap<String, i64>) -> Result<Option<ExtremeValues>> {
        if let Err(reason) = &self.parameter_status {
            return Err(Error::invalid_argument(reason.clone()));
        }

        let mut min = self.min;
        for expr in &self.min_exprs {
            min = min.max(expr.evaluate(variables)?);
        }
        let mut max = self.max;
        for expr in &self.max_exprs {
            max = max.min(expr.evaluate(variables)?);
        }

        if min > max {
            Ok(None)
        } else {
            Ok(Some(ExtremeValues { min, max }))
        }
    }

    /// The set of variable names needed to evaluate `extremes()`.
    pub fn needed_variables(&self) -> Result<HashSet<String>> {
        if let Err(reason) = &self.parameter_status {
            return Err(Error::invalid_argument(reason.clone()));
        }
        let mut out = HashSet::new();
        for expr in self.min_exprs.iter().chain(self.max_exprs.iter()) {
            out.extend(expr.needed_variables());
        }
        Ok(out)
    }

    /// Intersects `other` into this range: every bound (literal and
    /// expression) from `other` is ANDed onto this one.
    pub fn intersect(&mut self, other: &Range) {
        self.min = self.min.max(other.min);
        self.max = self.max.min(other.max);
        self.min_exprs.extend(other.min_exprs.iter().cloned());
        self.max_exprs.extend(other.max_exprs.iter().cloned());
        if self.parameter_status.is_ok() {
            self.parameter_status = other.parameter_status.clone();
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)?;
        for expr in &self.min_exprs {
            write!(f, " AND >= {expr}")?;
        }
        for expr in &self.max_exprs {
            write!(f, " AND <= {expr}")?;
        }
        Ok(())
    }
}

/// A range containing no elements.
pub fn empty_range() -> Range {
    Range::new(1, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn default_covers_full_i64() {
        let r = Range::default();
        let extremes = r.extremes(&vars(&[])).unwrap().unwrap();
        assert_eq!(extremes, ExtremeValues { min: i64::MIN, max: i64::MAX });
    }

    #[test]
    fn literal_bounds() {
        let r = Range::new(3, 9);
        assert_eq!(r.extremes(&vars(&[])).unwrap().unwrap(), ExtremeValues { min: 3, max: 9 });
    }

    #[test]
    fn inverted_literal_bounds_are_empty() {
        let r = Range::new(9, 3);
        assert_eq!(r.extremes(&vars(&[])).unwrap(), None);
    }

    #[test]
    fn multiple_at_least_calls_and_together() {
        let mut r = Range::default();
        r.at_least(5);
        r.at_least_expr("X + Y");
        r.at_least_expr("W");
        let vals = vars(&[("X", 1), ("Y", 1), ("W", 100)]);
        // max(5, 2, 100) == 100
        assert_eq!(r.extremes(&vals).unwrap().unwrap().min, 100);
    }

    #[test]
    fn multiple_at_most_calls_and_together() {
        let mut r = Range::default();
        r.at_most(50);
        r.at_most_expr("N - 1");
        let vals = vars(&[("N", 10)]);
        // min(50, 9) == 9
        assert_eq!(r.extremes(&vals).unwrap().unwrap().max, 9);
    }

    #[test]
    fn needed_variables_collects_from_both_bound_kinds() {
        let mut r = Range::default();
        r.at_least_expr("A");
        r.at_most_expr("B + C");
        let needed = r.needed_variables().unwrap();
        assert!(needed.contains("A"));
        assert!(needed.contains("B"));
        assert!(needed.contains("C"));
    }

    #[test]
    fn malformed_expression_surfaces_lazily() {
        let mut r = Range::new(0, 10);
        r.at_least_expr("1 +"); // malformed, not reported yet
        assert!(r.extremes(&vars(&[])).is_err());
        assert!(r.needed_variables().is_err());
    }

    #[test]
    fn intersect_combines_literal_and_expression_bounds() {
        let mut a = Range::new(0, 100);
        let mut b = Range::new(10, 50);
        b.at_most_expr("N");
        a.intersect(&b);
        let vals = vars(&[("N", 20)]);
        assert_eq!(a.extremes(&vals).unwrap().unwrap(), ExtremeValues { min: 10, max: 20 });
    }

    #[test]
    fn empty_range_helper_has_no_extremes() {
        assert_eq!(empty_range().extremes(&vars(&[])).unwrap(), None);
    }

    #[test]
    fn missing_variable_in_expression_bound_is_an_error() {
        let mut r = Range::default();
        r.at_least_expr("UNKNOWN");
        assert!(r.extremes(&vars(&[])).is_err());
    }
}
