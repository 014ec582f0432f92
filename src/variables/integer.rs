//! The `Integer` built-in: a `Range` plus a `SizeCategory` generation bias.

use std::any::Any;
use std::collections::HashMap;
use std::collections::HashSet;

use crate::constraints::{self, AtLeast, AtMost, Between, CommonSize, Exactly, SizeCategory};
use crate::error::{Error, Result};
use crate::property::Property;
use crate::range::Range;
use crate::universe::Universe;
use crate::values::Value;
use crate::variable::{SubvalueEntry, Variable, VariableBase};

/// Any constraint `Integer::with` accepts.
pub trait IntegerConstraint {
    fn apply(self, target: &mut Integer);
}

impl IntegerConstraint for Exactly<i64> {
    fn apply(self, target: &mut Integer) {
        target.range.at_least(self.0);
        target.range.at_most(self.0);
    }
}

impl IntegerConstraint for Between {
    fn apply(self, target: &mut Integer) {
        target.range.intersect(&self.into_range());
    }
}

impl IntegerConstraint for AtMost {
    fn apply(self, target: &mut Integer) {
        target.range.intersect(&self.into_range());
    }
}

impl IntegerConstraint for AtLeast {
    fn apply(self, target: &mut Integer) {
        target.range.intersect(&self.into_range());
    }
}

impl IntegerConstraint for SizeCategory {
    fn apply(self, target: &mut Integer) {
        target.size = self.0;
    }
}

#[derive(Clone)]
pub struct Integer {
    range: Range,
    size: CommonSize,
    base: VariableBase,
}

impl Default for Integer {
    fn default() -> Self {
        Integer::new()
    }
}

impl Integer {
    pub fn new() -> Self {
        Integer { range: Range::default(), size: CommonSize::Any, base: VariableBase::new() }
    }

    pub fn with(mut self, constraint: impl IntegerConstraint) -> Self {
        constraint.apply(&mut self);
        self
    }

    /// Intersects `range` directly into this integer's bounds. Used by
    /// composite types (`String`, `Array`) to build their internal length
    /// variable from a `Length` constraint's `Range`.
    pub fn with_range(mut self, range: Range) -> Self {
        self.range.intersect(&range);
        self
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    fn extremes(&self, universe_env: &HashMap<String, i64>) -> Result<crate::range::ExtremeValues> {
        self.range
            .extremes(universe_env)?
            .ok_or_else(|| Error::failed_precondition("Valid range is empty"))
    }
}

impl Variable for Integer {
    fn typename(&self) -> &'static str {
        "integer"
    }

    fn base(&self) -> &VariableBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VariableBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Variable> {
        Box::new(self.clone())
    }

    fn generate_impl(&self, universe: &mut Universe) -> Result<Value> {
        let env = universe.values().integer_environment();
        let extremes = self.extremes(&env)?;

        if self.size == CommonSize::Any {
            return Ok(Value::Int(universe.random_mut().rand_int(extremes.min, extremes.max)?));
        }

        let span = extremes.max - extremes.min + 1;
        let sub = constraints::size_range(self.size, span);
        match sub.extremes(&HashMap::new())? {
            Some(se) => {
                let lo = (extremes.min + se.min - 1).clamp(extremes.min, extremes.max);
                let hi = (extremes.min + se.max - 1).clamp(extremes.min, extremes.max);
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (extremes.min, extremes.max) };
                Ok(Value::Int(universe.random_mut().rand_int(lo, hi)?))
            }
            None => Ok(Value::Int(universe.random_mut().rand_int(extremes.min, extremes.max)?)),
        }
    }

    fn is_satisfied_with_impl(&self, value: &Value, universe: &Universe) -> Result<()> {
        let env = universe.values().integer_environment();
        let v = value.as_int()?;
        let extremes = self.extremes(&env)?;
        crate::error::check_constraint(
            v >= extremes.min && v <= extremes.max,
            format!("{v} is not in range [{}, {}]", extremes.min, extremes.max),
        )
    }

    fn merge_from_impl(&mut self, other: &dyn Variable) -> Result<()> {
        let other = other
            .as_any()
            .downcast_ref::<Integer>()
            .ok_or_else(|| Error::internal("merge_from: expected another Integer"))?;
        self.range.intersect(&other.range);
        if other.size != CommonSize::Any {
            self.size = constraints::merge_sizes(self.size, other.size).ok_or_else(|| {
                Error::unsatisfied(format!(
                    "incompatible size categories {:?} and {:?}",
                    self.size, other.size
                ))
            })?;
        }
        Ok(())
    }

    fn read_impl(&self, universe: &mut Universe) -> Result<Value> {
        let token = universe.io_mut()?.read_token()?;
        token
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| Error::failed_precondition(format!("invalid integer token '{token}': {e}")))
    }

    fn print_impl(&self, universe: &mut Universe, value: &Value) -> Result<()> {
        let v = value.as_int()?;
        universe.io_mut()?.print_token(&v.to_string())
    }

    fn dependencies_impl(&self) -> Result<HashSet<String>> {
        self.range.needed_variables()
    }

    fn subvalues_impl(&self, _value: &Value) -> Result<HashMap<String, SubvalueEntry>> {
        Ok(HashMap::new())
    }

    fn difficult_instances_impl(&self) -> Vec<Value> {
        let Ok(Some(extremes)) = self.range.extremes(&HashMap::new()) else {
            return Vec::new();
        };
        let mut candidates: Vec<i64> = vec![0, 1, -1, 2, -2, extremes.min, extremes.max];
        for shift in [7, 8, 15, 16, 31, 32, 62] {
            let p: i64 = 1i64 << shift;
            candidates.extend([p, p - 1, p + 1, -p, -p + 1, -p - 1]);
        }
        let mid = extremes.min + (extremes.max - extremes.min) / 2;
        candidates.push(mid);
        candidates.push((extremes.max as f64).sqrt() as i64);

        let mut out: Vec<i64> = candidates
            .into_iter()
            .filter(|v| *v >= extremes.min && *v <= extremes.max)
            .collect();
        out.sort_unstable();
        out.dedup();
        out.into_iter().map(Value::Int).collect()
    }

    fn unique_value_impl(&self) -> Result<Option<Value>> {
        match self.range.extremes(&HashMap::new()) {
            Ok(Some(e)) if e.min == e.max => Ok(Some(Value::Int(e.min))),
            _ => Ok(None),
        }
    }

    fn with_known_property_impl(&mut self, property: &Property) -> Result<()> {
        if property.category == "size" {
            let size = CommonSize::from_str(&property.descriptor).ok_or_else(|| {
                Error::invalid_argument(format!("unknown size descriptor '{}'", property.descriptor))
            })?;
            self.size = constraints::merge_sizes(self.size, size).ok_or_else(|| {
                Error::unsatisfied(format!(
                    "incompatible size categories {:?} and {size:?}",
                    self.size
                ))
            })?;
            return Ok(());
        }
        if property.enforcement == crate::property::Enforcement::FailIfUnknown {
            return Err(Error::invalid_argument(format!(
                "integer has no handler for property category '{}'",
                property.category
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::config::GenerationConfig;
    use crate::random::RandomEngine;
    use crate::values::ValueSet;
    use crate::variable_set::VariableSet;

    fn universe_for<'a>(
        variables: &'a VariableSet,
        values: &'a mut ValueSet,
        random: &'a mut RandomEngine,
        config: &'a mut GenerationConfig,
    ) -> Universe<'a> {
        Universe::new(variables, values, random, config, None)
    }

    #[test]
    fn between_generates_within_bounds() {
        let variable = Integer::new().with(Between::literal(10, 20));
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let mut universe = universe_for(&variables, &mut values, &mut random, &mut config);
        for _ in 0..200 {
            let v = variable.generate(&mut universe).unwrap().as_int().unwrap();
            assert!((10..=20).contains(&v));
        }
    }

    #[test]
    fn singleton_range_has_unique_value() {
        let variable = Integer::new().with(Between::literal(5, 5));
        assert_eq!(variable.unique_value().unwrap(), Some(Value::Int(5)));
    }

    #[test]
    fn empty_range_fails_generation() {
        let variable = Integer::new().with(Between::literal(10, 1));
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let mut universe = universe_for(&variables, &mut values, &mut random, &mut config);
        let err = variable.generate(&mut universe).unwrap_err();
        assert!(matches!(err, Error::FailedPrecondition(_)));
    }

    #[test]
    fn merge_from_intersects_ranges() {
        let mut a = Integer::new().with(Between::literal(1, 100));
        let b = Integer::new().with(Between::literal(50, 200));
        a.merge_from(&b).unwrap();
        let extremes = a.range.extremes(&HashMap::new()).unwrap().unwrap();
        assert_eq!(extremes.min, 50);
        assert_eq!(extremes.max, 100);
    }

    #[test]
    fn merge_from_wrong_type_is_internal_error() {
        let mut a = Integer::new();
        let b = crate::variables::string::StringVar::new();
        let err = a.merge_from(&b).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn is_satisfied_with_rejects_out_of_range() {
        let variable = Integer::new().with(Between::literal(1, 10));
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let universe = universe_for(&variables, &mut values, &mut random, &mut config);
        assert!(variable.is_satisfied_with(&Value::Int(11), &universe).is_err());
        assert!(variable.is_satisfied_with(&Value::Int(5), &universe).is_ok());
    }

    #[test]
    fn size_category_biases_toward_smaller_values() {
        let variable = Integer::new()
            .with(Between::literal(1, 1_000_000))
            .with(SizeCategory::small());
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[2]);
        let mut config = GenerationConfig::new();
        let mut universe = universe_for(&variables, &mut values, &mut random, &mut config);
        for _ in 0..100 {
            let v = variable.generate(&mut universe).unwrap().as_int().unwrap();
            assert!(v <= 300, "expected a small value, got {v}");
        }
    }
}
