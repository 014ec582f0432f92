//! The `Array` built-in: a homogeneous sequence of one element variable.
//!
//! The element type is held as `Box<dyn Variable>` rather than a generic
//! parameter — this crate's `Value::Array(Vec<Value>)` already represents
//! every array uniformly regardless of element type, so there is no
//! monomorphization to preserve and a trait object keeps `Array` itself
//! object-safe-friendly to store inside another `Box<dyn Variable>` (e.g. an
//! array of arrays).

use std::any::Any;
use std::collections::{HashMap, HashSet};

use crate::constraints::{DistinctElements, IoSeparator, Length};
use crate::error::{Error, Result};
use crate::io::Whitespace;
use crate::property::Property;
use crate::universe::Universe;
use crate::values::Value;
use crate::variable::{SubvalueEntry, Variable, VariableBase};
use crate::variables::integer::Integer;

pub trait ArrayConstraint {
    fn apply(self, target: &mut Array);
}

impl ArrayConstraint for Length {
    fn apply(self, target: &mut Array) {
        target.length = Some(match target.length.take() {
            None => Integer::new().with_range(self.into_range()),
            Some(existing) => existing.with_range(self.into_range()),
        });
    }
}

impl ArrayConstraint for DistinctElements {
    fn apply(self, target: &mut Array) {
        target.distinct_elements = true;
    }
}

impl ArrayConstraint for IoSeparator {
    fn apply(self, target: &mut Array) {
        target.separator = self.0;
    }
}

pub struct Array {
    element: Box<dyn Variable>,
    length: Option<Integer>,
    distinct_elements: bool,
    separator: Whitespace,
    base: VariableBase,
}

impl Clone for Array {
    fn clone(&self) -> Self {
        Array {
            element: self.element.clone_box(),
            length: self.length.clone(),
            distinct_elements: self.distinct_elements,
            separator: self.separator,
            base: self.base.clone(),
        }
    }
}

impl Array {
    pub fn new(element: Box<dyn Variable>) -> Self {
        Array {
            element,
            length: None,
            distinct_elements: false,
            separator: Whitespace::Space,
            base: VariableBase::new(),
        }
    }

    pub fn with(mut self, constraint: impl ArrayConstraint) -> Self {
        constraint.apply(&mut self);
        self
    }

    /// `n * H_n + 14n`, the retry budget keeping the failure probability of
    /// distinct-element generation under 1%.
    fn distinct_retry_budget(n: i64) -> i64 {
        if n <= 0 {
            return 0;
        }
        let harmonic: f64 = (1..=n).map(|i| 1.0 / i as f64).sum();
        (n as f64 * harmonic + 14.0 * n as f64).ceil() as i64
    }
}

impl Variable for Array {
    fn typename(&self) -> &'static str {
        "array"
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
        let length_var = self
            .length
            .as_ref()
            .ok_or_else(|| Error::failed_precondition("array has no length"))?;
        let length = length_var.generate(universe)?.as_int()?;
        if length < 0 {
            return Err(Error::failed_precondition("array length is negative"));
        }
        let length = length as usize;

        if !self.distinct_elements {
            let mut items = Vec::with_capacity(length);
            for _ in 0..length {
                items.push(self.element.generate(universe)?);
            }
            return Ok(Value::Array(items));
        }

        let mut items: Vec<Value> = Vec::with_capacity(length);
        let budget = Self::distinct_retry_budget(length as i64);
        let mut attempts_left = budget.max(length as i64);
        while items.len() < length {
            if attempts_left <= 0 {
                return Err(Error::failed_precondition(
                    "exhausted retry budget while generating distinct array elements",
                ));
            }
            attempts_left -= 1;
            let candidate = self.element.generate(universe)?;
            if !items.contains(&candidate) {
                items.push(candidate);
            }
        }
        Ok(Value::Array(items))
    }

    fn is_satisfied_with_impl(&self, value: &Value, universe: &Universe) -> Result<()> {
        let items = value.as_array()?;
        if let Some(length_var) = &self.length {
            length_var.is_satisfied_with(&Value::Int(items.len() as i64), universe)?;
        }
        for item in items {
            self.element.is_satisfied_with(item, universe)?;
        }
        if self.distinct_elements {
            for i in 0..items.len() {
                for j in (i + 1)..items.len() {
                    crate::error::check_constraint(items[i] != items[j], "array elements must be distinct")?;
                }
            }
        }
        Ok(())
    }

    fn merge_from_impl(&mut self, other: &dyn Variable) -> Result<()> {
        let other = other
            .as_any()
            .downcast_ref::<Array>()
            .ok_or_else(|| Error::internal("merge_from: expected another Array"))?;

        self.length = match (self.length.take(), other.length.clone()) {
            (None, x) => x,
            (x, None) => x,
            (Some(mut a), Some(b)) => {
                a.merge_from(&b)?;
                Some(a)
            }
        };
        self.element.merge_from(other.element.as_ref())?;
        self.distinct_elements |= other.distinct_elements;
        if self.separator != other.separator {
            return Err(Error::unsatisfied("cannot merge arrays with conflicting separators"));
        }
        Ok(())
    }

    fn read_impl(&self, universe: &mut Universe) -> Result<Value> {
        let length_var = self
            .length
            .as_ref()
            .ok_or_else(|| Error::failed_precondition("array has no length"))?;
        let length = length_var
            .unique_value()?
            .ok_or_else(|| Error::failed_precondition("array length must be statically resolvable to read a value"))?
            .as_int()?;
        if length < 0 {
            return Err(Error::failed_precondition("array length is negative"));
        }
        let mut items = Vec::with_capacity(length as usize);
        for i in 0..length {
            if i > 0 {
                universe.io_mut()?.read_whitespace(self.separator)?;
            }
            items.push(self.element.read(universe)?);
        }
        Ok(Value::Array(items))
    }

    fn print_impl(&self, universe: &mut Universe, value: &Value) -> Result<()> {
        let items = value.as_array()?.to_vec();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                universe.io_mut()?.print_whitespace(self.separator)?;
            }
            self.element.print(universe, item)?;
        }
        Ok(())
    }

    fn dependencies_impl(&self) -> Result<HashSet<String>> {
        let mut deps = match &self.length {
            Some(length) => length.dependencies()?,
            None => HashSet::new(),
        };
        deps.extend(self.element.dependencies()?);
        Ok(deps)
    }

    fn subvalues_impl(&self, value: &Value) -> Result<HashMap<String, SubvalueEntry>> {
        let items = value.as_array()?;
        let mut out = HashMap::new();
        if let Some(length) = &self.length {
            out.insert(
                "length".to_string(),
                SubvalueEntry { value: Value::Int(items.len() as i64), variable: Box::new(length.clone()) },
            );
        }
        Ok(out)
    }

    fn difficult_instances_impl(&self) -> Vec<Value> {
        let Some(length) = &self.length else { return Vec::new() };
        let element_unique = self.element.unique_value().ok().flatten();
        length
            .difficult_instances()
            .into_iter()
            .filter_map(|v| v.as_int().ok())
            .filter(|n| *n >= 0)
            .filter_map(|n| {
                if n == 0 {
                    Some(Value::Array(Vec::new()))
                } else if self.distinct_elements && n > 1 {
                    None
                } else {
                    element_unique.clone().map(|v| Value::Array(vec![v; n as usize]))
                }
            })
            .collect()
    }

    fn unique_value_impl(&self) -> Result<Option<Value>> {
        let Some(length) = &self.length else { return Ok(None) };
        let Some(Value::Int(n)) = length.unique_value()? else { return Ok(None) };
        if n == 0 {
            return Ok(Some(Value::Array(Vec::new())));
        }
        if self.distinct_elements && n > 1 {
            return Ok(None);
        }
        match self.element.unique_value()? {
            Some(v) => Ok(Some(Value::Array(vec![v; n as usize]))),
            None => Ok(None),
        }
    }

    fn with_known_property_impl(&mut self, property: &Property) -> Result<()> {
        if property.category == "size" {
            if let Some(length) = self.length.as_mut() {
                return length.with_known_property(property);
            }
            if property.enforcement == crate::property::Enforcement::FailIfUnknown {
                return Err(Error::invalid_argument(
                    "array has no length variable to apply a size property to",
                ));
            }
            return Ok(());
        }
        if property.enforcement == crate::property::Enforcement::FailIfUnknown {
            return Err(Error::invalid_argument(format!(
                "array has no handler for property category '{}'",
                property.category
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Between;
    use crate::generation::config::GenerationConfig;
    use crate::random::RandomEngine;
    use crate::values::ValueSet;
    use crate::variable_set::VariableSet;
    use crate::variables::integer::Integer;

    fn universe<'a>(
        variables: &'a VariableSet,
        values: &'a mut ValueSet,
        random: &'a mut RandomEngine,
        config: &'a mut GenerationConfig,
    ) -> Universe<'a> {
        Universe::new(variables, values, random, config, None)
    }

    #[test]
    fn distinct_elements_array_is_a_permutation() {
        let element = Integer::new().with(Between::literal(1, 10));
        let array = Array::new(Box::new(element))
            .with(Length::exactly(10))
            .with(DistinctElements);
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[5]);
        let mut config = GenerationConfig::new();
        let mut uni = universe(&variables, &mut values, &mut random, &mut config);
        let value = array.generate(&mut uni).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 10);
        let mut seen: Vec<i64> = items.iter().map(|v| v.as_int().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn zero_length_is_empty_regardless_of_element_constraints() {
        let element = Integer::new().with(Between::literal(1, 1));
        let array = Array::new(Box::new(element)).with(Length::exactly(0));
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let mut uni = universe(&variables, &mut values, &mut random, &mut config);
        let value = array.generate(&mut uni).unwrap();
        assert!(value.as_array().unwrap().is_empty());
    }

    #[test]
    fn read_requires_statically_resolvable_length() {
        let element = Integer::new();
        let array = Array::new(Box::new(element)).with(Length::between(1, 10));
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let mut uni = universe(&variables, &mut values, &mut random, &mut config);
        assert!(array.read(&mut uni).is_err());
    }
}
