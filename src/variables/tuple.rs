//! The `Tuple` built-in: a fixed-size, heterogeneous sequence of slots.
//!
//! Upstream this is a variadic-template `MTuple<T1, ..., Tk>`; here it is a
//! `Vec<Box<dyn Variable>>` of runtime-determined arity. `Value::Tuple`
//! already stores tuple values as a `Vec<Value>`, so nothing about the
//! observable wire format or value shape changes — only the static arity
//! check upstream gets from the type system becomes a runtime length check
//! in `is_satisfied_with_impl`/`merge_from_impl`.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use crate::constraints::IoSeparator;
use crate::error::{Error, Result};
use crate::io::Whitespace;
use crate::property::Property;
use crate::universe::Universe;
use crate::values::Value;
use crate::variable::{SubvalueEntry, Variable, VariableBase};

pub trait TupleConstraint {
    fn apply(self, target: &mut Tuple);
}

impl TupleConstraint for IoSeparator {
    fn apply(self, target: &mut Tuple) {
        target.separator = self.0;
    }
}

pub struct Tuple {
    slots: Vec<Box<dyn Variable>>,
    separator: Whitespace,
    base: VariableBase,
}

impl Clone for Tuple {
    fn clone(&self) -> Self {
        Tuple {
            slots: self.slots.iter().map(|s| s.clone_box()).collect(),
            separator: self.separator,
            base: self.base.clone(),
        }
    }
}

impl Tuple {
    pub fn new(slots: Vec<Box<dyn Variable>>) -> Self {
        Tuple { slots, separator: Whitespace::Space, base: VariableBase::new() }
    }

    pub fn with(mut self, constraint: impl TupleConstraint) -> Self {
        constraint.apply(&mut self);
        self
    }
}

impl Variable for Tuple {
    fn typename(&self) -> &'static str {
        "tuple"
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
        let mut items = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            items.push(slot.generate(universe)?);
        }
        Ok(Value::Tuple(items))
    }

    fn is_satisfied_with_impl(&self, value: &Value, universe: &Universe) -> Result<()> {
        let items = value.as_tuple()?;
        crate::error::check_constraint(
            items.len() == self.slots.len(),
            format!("expected a {}-tuple, found {}", self.slots.len(), items.len()),
        )?;
        for (i, (slot, item)) in self.slots.iter().zip(items.iter()).enumerate() {
            slot.is_satisfied_with(item, universe)
                .map_err(|e| Error::unsatisfied(format!("slot {i}: {e}")))?;
        }
        Ok(())
    }

    fn merge_from_impl(&mut self, other: &dyn Variable) -> Result<()> {
        let other = other
            .as_any()
            .downcast_ref::<Tuple>()
            .ok_or_else(|| Error::internal("merge_from: expected another Tuple"))?;
        if self.slots.len() != other.slots.len() {
            return Err(Error::internal("merge_from: tuples have different arity"));
        }
        for (mine, theirs) in self.slots.iter_mut().zip(other.slots.iter()) {
            mine.merge_from(theirs.as_ref())?;
        }
        if self.separator != other.separator {
            return Err(Error::unsatisfied("cannot merge tuples with conflicting separators"));
        }
        Ok(())
    }

    fn read_impl(&self, universe: &mut Universe) -> Result<Value> {
        let mut items = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                universe.io_mut()?.read_whitespace(self.separator)?;
            }
            items.push(slot.read(universe)?);
        }
        Ok(Value::Tuple(items))
    }

    fn print_impl(&self, universe: &mut Universe, value: &Value) -> Result<()> {
        let items = value.as_tuple()?.to_vec();
        for (i, (slot, item)) in self.slots.iter().zip(items.iter()).enumerate() {
            if i > 0 {
                universe.io_mut()?.print_whitespace(self.separator)?;
            }
            slot.print(universe, item)?;
        }
        Ok(())
    }

    fn dependencies_impl(&self) -> Result<HashSet<String>> {
        let mut deps = HashSet::new();
        for slot in &self.slots {
            deps.extend(slot.dependencies()?);
        }
        Ok(deps)
    }

    fn subvalues_impl(&self, value: &Value) -> Result<HashMap<String, SubvalueEntry>> {
        let items = value.as_tuple()?;
        let mut out = HashMap::new();
        for (i, (slot, item)) in self.slots.iter().zip(items.iter()).enumerate() {
            out.insert(i.to_string(), SubvalueEntry { value: item.clone(), variable: slot.clone_box() });
        }
        Ok(out)
    }

    fn difficult_instances_impl(&self) -> Vec<Value> {
        Vec::new()
    }

    fn unique_value_impl(&self) -> Result<Option<Value>> {
        let mut items = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            match slot.unique_value()? {
                Some(v) => items.push(v),
                None => return Ok(None),
            }
        }
        Ok(Some(Value::Tuple(items)))
    }

    fn with_known_property_impl(&mut self, property: &Property) -> Result<()> {
        for slot in &mut self.slots {
            slot.with_known_property(property)?;
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
    fn is_satisfied_with_reports_first_offending_slot() {
        let tuple = Tuple::new(vec![
            Box::new(Integer::new().with(Between::literal(100, 111))),
            Box::new(Integer::new().with(Between::literal(200, 222))),
        ]);
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let uni = universe(&variables, &mut values, &mut random, &mut config);

        let ok = Value::Tuple(vec![Value::Int(105), Value::Int(205)]);
        assert!(tuple.is_satisfied_with(&ok, &uni).is_ok());

        let bad = Value::Tuple(vec![Value::Int(0), Value::Int(205)]);
        let err = tuple.is_satisfied_with(&bad, &uni).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("slot 0"));
    }

    #[test]
    fn generate_is_pointwise_over_slots() {
        let tuple = Tuple::new(vec![
            Box::new(Integer::new().with(Between::literal(1, 1))),
            Box::new(Integer::new().with(Between::literal(2, 2))),
        ]);
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let mut uni = universe(&variables, &mut values, &mut random, &mut config);
        let value = tuple.generate(&mut uni).unwrap();
        assert_eq!(value, Value::Tuple(vec![Value::Int(1), Value::Int(2)]));
    }
}
