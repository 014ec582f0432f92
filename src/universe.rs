//! The per-run context threading variables, values, randomness, retry
//! bookkeeping and I/O through generation and validation.
//!
//! `Universe` borrows its `VariableSet` *immutably* (`&'a VariableSet`, a
//! plain `Copy` reference) rather than mutably. Because every
//! generation-time `Variable` method takes `&self` (see `variable.rs`),
//! this is enough: recursive dependency resolution only ever needs mutable
//! access to the `ValueSet`, `RandomEngine` and `GenerationConfig`, which
//! live as their own fields on `Universe` and are reborrowed independently
//! of the `variables` field. Reading `self.variables` out of `&self` (or
//! `&mut self`) yields a reference whose lifetime is `'a`, not tied to the
//! borrow of `self` — so a variable fetched this way can be held across a
//! subsequent `&mut self` call without upsetting the borrow checker.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::generation::config::GenerationConfig;
use crate::io::TokenIo;
use crate::random::RandomEngine;
use crate::values::{Value, ValueSet};
use crate::variable_set::VariableSet;

pub struct Universe<'a> {
    variables: &'a VariableSet,
    values: &'a mut ValueSet,
    random: &'a mut RandomEngine,
    config: &'a mut GenerationConfig,
    io: Option<&'a mut dyn TokenIo>,
    resolving: HashSet<String>,
}

impl<'a> Universe<'a> {
    pub fn new(
        variables: &'a VariableSet,
        values: &'a mut ValueSet,
        random: &'a mut RandomEngine,
        config: &'a mut GenerationConfig,
        io: Option<&'a mut dyn TokenIo>,
    ) -> Self {
        Universe { variables, values, random, config, io, resolving: HashSet::new() }
    }

    /// Returns the borrowed `VariableSet`, with its original `'a` lifetime
    /// rather than one tied to `&self` — see the module doc comment.
    pub fn variables(&self) -> &'a VariableSet {
        self.variables
    }

    pub fn values(&self) -> &ValueSet {
        self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueSet {
        self.values
    }

    pub fn random_mut(&mut self) -> &mut RandomEngine {
        self.random
    }

    pub fn config_mut(&mut self) -> &mut GenerationConfig {
        self.config
    }

    pub fn io_mut(&mut self) -> Result<&mut dyn TokenIo> {
        match &mut self.io {
            Some(io) => Ok(*io),
            None => Err(Error::unimplemented("no I/O collaborator installed on this Universe")),
        }
    }

    /// Fetches the stored value for `name`, type-checked; falls back to the
    /// variable's `unique_value()` if no value is stored. Never generates.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        let variable = self.variables.get(name)?;
        if let Some(value) = variable.unique_value()? {
            return Ok(value);
        }
        Err(Error::ValueNotFound(name.to_string()))
    }

    /// Like `get_value`, but drives generation first if the value is
    /// absent and has no computable unique value.
    pub fn get_or_generate_and_set_value(&mut self, name: &str) -> Result<Value> {
        self.assign_value_to_variable(name)?;
        self.get_value(name)
    }

    /// Ensures `name` has a value in the `ValueSet`, generating it (with
    /// full retry supervision) if necessary. Detects cycles via the
    /// "currently resolving" set, independent of `GenerationConfig`'s own
    /// cycle check (the Universe-level check catches a cycle introduced by
    /// the caller's traversal order, not only by declared dependencies).
    pub fn assign_value_to_variable(&mut self, name: &str) -> Result<()> {
        if self.values.contains(name) {
            return Ok(());
        }
        if self.resolving.contains(name) {
            return Err(Error::failed_precondition(format!(
                "cyclic dependency detected while resolving '{name}'"
            )));
        }
        let variable = self.variables().get(name)?;
        self.resolving.insert(name.to_string());
        let result = variable.assign_value(name, self);
        self.resolving.remove(name);
        result
    }

    /// Removes `name`'s value, if present. Idempotent.
    pub fn erase_value(&mut self, name: &str) {
        self.values.erase(name);
    }

    /// Walks a dotted path `A.b.c`: fetches `A`'s value and subvalue table,
    /// looks up `b` for the next value + variable, and recurses until the
    /// path is exhausted.
    pub fn get_subvalue(&mut self, path: &str) -> Result<Value> {
        let mut segments = path.split('.');
        let root_name = segments.next().ok_or_else(|| {
            Error::invalid_argument("empty subvalue path".to_string())
        })?;

        let mut current_value = self.get_or_generate_and_set_value(root_name)?;
        let mut current_variable = self.variables().get(root_name)?.clone_box();

        for segment in segments {
            let mut subvalues = current_variable.subvalues(&current_value)?;
            let entry = subvalues.remove(segment).ok_or_else(|| {
                Error::ValueNotFound(format!("no subvalue named '{segment}'"))
            })?;
            current_value = entry.value;
            current_variable = entry.variable;
        }

        Ok(current_value)
    }

    pub fn read_value(&mut self, name: &str) -> Result<Value> {
        let variable = self.variables().get(name)?;
        variable.read(self)
    }

    pub fn print_value(&mut self, name: &str, value: &Value) -> Result<()> {
        let variable = self.variables().get(name)?;
        variable.print(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::integer::Integer;
    use crate::constraints::Between;

    #[test]
    fn get_value_falls_back_to_unique_value() {
        let mut variables = VariableSet::new();
        variables.add("k", Box::new(Integer::new().with(Between::literal(7, 7)))).unwrap();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let universe = Universe::new(&variables, &mut values, &mut random, &mut config, None);
        assert_eq!(universe.get_value("k").unwrap().as_int().unwrap(), 7);
    }

    #[test]
    fn assign_value_to_variable_is_idempotent() {
        let mut variables = VariableSet::new();
        variables.add("k", Box::new(Integer::new().with(Between::literal(1, 100)))).unwrap();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let mut universe = Universe::new(&variables, &mut values, &mut random, &mut config, None);
        universe.assign_value_to_variable("k").unwrap();
        let first = universe.get_value("k").unwrap();
        universe.assign_value_to_variable("k").unwrap();
        let second = universe.get_value("k").unwrap();
        assert_eq!(first, second);
    }
}
