//! A named map of owned variable definitions.
//!
//! `VariableSet` owns every `Box<dyn Variable>`; a `Universe` only ever
//! borrows from it. Unlike `ValueSet`, it is mutated exclusively before /
//! between generation runs (late-added difficult instances aside) — once a
//! `GenerationBootstrap` run starts, the `Universe` holds it behind a
//! shared reference.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::variable::Variable;

#[derive(Default)]
pub struct VariableSet {
    variables: HashMap<String, Box<dyn Variable>>,
}

impl VariableSet {
    pub fn new() -> Self {
        VariableSet { variables: HashMap::new() }
    }

    /// Adds a new variable under `name`. Fails if the name is already taken.
    pub fn add(&mut self, name: impl Into<String>, variable: Box<dyn Variable>) -> Result<()> {
        let name = name.into();
        if self.variables.contains_key(&name) {
            return Err(Error::invalid_argument(format!(
                "variable '{name}' already exists in this VariableSet"
            )));
        }
        self.variables.insert(name, variable);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn Variable> {
        self.variables
            .get(name)
            .map(|v| v.as_ref())
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Box<dyn Variable>> {
        self.variables
            .get_mut(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Builds `name -> dependencies` for every variable in this set, used by
    /// `GenerationBootstrap` to build the dependency DAG.
    pub fn dependency_map(&self) -> Result<HashMap<String, std::collections::HashSet<String>>> {
        self.variables
            .iter()
            .map(|(name, var)| Ok((name.clone(), var.dependencies()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::integer::Integer;

    #[test]
    fn rejects_duplicate_names() {
        let mut set = VariableSet::new();
        set.add("n", Box::new(Integer::new())).unwrap();
        let err = set.add("n", Box::new(Integer::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn missing_lookup_is_variable_not_found() {
        let set = VariableSet::new();
        let err = set.get("missing").unwrap_err();
        assert!(matches!(err, Error::VariableNotFound(_)));
    }
}
