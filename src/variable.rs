//! The `Variable` trait: the open-set polymorphic contract every built-in
//! (and any user-defined) variable type implements.
//!
//! A variable's constraint state (ranges, alphabets, patterns, ...) is fixed
//! once construction/`merge_from` finishes; every generation-time method
//! therefore takes `&self`, not `&mut self`. This is what lets `Universe`
//! hold its `VariableSet` behind a plain shared reference — recursive
//! dependency resolution only ever needs mutable access to the `ValueSet`,
//! `RandomEngine` and `GenerationConfig`, all of which live on `Universe`
//! itself, not on the variable being resolved.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::property::Property;
pub use crate::subvalues::{SubvalueEntry, Subvalues};
use crate::universe::Universe;
use crate::values::Value;

/// A user-registered predicate constraint: `predicate(value, dependency_values)`.
#[derive(Clone)]
pub struct CustomConstraint {
    pub name: String,
    pub dependencies: Vec<String>,
    pub predicate: Rc<dyn Fn(&Value, &HashMap<String, Value>) -> bool>,
}

impl fmt::Debug for CustomConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConstraint")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Shared state every built-in variable embeds: the allow-list, custom
/// predicates, and registered properties. Lifted out of the individual
/// built-ins because the merge/validate/dependency logic around it is
/// identical across all of them.
#[derive(Default, Clone)]
pub struct VariableBase {
    is_one_of: Option<Vec<Value>>,
    custom_constraints: Vec<CustomConstraint>,
}

impl VariableBase {
    pub fn new() -> Self {
        VariableBase::default()
    }

    /// Intersects the allow-list with `values`: after repeated calls, only
    /// values present in *every* call's list remain. The first call simply
    /// installs its list (deduplicated).
    pub fn is_one_of(&mut self, values: Vec<Value>) {
        let mut deduped = Vec::new();
        for v in values {
            if !deduped.contains(&v) {
                deduped.push(v);
            }
        }
        self.is_one_of = Some(match self.is_one_of.take() {
            None => deduped,
            Some(existing) => existing.into_iter().filter(|v| deduped.contains(v)).collect(),
        });
    }

    pub fn allow_list(&self) -> Option<&[Value]> {
        self.is_one_of.as_deref()
    }

    pub fn with_custom_constraint(
        &mut self,
        name: impl Into<String>,
        dependencies: Vec<String>,
        predicate: Rc<dyn Fn(&Value, &HashMap<String, Value>) -> bool>,
    ) {
        self.custom_constraints.push(CustomConstraint {
            name: name.into(),
            dependencies,
            predicate,
        });
    }

    pub fn custom_constraints(&self) -> &[CustomConstraint] {
        &self.custom_constraints
    }

    pub fn merge_from(&mut self, other: &VariableBase) {
        if let Some(values) = &other.is_one_of {
            self.is_one_of(values.clone());
        }
        self.custom_constraints.extend(other.custom_constraints.iter().cloned());
    }

    fn dependencies(&self) -> HashSet<String> {
        self.custom_constraints.iter().flat_map(|c| c.dependencies.iter().cloned()).collect()
    }

    /// Evaluates the allow-list and every custom constraint against `value`,
    /// fetching each constraint's dependency values via `universe`.
    fn check(&self, value: &Value, universe: &Universe) -> Result<()> {
        if let Some(allowed) = &self.is_one_of {
            if !allowed.contains(value) {
                return Err(Error::unsatisfied(format!(
                    "value {value:?} is not one of the allowed values"
                )));
            }
        }
        for constraint in &self.custom_constraints {
            let mut deps = HashMap::new();
            for dep in &constraint.dependencies {
                let dep_value = universe
                    .get_value(dep)
                    .map_err(Error::into_unsatisfied_if_not_found)?;
                deps.insert(dep.clone(), dep_value);
            }
            if !(constraint.predicate)(value, &deps) {
                return Err(Error::unsatisfied(format!(
                    "custom constraint '{}' rejected the value",
                    constraint.name
                )));
            }
        }
        Ok(())
    }
}

/// The polymorphic contract every variable type implements.
///
/// Required `_impl` methods carry each type's own behavior; the provided
/// (default) methods implement the shared algorithm layered on top
/// (allow-list/custom-constraint checking, the generate/retry loop, the
/// `NotFound -> UnsatisfiedConstraint` rewrite at the validation boundary).
/// This mirrors the split the upstream `MVariable<V, G>` CRTP base makes
/// between its own methods and each subclass's `*Impl` overrides.
pub trait Variable {
    /// A stable string identifier used in error messages (e.g. `"integer"`).
    fn typename(&self) -> &'static str;

    fn base(&self) -> &VariableBase;
    fn base_mut(&mut self) -> &mut VariableBase;

    fn as_any(&self) -> &dyn Any;

    /// Deep-clones this variable into a fresh box. Needed so composite
    /// types (Array, Tuple) can hand out a boxed, independently-owned copy
    /// of an element/slot variable, e.g. for `subvalues`.
    fn clone_box(&self) -> Box<dyn Variable>;

    fn generate_impl(&self, universe: &mut Universe) -> Result<Value>;

    fn is_satisfied_with_impl(&self, value: &Value, universe: &Universe) -> Result<()>;

    /// Pointwise-intersects `other`'s constraints into `self`. `other` is
    /// guaranteed by the caller to be the same concrete type; implementors
    /// downcast via `other.as_any()` and return `Error::Internal` if that
    /// invariant was violated.
    fn merge_from_impl(&mut self, other: &dyn Variable) -> Result<()>;

    fn read_impl(&self, universe: &mut Universe) -> Result<Value>;

    fn print_impl(&self, universe: &mut Universe, value: &Value) -> Result<()>;

    fn dependencies_impl(&self) -> Result<HashSet<String>>;

    fn subvalues_impl(&self, value: &Value) -> Result<Subvalues>;

    fn difficult_instances_impl(&self) -> Vec<Value>;

    fn unique_value_impl(&self) -> Result<Option<Value>>;

    /// Applies a weakly-typed `{category, descriptor}` tag. Implementors
    /// match on `property.category`; an unrecognized category is an error
    /// unless the property was built with `.ignore_if_unknown()`.
    fn with_known_property_impl(&mut self, property: &Property) -> Result<()>;

    // ---- shared algorithm, not overridden by built-ins ----

    fn merge_from(&mut self, other: &dyn Variable) -> Result<()> {
        self.merge_from_impl(other)?;
        let other_base = other.base().clone();
        self.base_mut().merge_from(&other_base);
        Ok(())
    }

    fn dependencies(&self) -> Result<HashSet<String>> {
        let mut deps = self.dependencies_impl()?;
        deps.extend(self.base().dependencies());
        Ok(deps)
    }

    fn is_satisfied_with(&self, value: &Value, universe: &Universe) -> Result<()> {
        self.base().check(value, universe)?;
        self.is_satisfied_with_impl(value, universe).map_err(Error::into_unsatisfied_if_not_found)
    }

    fn read(&self, universe: &mut Universe) -> Result<Value> {
        self.read_impl(universe)
    }

    fn print(&self, universe: &mut Universe, value: &Value) -> Result<()> {
        self.print_impl(universe, value)
    }

    fn subvalues(&self, value: &Value) -> Result<Subvalues> {
        self.subvalues_impl(value)
    }

    fn difficult_instances(&self) -> Vec<Value> {
        self.difficult_instances_impl()
    }

    fn unique_value(&self) -> Result<Option<Value>> {
        self.unique_value_impl()
    }

    fn with_known_property(&mut self, property: &Property) -> Result<()> {
        self.with_known_property_impl(property)
    }

    /// Produces one value, honoring the allow-list if present (sampled
    /// uniformly from it instead of calling `generate_impl`).
    fn generate(&self, universe: &mut Universe) -> Result<Value> {
        if let Some(allowed) = self.base().allow_list() {
            if allowed.is_empty() {
                return Err(Error::failed_precondition(
                    "is_one_of allow-list is empty: no value can satisfy this variable",
                ));
            }
            let idx = universe.random_mut().rand_below(allowed.len() as i64)? as usize;
            return Ok(allowed[idx].clone());
        }
        self.generate_impl(universe)
    }

    /// The full retry-supervised assignment algorithm from spec §4.6: marks
    /// the variable as actively generating, repeatedly generates+validates,
    /// and on failure consults `GenerationConfig` for retry/abort, erasing
    /// the listed sibling values before trying again.
    fn assign_value(&self, name: &str, universe: &mut Universe) -> Result<()> {
        if universe.values().contains(name) {
            return Ok(());
        }
        universe.config_mut().mark_start_generation(name)?;
        loop {
            let attempt = self
                .generate(universe)
                .and_then(|value| {
                    self.is_satisfied_with(&value, universe)?;
                    Ok(value)
                });

            match attempt {
                Ok(value) => {
                    universe.values_mut().set(name, value);
                    universe.config_mut().mark_successful_generation(name)?;
                    log::debug!("generated a value for '{name}'");
                    return Ok(());
                }
                Err(status) => {
                    log::warn!("generation attempt for '{name}' failed: {status}");
                    let outcome = universe.config_mut().add_generation_failure(name, &status)?;
                    for victim in &outcome.variable_names_to_delete {
                        universe.values_mut().erase(victim);
                    }
                    if outcome.policy == crate::generation::config::RetryPolicy::Abort {
                        universe.config_mut().mark_abandoned_generation(name)?;
                        return Err(status);
                    }
                }
            }
        }
    }

    /// Installs `unique_value()` into the `ValueSet` if one exists and the
    /// name has no value yet. No-op otherwise.
    fn assign_unique_value(&self, name: &str, universe: &mut Universe) -> Result<()> {
        if universe.values().contains(name) {
            return Ok(());
        }
        if let Some(value) = self.unique_value()? {
            universe.values_mut().set(name, value);
        }
        Ok(())
    }

    /// Re-checks a value already present in the `ValueSet` against this
    /// variable's constraints, used by `GenerationBootstrap`'s final pass.
    fn value_satisfies_constraints(&self, name: &str, universe: &Universe) -> Result<()> {
        match universe.values().get(name) {
            None => Ok(()),
            Some(value) => self.is_satisfied_with(value, universe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_intersects_across_calls() {
        let mut base = VariableBase::new();
        base.is_one_of(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        base.is_one_of(vec![Value::Int(2), Value::Int(3), Value::Int(4)]);
        assert_eq!(base.allow_list(), Some(&[Value::Int(2), Value::Int(3)][..]));
    }

    #[test]
    fn allow_list_deduplicates() {
        let mut base = VariableBase::new();
        base.is_one_of(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        assert_eq!(base.allow_list(), Some(&[Value::Int(1), Value::Int(2)][..]));
    }
}
