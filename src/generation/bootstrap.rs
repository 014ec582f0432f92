//! Topological ordering plus the three-pass assignment driver, ported from
//! `generation_bootstrap.cc`/`.h`.
//!
//! `GenerationBootstrap::generate_all_values` is the only entry point most
//! callers need: given a [`VariableSet`] and a [`ValueSet`] of already-known
//! values, it installs one [`Universe`] and drives every variable to a
//! consistent final assignment.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::generation::config::GenerationConfig;
use crate::io::TokenIo;
use crate::random::RandomEngine;
use crate::universe::Universe;
use crate::values::ValueSet;
use crate::variable_set::VariableSet;

/// Computes a deterministic generation order for `variables` relative to
/// `known_values`: a topological sort of the dependency DAG, tie-broken
/// lexicographically by name so repeated runs over the same inputs always
/// produce the same order (see spec.md §4.7 and §5's ordering guarantee).
///
/// A name a variable depends on that is neither a known value nor a declared
/// variable is a `FailedPrecondition`. A residual cycle (every remaining node
/// still has an unresolved dependency) is an `InvalidArgument`.
pub fn generation_order(variables: &VariableSet, known_values: &ValueSet) -> Result<Vec<String>> {
    let dependencies = variables.dependency_map()?;

    for (name, deps) in &dependencies {
        for dep in deps {
            if dep == name {
                continue;
            }
            if !variables.contains(dep) && !known_values.contains(dep) {
                return Err(Error::failed_precondition(format!(
                    "unknown dependency '{dep}' of variable '{name}'"
                )));
            }
        }
    }

    let mut remaining: HashMap<String, HashSet<String>> = dependencies
        .into_iter()
        .map(|(name, deps)| {
            let unresolved: HashSet<String> = deps
                .into_iter()
                .filter(|d| variables.contains(d) && !known_values.contains(d))
                .collect();
            (name, unresolved)
        })
        .collect();

    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let mut ready: Vec<String> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        if ready.is_empty() {
            return Err(Error::invalid_argument(
                "cycle in the dependency order graph".to_string(),
            ));
        }
        ready.sort();
        for name in ready {
            remaining.remove(&name);
            order.push(name.clone());
            for deps in remaining.values_mut() {
                deps.remove(&name);
            }
        }
    }
    Ok(order)
}

/// Drives a full generation run: topological order, unique-value pass,
/// generation pass, final revalidation pass. All three passes share one
/// `Universe`.
pub struct GenerationBootstrap;

impl GenerationBootstrap {
    /// Generates values for every variable in `variables` not already present
    /// in `values`, mutating `values` in place.
    pub fn generate_all_values(
        variables: &VariableSet,
        values: &mut ValueSet,
        random: &mut RandomEngine,
        config: &mut GenerationConfig,
        io: Option<&mut dyn TokenIo>,
    ) -> Result<()> {
        let order = generation_order(variables, values)?;
        let mut universe = Universe::new(variables, values, random, config, io);

        for name in &order {
            let variable = universe.variables().get(name)?;
            variable.assign_unique_value(name, &mut universe)?;
        }

        for name in &order {
            let variable = universe.variables().get(name)?;
            variable.assign_value(name, &mut universe)?;
        }

        for name in &order {
            let variable = universe.variables().get(name)?;
            variable.value_satisfies_constraints(name, &universe)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Between;
    use crate::variables::integer::Integer;

    fn fresh() -> (RandomEngine, GenerationConfig) {
        (RandomEngine::new(&[1, 2, 3]), GenerationConfig::new())
    }

    #[test]
    fn order_respects_dependencies_and_ties_lexicographically() {
        let mut variables = VariableSet::new();
        variables.add("z", Box::new(Integer::new().with(Between::literal(1, 10)))).unwrap();
        variables.add("a", Box::new(Integer::new().with(Between::literal(1, 10)))).unwrap();
        variables
            .add("b", Box::new(Integer::new().with(Between::min_expr_max_literal("a", 100))))
            .unwrap();
        let known = ValueSet::new();
        let order = generation_order(&variables, &known).unwrap();
        assert_eq!(order, vec!["a".to_string(), "z".to_string(), "b".to_string()]);
    }

    #[test]
    fn unknown_dependency_is_a_failed_precondition() {
        let mut variables = VariableSet::new();
        variables
            .add("x", Box::new(Integer::new().with(Between::min_expr_max_literal("missing", 100))))
            .unwrap();
        let known = ValueSet::new();
        let err = generation_order(&variables, &known).unwrap_err();
        assert!(matches!(err, Error::FailedPrecondition(_)));
    }

    #[test]
    fn cycle_is_an_invalid_argument() {
        let mut variables = VariableSet::new();
        variables
            .add("a", Box::new(Integer::new().with(Between::min_expr_max_literal("b", 100))))
            .unwrap();
        variables
            .add("b", Box::new(Integer::new().with(Between::min_expr_max_literal("a", 100))))
            .unwrap();
        let known = ValueSet::new();
        let err = generation_order(&variables, &known).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn generate_all_values_is_deterministic_for_a_fixed_seed() {
        let mut variables = VariableSet::new();
        variables
            .add("n", Box::new(Integer::new().with(Between::literal(1, 1_000_000_000))))
            .unwrap();
        variables
            .add("a", Box::new(Integer::new().with(Between::min_literal_max_expr(1, "n"))))
            .unwrap();

        let run = || {
            let mut values = ValueSet::new();
            let (mut random, mut config) = fresh();
            GenerationBootstrap::generate_all_values(
                &variables,
                &mut values,
                &mut random,
                &mut config,
                None,
            )
            .unwrap();
            values
        };

        let first = run();
        let second = run();
        assert_eq!(first.get_int("n").unwrap(), second.get_int("n").unwrap());
        assert_eq!(first.get_int("a").unwrap(), second.get_int("a").unwrap());
        let n = first.get_int("n").unwrap().unwrap();
        let a = first.get_int("a").unwrap().unwrap();
        assert!(a >= 1 && a <= n);
    }

    #[test]
    fn idempotent_assignment_preserves_known_values() {
        let mut variables = VariableSet::new();
        variables.add("k", Box::new(Integer::new().with(Between::literal(1, 100)))).unwrap();
        let mut values = ValueSet::new();
        values.set("k", crate::values::Value::Int(42));
        let (mut random, mut config) = fresh();
        GenerationBootstrap::generate_all_values(
            &variables,
            &mut values,
            &mut random,
            &mut config,
            None,
        )
        .unwrap();
        assert_eq!(values.get_int("k").unwrap(), Some(42));
    }
}
