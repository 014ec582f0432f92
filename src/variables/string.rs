//! The `String` built-in: length + alphabet + distinctness + an optional
//! `SimplePattern`.
//!
//! A pattern, when set, takes over generation and validation entirely (the
//! alphabet still restricts which characters the pattern may draw from).
//! Otherwise both a length and an alphabet are required.

use std::any::Any;
use std::collections::{HashMap, HashSet};

use crate::constraints::{Alphabet, DistinctCharacters, Length, SimplePatternConstraint};
use crate::error::{Error, Result};
use crate::pattern::SimplePattern;
use crate::property::Property;
use crate::universe::Universe;
use crate::values::Value;
use crate::variable::{SubvalueEntry, Variable, VariableBase};
use crate::variables::integer::Integer;

pub trait StringConstraint {
    fn apply(self, target: &mut StringVar);
}

impl StringConstraint for Length {
    fn apply(self, target: &mut StringVar) {
        target.length = Some(match target.length.take() {
            None => Integer::new().with_range(self.into_range()),
            Some(existing) => existing.with_range(self.into_range()),
        });
    }
}

impl StringConstraint for Alphabet {
    fn apply(self, target: &mut StringVar) {
        let mut chars: Vec<char> = self.0.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        target.alphabet = Some(match target.alphabet.take() {
            None => chars,
            Some(existing) => {
                let mut merged: Vec<char> =
                    existing.into_iter().filter(|c| chars.contains(c)).collect();
                merged.sort_unstable();
                merged.dedup();
                merged
            }
        });
    }
}

impl StringConstraint for DistinctCharacters {
    fn apply(self, target: &mut StringVar) {
        target.distinct_characters = true;
    }
}

impl StringConstraint for SimplePatternConstraint {
    fn apply(self, target: &mut StringVar) {
        target.pattern = Some(self.0);
    }
}

#[derive(Clone, Default)]
pub struct StringVar {
    length: Option<Integer>,
    alphabet: Option<Vec<char>>,
    distinct_characters: bool,
    pattern: Option<String>,
    base: VariableBase,
}

impl StringVar {
    pub fn new() -> Self {
        StringVar::default()
    }

    pub fn with(mut self, constraint: impl StringConstraint) -> Self {
        constraint.apply(&mut self);
        self
    }
}

impl Variable for StringVar {
    fn typename(&self) -> &'static str {
        "string"
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
        if let Some(pattern_text) = &self.pattern {
            let pattern = SimplePattern::parse(pattern_text)?;
            let restriction: Option<String> = self.alphabet.as_ref().map(|cs| cs.iter().collect());
            let s = pattern.generate_with_restrictions(restriction.as_deref(), universe.random_mut())?;
            return Ok(Value::Str(s));
        }

        let length_var = self
            .length
            .as_ref()
            .ok_or_else(|| Error::failed_precondition("string has neither a pattern nor a length"))?;
        let alphabet = self
            .alphabet
            .as_ref()
            .ok_or_else(|| Error::failed_precondition("string has neither a pattern nor an alphabet"))?;

        let length = length_var.generate(universe)?.as_int()?;
        if length < 0 {
            return Err(Error::failed_precondition("string length is negative"));
        }
        let length = length as usize;

        if self.distinct_characters {
            if length > alphabet.len() {
                return Err(Error::failed_precondition(
                    "not enough distinct characters in the alphabet for the requested length",
                ));
            }
            let mut pool = alphabet.clone();
            for i in 0..length {
                let remaining = pool.len() - i;
                let pick = universe.random_mut().rand_below(remaining as i64)? as usize;
                pool.swap(i, i + pick);
            }
            Ok(Value::Str(pool.into_iter().take(length).collect()))
        } else {
            let chars = universe.random_mut().random_elements_with_replacement(alphabet, length)?;
            Ok(Value::Str(chars.into_iter().collect()))
        }
    }

    fn is_satisfied_with_impl(&self, value: &Value, universe: &Universe) -> Result<()> {
        let s = value.as_str()?;

        if let Some(length_var) = &self.length {
            length_var.is_satisfied_with(&Value::Int(s.chars().count() as i64), universe)?;
        }
        if let Some(alphabet) = &self.alphabet {
            for c in s.chars() {
                crate::error::check_constraint(
                    alphabet.contains(&c),
                    format!("character '{c}' is not in the allowed alphabet"),
                )?;
            }
        }
        if self.distinct_characters {
            let mut seen = HashSet::new();
            for c in s.chars() {
                crate::error::check_constraint(seen.insert(c), "characters must be distinct")?;
            }
        }
        if let Some(pattern_text) = &self.pattern {
            let pattern = SimplePattern::parse(pattern_text)?;
            crate::error::check_constraint(pattern.matches(s), format!("'{s}' does not match the pattern"))?;
        }
        Ok(())
    }

    fn merge_from_impl(&mut self, other: &dyn Variable) -> Result<()> {
        let other = other
            .as_any()
            .downcast_ref::<StringVar>()
            .ok_or_else(|| Error::internal("merge_from: expected another String"))?;

        self.length = match (self.length.take(), other.length.clone()) {
            (None, x) => x,
            (x, None) => x,
            (Some(mut a), Some(b)) => {
                a.merge_from(&b)?;
                Some(a)
            }
        };
        self.alphabet = match (self.alphabet.take(), other.alphabet.clone()) {
            (None, x) => x,
            (x, None) => x,
            (Some(a), Some(b)) => Some(a.into_iter().filter(|c| b.contains(c)).collect()),
        };
        self.distinct_characters |= other.distinct_characters;
        match (&self.pattern, &other.pattern) {
            (None, Some(p)) => self.pattern = Some(p.clone()),
            (Some(existing), Some(incoming)) if existing != incoming => {
                return Err(Error::unsatisfied("cannot merge two different simple patterns"));
            }
            _ => {}
        }
        Ok(())
    }

    fn read_impl(&self, universe: &mut Universe) -> Result<Value> {
        Ok(Value::Str(universe.io_mut()?.read_token()?))
    }

    fn print_impl(&self, universe: &mut Universe, value: &Value) -> Result<()> {
        universe.io_mut()?.print_token(value.as_str()?)
    }

    fn dependencies_impl(&self) -> Result<HashSet<String>> {
        match &self.length {
            Some(length) => length.dependencies(),
            None => Ok(HashSet::new()),
        }
    }

    fn subvalues_impl(&self, value: &Value) -> Result<HashMap<String, SubvalueEntry>> {
        let s = value.as_str()?;
        let mut out = HashMap::new();
        if let Some(length) = &self.length {
            out.insert(
                "length".to_string(),
                SubvalueEntry {
                    value: Value::Int(s.chars().count() as i64),
                    variable: Box::new(length.clone()),
                },
            );
        }
        Ok(out)
    }

    fn difficult_instances_impl(&self) -> Vec<Value> {
        let Some(length) = &self.length else { return Vec::new() };
        let Some(c) = self.alphabet.as_ref().and_then(|a| a.first()) else { return Vec::new() };
        length
            .difficult_instances()
            .into_iter()
            .filter_map(|v| v.as_int().ok())
            .filter(|n| *n >= 0)
            .map(|n| Value::Str(c.to_string().repeat(n as usize)))
            .collect()
    }

    fn unique_value_impl(&self) -> Result<Option<Value>> {
        if let Some(length) = &self.length {
            if let Some(Value::Int(0)) = length.unique_value()? {
                return Ok(Some(Value::Str(String::new())));
            }
            if let (Some(Value::Int(n)), Some(alphabet)) = (length.unique_value()?, &self.alphabet) {
                if alphabet.len() == 1 && n >= 0 {
                    return Ok(Some(Value::Str(alphabet[0].to_string().repeat(n as usize))));
                }
            }
        }
        Ok(None)
    }

    fn with_known_property_impl(&mut self, property: &Property) -> Result<()> {
        if property.category == "size" {
            if let Some(length) = self.length.as_mut() {
                return length.with_known_property(property);
            }
            if property.enforcement == crate::property::Enforcement::FailIfUnknown {
                return Err(Error::invalid_argument(
                    "string has no length variable to apply a size property to",
                ));
            }
            return Ok(());
        }
        if property.enforcement == crate::property::Enforcement::FailIfUnknown {
            return Err(Error::invalid_argument(format!(
                "string has no handler for property category '{}'",
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

    fn run_generate(variable: &StringVar) -> String {
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[3]);
        let mut config = GenerationConfig::new();
        let mut universe = Universe::new(&variables, &mut values, &mut random, &mut config, None);
        variable.generate(&mut universe).unwrap().as_str().unwrap().to_string()
    }

    #[test]
    fn fixed_length_alphabet_generates_conforming_strings() {
        let variable = StringVar::new()
            .with(Length::exactly(10))
            .with(Alphabet::new("abc"));
        for _ in 0..50 {
            let s = run_generate(&variable);
            assert_eq!(s.chars().count(), 10);
            assert!(s.chars().all(|c| "abc".contains(c)));
        }
    }

    #[test]
    fn distinct_characters_never_repeat() {
        let variable = StringVar::new()
            .with(Length::exactly(5))
            .with(Alphabet::new("abcde"))
            .with(DistinctCharacters);
        let s = run_generate(&variable);
        let mut chars: Vec<char> = s.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        assert_eq!(chars.len(), 5);
    }

    #[test]
    fn pattern_generation_matches_itself() {
        let variable = StringVar::new().with(SimplePatternConstraint::new("[abc]{10,20}"));
        for _ in 0..20 {
            let s = run_generate(&variable);
            assert!(s.len() >= 10 && s.len() <= 20);
            assert!(s.chars().all(|c| "abc".contains(c)));
        }
    }

    #[test]
    fn empty_alphabet_and_zero_length_is_empty_string() {
        let variable = StringVar::new().with(Length::exactly(0)).with(Alphabet::new(""));
        assert_eq!(run_generate(&variable), "");
    }

    #[test]
    fn unique_value_for_singleton_alphabet() {
        let variable = StringVar::new()
            .with(Length::exactly(3))
            .with(Alphabet::new("x"));
        assert_eq!(variable.unique_value().unwrap(), Some(Value::Str("xxx".to_string())));
    }

    #[test]
    fn is_satisfied_with_rejects_pattern_mismatch() {
        let variable = StringVar::new().with(SimplePatternConstraint::new("[abc]{3}"));
        let variables = VariableSet::new();
        let mut values = ValueSet::new();
        let mut random = RandomEngine::new(&[1]);
        let mut config = GenerationConfig::new();
        let universe = Universe::new(&variables, &mut values, &mut random, &mut config, None);
        assert!(variable.is_satisfied_with(&Value::Str("ABC".into()), &universe).is_err());
        assert!(variable.is_satisfied_with(&Value::Str("abc".into()), &universe).is_ok());
    }

    #[test]
    fn merge_intersects_alphabets_and_lengths() {
        let mut a = StringVar::new().with(Alphabet::new("abcdef")).with(Length::between(1, 10));
        let b = StringVar::new().with(Alphabet::new("defgh")).with(Length::between(5, 20));
        a.merge_from(&b).unwrap();
        assert_eq!(a.alphabet, Some(vec!['d', 'e', 'f']));
        let extremes = a.length.as_ref().unwrap().range().extremes(&HashMap::new()).unwrap().unwrap();
        assert_eq!(extremes, crate::range::ExtremeValues { min: 5, max: 10 });
    }
}
