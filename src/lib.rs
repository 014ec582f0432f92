//! Moriarty: a constraint-satisfaction engine for generating and validating
//! programming-contest test data.
//!
//! A caller declares named [`Variable`](variable::Variable)s in a
//! [`VariableSet`](variable_set::VariableSet) — integers, strings, arrays,
//! tuples, or user-defined types — each carrying a constraint set (ranges,
//! alphabets, patterns, custom predicates, inter-variable dependencies).
//! [`GenerationBootstrap`](generation::GenerationBootstrap) topologically
//! orders the resulting dependency DAG and drives a stack-ordered,
//! retry-capable, seeded-pseudo-random search to a consistent value
//! assignment over a [`ValueSet`](values::ValueSet).
//!
//! ```
//! use moriarty::constraints::Between;
//! use moriarty::generation::GenerationBootstrap;
//! use moriarty::generation::config::GenerationConfig;
//! use moriarty::random::RandomEngine;
//! use moriarty::values::ValueSet;
//! use moriarty::variable_set::VariableSet;
//! use moriarty::variables::Integer;
//!
//! let mut variables = VariableSet::new();
//! variables.add("n", Box::new(Integer::new().with(Between::literal(1, 100)))).unwrap();
//! variables
//!     .add("a", Box::new(Integer::new().with(Between::min_literal_max_expr(1, "n"))))
//!     .unwrap();
//!
//! let mut values = ValueSet::new();
//! let mut random = RandomEngine::new(&[42]);
//! let mut config = GenerationConfig::new();
//! GenerationBootstrap::generate_all_values(&variables, &mut values, &mut random, &mut config, None)
//!     .unwrap();
//!
//! let n = values.get_int("n").unwrap().unwrap();
//! let a = values.get_int("a").unwrap().unwrap();
//! assert!(a >= 1 && a <= n);
//! ```

pub mod constraints;
pub mod error;
pub mod expression;
pub mod generation;
pub mod io;
pub mod pattern;
pub mod property;
pub mod random;
pub mod range;
pub mod subvalues;
pub mod universe;
pub mod values;
pub mod variable;
pub mod variable_set;
pub mod variables;

pub use error::{Error, Result};
pub use generation::GenerationBootstrap;
pub use universe::Universe;
pub use values::{Value, ValueSet};
pub use variable::Variable;
pub use variable_set::VariableSet;
