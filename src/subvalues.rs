//! Named, typed projections of a value — e.g. an array's `"length"`, or a
//! tuple's `"0"`..`"k-1"` slots — mirroring `src/librarian/subvalues.h`.

use std::collections::HashMap;

use crate::values::Value;
use crate::variable::Variable;

/// One projection: the projected value, paired with the variable that
/// describes it so a dotted path (`Universe::get_subvalue`) can keep
/// walking through it.
pub struct SubvalueEntry {
    pub value: Value,
    pub variable: Box<dyn Variable>,
}

/// The table a `Variable::subvalues` call returns, keyed by projection name.
pub type Subvalues = HashMap<String, SubvalueEntry>;
