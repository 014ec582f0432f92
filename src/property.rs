//! Weakly-typed tagged constraints ("properties") dispatched to a variable's
//! registered handler by category name.
//!
//! A property is a generation *hint*, not a validation rule: a variable that
//! receives `{category: "size", descriptor: "small"}` should bias its
//! generation towards small values, not reject values that happen to be
//! larger during `is_satisfied_with`.

use std::fmt;

/// How a variable should react to a property whose category it does not
/// recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    /// Surface `Error::InvalidArgument` for an unrecognized category.
    FailIfUnknown,
    /// Silently ignore an unrecognized category.
    IgnoreIfUnknown,
}

/// A `{category, descriptor, enforcement}` tag applied via a variable's
/// `with_known_property` handler map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub category: String,
    pub descriptor: String,
    pub enforcement: Enforcement,
}

impl Property {
    pub fn new(category: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Property {
            category: category.into(),
            descriptor: descriptor.into(),
            enforcement: Enforcement::FailIfUnknown,
        }
    }

    pub fn ignore_if_unknown(mut self) -> Self {
        self.enforcement = Enforcement::IgnoreIfUnknown;
        self
    }

    /// Convenience constructor for the one category every built-in
    /// registers: `{category: "size", descriptor: <size>}`.
    pub fn size(descriptor: impl Into<String>) -> Self {
        Property::new("size", descriptor)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{category: {}, descriptor: {}}}", self.category, self.descriptor)
    }
}
