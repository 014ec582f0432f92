//! Error taxonomy shared by every fallible operation in the engine.
//!
//! The kinds mirror the `absl::Status` codes the original implementation
//! returned (see `src/errors.h` in the upstream sources): callers are meant
//! to match on [`Error`] variants, not on message text.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller contract violated: bad range, wrong finalization order,
    /// unknown property with `fail_if_unknown`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// State not ready: empty range, dependency cycle, retry budget
    /// exhausted, a value required but missing.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// A named variable does not exist in the `VariableSet`.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// A named value does not exist in the `ValueSet`, and the corresponding
    /// variable has no computable unique value either.
    #[error("value not found: {0}")]
    ValueNotFound(String),

    /// Returned by `is_satisfied_with`; carries a human-readable reason.
    #[error("unsatisfied constraint: {0}")]
    UnsatisfiedConstraint(String),

    /// A type-erasure downcast failed. Indicates a `Variable` implementation
    /// returned or was given a value of the wrong concrete type.
    #[error("internal error: {0}")]
    Internal(String),

    /// The capability (e.g. `read`/`print`) is not implemented for this
    /// variable.
    #[error("unimplemented: {0}")]
    Unimplemented(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Error::FailedPrecondition(msg.into())
    }

    pub fn unsatisfied(msg: impl Into<String>) -> Self {
        Error::UnsatisfiedConstraint(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn unimplemented(msg: impl Into<String>) -> Self {
        Error::Unimplemented(msg.into())
    }

    /// True for the two `NotFound`-flavored variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::VariableNotFound(_) | Error::ValueNotFound(_))
    }

    /// Rewrites a `NotFound` error into `UnsatisfiedConstraint`, preserving
    /// everything else. This is the rule from spec: a `ValueNotFound` /
    /// `VariableNotFound` that bubbles out of a validator's naive dependency
    /// lookup should read as "constraint not satisfied", not as a missing
    /// variable.
    pub fn into_unsatisfied_if_not_found(self) -> Self {
        match self {
            Error::VariableNotFound(name) => {
                Error::UnsatisfiedConstraint(format!("dependency '{name}' has no value"))
            }
            Error::ValueNotFound(name) => {
                Error::UnsatisfiedConstraint(format!("dependency '{name}' has no value"))
            }
            other => other,
        }
    }
}

/// Helper mirroring `CheckConstraint` from the original `mvariable.h`: turns
/// a boolean condition into `Ok(())` or `UnsatisfiedConstraint(reason)`.
pub fn check_constraint(condition: bool, reason: impl fmt::Display) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::unsatisfied(reason.to_string()))
    }
}
