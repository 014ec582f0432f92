//! Retry/abort bookkeeping for the assignment of a single variable, ported
//! from `generation_config.h`/`.cc`.
//!
//! `GenerationConfig` is the only place that decides whether a failed
//! generation attempt should be retried or should abort the whole run, and
//! the only place that knows which sibling values must be erased before a
//! retry (the suffix-truncation "unwind" policy).

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Exceeding any of these aborts the in-flight chain rather than retrying.
pub const MAX_ACTIVE_RETRIES: i64 = 1000;
pub const MAX_TOTAL_RETRIES: i64 = 100_000;
pub const MAX_TOTAL_GENERATE_CALLS: i64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Retry,
    Abort,
}

#[derive(Debug, Clone)]
pub struct FailureOutcome {
    pub policy: RetryPolicy,
    pub variable_names_to_delete: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Record {
    actively_generating: bool,
    last_status: Option<std::result::Result<(), String>>,
    total_retries: i64,
}

#[derive(Debug, Clone)]
struct StackFrame {
    name: String,
    active_retry_count: i64,
    start_len: usize,
}

#[derive(Debug, Default)]
pub struct GenerationConfig {
    records: HashMap<String, Record>,
    stack: Vec<StackFrame>,
    generated_variables: Vec<String>,
    total_retries: i64,
    total_generate_calls: i64,
    soft_generation_limit: Option<i64>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        GenerationConfig::default()
    }

    pub fn soft_generation_limit(&self) -> Option<i64> {
        self.soft_generation_limit
    }

    pub fn set_soft_generation_limit(&mut self, limit: Option<i64>) {
        self.soft_generation_limit = limit;
    }

    pub fn get_generation_status(&self, name: &str) -> Option<std::result::Result<(), String>> {
        self.records.get(name).and_then(|r| r.last_status.clone())
    }

    pub fn generated_variables(&self) -> &[String] {
        &self.generated_variables
    }

    /// Records that `name` has begun generating. Fails with
    /// `FailedPrecondition("cyclic dependency")` if `name` is already
    /// actively generating (re-entrant call within the same chain).
    pub fn mark_start_generation(&mut self, name: &str) -> Result<()> {
        if self.records.get(name).is_some_and(|r| r.actively_generating) {
            return Err(Error::failed_precondition(format!(
                "cyclic dependency detected while generating '{name}'"
            )));
        }
        self.records.entry(name.to_string()).or_default().actively_generating = true;
        self.stack.push(StackFrame {
            name: name.to_string(),
            active_retry_count: 0,
            start_len: self.generated_variables.len(),
        });
        Ok(())
    }

    fn assert_top_is(&self, name: &str) -> Result<()> {
        match self.stack.last() {
            Some(frame) if frame.name == name => Ok(()),
            Some(frame) => Err(Error::invalid_argument(format!(
                "attempted to finalize '{name}' but '{}' is the most recently started variable",
                frame.name
            ))),
            None => Err(Error::invalid_argument(format!(
                "attempted to finalize '{name}' with an empty generation stack"
            ))),
        }
    }

    /// Finalizes a successful generation of `name`: pops the stack, records
    /// `name` into the append-only history, and marks the status OK.
    pub fn mark_successful_generation(&mut self, name: &str) -> Result<()> {
        self.assert_top_is(name)?;
        self.stack.pop();
        self.generated_variables.push(name.to_string());
        if let Some(record) = self.records.get_mut(name) {
            record.actively_generating = false;
            record.last_status = Some(Ok(()));
        }
        self.total_generate_calls += 1;
        Ok(())
    }

    /// Finalizes an aborted generation of `name`: pops the stack without
    /// appending to the history.
    pub fn mark_abandoned_generation(&mut self, name: &str) -> Result<()> {
        self.assert_top_is(name)?;
        self.stack.pop();
        if let Some(record) = self.records.get_mut(name) {
            record.actively_generating = false;
        }
        Ok(())
    }

    /// Records a failed attempt at generating `name`. Truncates
    /// `generated_variables` back to its length when `name` started,
    /// returning the truncated suffix as the names whose values must be
    /// erased before retrying. Returns `Abort` once any of the three hard
    /// limits has been exceeded.
    pub fn add_generation_failure(
        &mut self,
        name: &str,
        status: &Error,
    ) -> Result<FailureOutcome> {
        self.assert_top_is(name)?;
        let frame = self.stack.last_mut().expect("checked by assert_top_is");
        frame.active_retry_count += 1;
        let active_retry_count = frame.active_retry_count;
        let start_len = frame.start_len;

        self.total_retries += 1;
        self.total_generate_calls += 1;

        if let Some(record) = self.records.get_mut(name) {
            record.total_retries += 1;
            record.last_status = Some(Err(status.to_string()));
        }

        let variable_names_to_delete = self.generated_variables.split_off(start_len);

        let policy = if active_retry_count > MAX_ACTIVE_RETRIES
            || self.total_retries > MAX_TOTAL_RETRIES
            || self.total_generate_calls > MAX_TOTAL_GENERATE_CALLS
        {
            RetryPolicy::Abort
        } else {
            RetryPolicy::Retry
        };

        Ok(FailureOutcome { policy, variable_names_to_delete })
    }
}
