//! Retry bookkeeping ([`config`]) and the topological-order, three-pass
//! assignment driver ([`bootstrap`]) that together implement spec.md §4.6
//! and §4.7.

pub mod bootstrap;
pub mod config;

pub use bootstrap::{generation_order, GenerationBootstrap};
pub use config::{FailureOutcome, GenerationConfig, RetryPolicy};
