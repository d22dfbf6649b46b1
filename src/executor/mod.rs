//! Query Executor subsystem for aeromodel
//!
//! Evaluates a [`QueryDescription`](crate::planner::QueryDescription)
//! against a record set in memory. Connectors without native query support
//! delegate here.
//!
//! # Invariants
//!
//! - Deterministic: same records in the same order give the same result
//! - Sorting is stable
//! - `page`/`per_page` and the equivalent `skip`/`limit` give identical results
//! - Distinct keeps the first-seen record per key, in first-seen order

#[allow(clippy::module_inception)]
mod executor;
mod filters;
mod result;
mod sorter;

pub use executor::QueryExecutor;
pub use filters::{values_equal, PredicateFilter};
pub use result::{ExecutionResult, ResultDocument};
pub use sorter::ResultSorter;
