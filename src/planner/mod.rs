//! Query description subsystem for aeromodel
//!
//! # Design Principles
//!
//! - A query is plain data, independent of any connector
//! - Malformed input is rejected before execution
//! - `page`/`per_page` is sugar for `skip`/`limit`
//! - `limit` of 0 means unlimited

mod ast;
mod parser;

pub use ast::{split_fields, FilterOp, Predicate, Projection, QueryDescription, SortDirection, SortSpec};
pub use parser::{parse_where, DEFAULT_PER_PAGE};
