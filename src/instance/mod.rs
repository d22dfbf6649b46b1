//! Instance subsystem for aeromodel
//!
//! # Design Principles
//!
//! - An `Instance` is a cheap shared handle; identity is the shared state
//! - Every write goes through one validated pipeline
//! - Primary-key aliases are explicit accessors over one slot
//! - Storage payload and transport JSON are separate projections of the same values

mod collection;
#[allow(clippy::module_inception)]
mod instance;
mod primary_key;

pub use collection::Collection;
pub use instance::{Instance, InstanceStatus};
pub use primary_key::PrimaryKeyAlias;
