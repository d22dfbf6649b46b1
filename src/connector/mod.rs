//! Connector subsystem for aeromodel
//!
//! # Design Principles
//!
//! - One trait for every storage adapter; unimplemented operations are declared, not faked
//! - Connectors receive and return instances; storage names are the connector's concern
//! - Storage errors pass through to the caller unchanged

mod contract;
mod memory;
mod operation;

pub use contract::{Connector, FindAndModifyOptions};
pub use memory::{MemoryConnector, MEMORY_CONNECTOR_NAME};
pub use operation::{Capabilities, Operation};
