//! Publish/subscribe notifications
//!
//! # Design Principles
//!
//! - Buses are owned by the object that emits on them, never global
//! - One typed payload per bus
//! - Delivery in registration order, synchronous with the emitting call
//! - Events are published only after the state change they describe succeeded

mod bus;
mod types;

pub use bus::{EventBus, SubscriptionId};
pub use types::{ConnectorEvent, HookPhase, InstanceEvent, ModelEvent, RegistryEvent};
