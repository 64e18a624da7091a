//! In-process domain event plumbing.

pub mod bus;

pub use bus::{DomainEvent, EventBus};
