//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod lineage;
mod message;
mod socket;

// Re-export all domain types
pub use lineage::Lineage;
pub use message::{ControlMessage, Notification, RegistrationChange};
pub use socket::{ListeningSocket, Protocol};
