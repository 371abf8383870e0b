//! Node and property catalogue plus its broker-facing advertisement.
//!
//! The application declares its nodes and properties here during wiring,
//! then [`DeviceRegistry::seal`] freezes the structure for the life of the
//! process. Normal mode reads the catalogue to advertise the device and to
//! route inbound `set` commands; outbound values go through
//! [`crate::publish::PublishIntent`] handles produced by
//! [`Node::set_property`].

pub mod node;
pub mod property;
pub mod registry;

pub use node::{Node, NodeInputHandler};
pub use property::{Property, PropertyInputHandler, PropertyRange};
pub use registry::{DeviceRegistry, RegistryError, SetOutcome};

/// Longest accepted node id, in bytes.
pub const MAX_NODE_ID_LEN: usize = 24;
/// Longest accepted node type, in bytes.
pub const MAX_NODE_TYPE_LEN: usize = 24;
