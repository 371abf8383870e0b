//! The device's node catalogue.
//!
//! Write-once, read-many: nodes and properties are registered while the
//! application wires itself up, the registry is sealed before the first
//! tick, and from then on the structure is immutable. Inbound `set`
//! commands and the outbound advertisement both walk the same catalogue,
//! in insertion order.

use core::fmt;

use log::info;

use super::node::{Node, NodeInputHandler};
use crate::ports::{NetError, PubSubPort};
use crate::publish::TopicRoot;

/// Registration errors. All of them are programming mistakes and fatal:
/// the composition root gives up rather than running half-registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// `add_node` after `seal`.
    SealedRegistry,
    /// Node id exceeds [`super::MAX_NODE_ID_LEN`].
    NodeIdTooLong,
    /// Node type exceeds [`super::MAX_NODE_TYPE_LEN`].
    NodeTypeTooLong,
    /// A node with this id already exists.
    DuplicateNodeId,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SealedRegistry => write!(f, "registry is sealed"),
            Self::NodeIdTooLong => write!(f, "node id too long"),
            Self::NodeTypeTooLong => write!(f, "node type too long"),
            Self::DuplicateNodeId => write!(f, "duplicate node id"),
        }
    }
}

/// Outcome of routing one inbound `set` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// A handler accepted the value.
    Accepted,
    /// A handler saw the value and declined it.
    RejectedByHandler,
    /// No node with that id.
    UnknownNode,
    /// No property matching that segment on the node.
    UnknownProperty,
    /// The property was never marked settable.
    NotSettable,
    /// Range index outside the advertised bounds.
    IndexOutOfRange,
}

/// Insertion-ordered collection of [`Node`]s with a seal.
pub struct DeviceRegistry {
    nodes: Vec<Node>,
    sealed: bool,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            sealed: false,
        }
    }

    /// Register a node without a node-level input handler.
    pub fn add_node(
        &mut self,
        id: &str,
        name: &str,
        kind: &str,
    ) -> Result<&mut Node, RegistryError> {
        self.insert(id, name, kind, None)
    }

    /// Register a node with a node-level input handler, the fallback for
    /// settable properties without their own.
    pub fn add_node_with_handler(
        &mut self,
        id: &str,
        name: &str,
        kind: &str,
        handler: impl FnMut(&str, Option<u16>, &str) -> bool + 'static,
    ) -> Result<&mut Node, RegistryError> {
        self.insert(id, name, kind, Some(Box::new(handler)))
    }

    fn insert(
        &mut self,
        id: &str,
        name: &str,
        kind: &str,
        handler: Option<NodeInputHandler>,
    ) -> Result<&mut Node, RegistryError> {
        if self.sealed {
            return Err(RegistryError::SealedRegistry);
        }
        if self.nodes.iter().any(|n| n.id() == id) {
            return Err(RegistryError::DuplicateNodeId);
        }
        let node = Node::new(id, name, kind, handler)?;
        self.nodes.push(node);
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last])
    }

    /// Close the catalogue. Call once, before the first tick.
    pub fn seal(&mut self) {
        self.sealed = true;
        info!("device registry sealed with {} nodes", self.nodes.len());
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Route one inbound `set` command to the owning handler.
    /// `property_segment` is the raw topic segment, `_<index>` suffix and
    /// all.
    pub fn dispatch_set(
        &mut self,
        node_id: &str,
        property_segment: &str,
        value: &str,
    ) -> SetOutcome {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id() == node_id) else {
            return SetOutcome::UnknownNode;
        };
        let Some((prop_index, range_index)) = node.resolve_property(property_segment) else {
            return SetOutcome::UnknownProperty;
        };
        let property = &node.properties()[prop_index];
        if !property.is_settable() {
            return SetOutcome::NotSettable;
        }
        if let (Some(index), Some(range)) = (range_index, property.range()) {
            if index < range.lower || index > range.upper {
                return SetOutcome::IndexOutOfRange;
            }
        }
        if node.run_handlers(prop_index, range_index, value) {
            SetOutcome::Accepted
        } else {
            SetOutcome::RejectedByHandler
        }
    }

    /// Publish the retained device advertisement: `$nodes`, then each
    /// node's `$type` and `$properties`, in registration order.
    pub fn publish_advertisement(
        &self,
        root: &TopicRoot,
        bus: &mut impl PubSubPort,
    ) -> Result<(), NetError> {
        let node_list = self
            .nodes
            .iter()
            .map(Node::id)
            .collect::<Vec<_>>()
            .join(",");
        bus.publish(&root.device_topic("$nodes"), &node_list, 1, true)?;

        for node in &self.nodes {
            bus.publish(&root.node_topic(node.id(), "$type"), node.kind(), 1, true)?;
            let properties = node
                .properties()
                .iter()
                .map(super::property::Property::announcement_entry)
                .collect::<Vec<_>>()
                .join(",");
            bus.publish(
                &root.node_topic(node.id(), "$properties"),
                &properties,
                1,
                true,
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("nodes", &self.nodes)
            .field("sealed", &self.sealed)
            .finish()
    }
}
