//! A registered node and its advertised properties.

use core::fmt;

use super::property::Property;
use super::{MAX_NODE_ID_LEN, MAX_NODE_TYPE_LEN, RegistryError};
use crate::publish::PublishIntent;

/// Node-level input callback: `(property_id, range_index, value) -> accepted`.
/// Fallback for settable properties without their own handler.
pub type NodeInputHandler = Box<dyn FnMut(&str, Option<u16>, &str) -> bool>;

/// One functional unit of the device (a relay, a sensor cluster, a strip).
/// Lives inside the registry for the whole boot; there is no way to remove
/// or destroy one once added.
pub struct Node {
    id: heapless::String<MAX_NODE_ID_LEN>,
    name: String,
    kind: heapless::String<MAX_NODE_TYPE_LEN>,
    properties: Vec<Property>,
    handler: Option<NodeInputHandler>,
}

impl Node {
    pub(crate) fn new(
        id: &str,
        name: &str,
        kind: &str,
        handler: Option<NodeInputHandler>,
    ) -> Result<Self, RegistryError> {
        let id = heapless::String::try_from(id).map_err(|_| RegistryError::NodeIdTooLong)?;
        let kind = heapless::String::try_from(kind).map_err(|_| RegistryError::NodeTypeTooLong)?;
        Ok(Self {
            id,
            name: name.to_owned(),
            kind,
            properties: Vec::new(),
            handler,
        })
    }

    /// Advertise a plain property and return its handle for further
    /// attribute and settability calls. Insertion order is the order the
    /// broker sees.
    pub fn advertise(&mut self, property_id: &str) -> &mut Property {
        self.properties.push(Property::new(property_id));
        let last = self.properties.len() - 1;
        &mut self.properties[last]
    }

    /// Advertise an array-like property addressed as
    /// `<id>_<index>` for `lower..=upper`.
    pub fn advertise_range(&mut self, property_id: &str, lower: u16, upper: u16) -> &mut Property {
        debug_assert!(lower <= upper, "inverted property range");
        self.properties
            .push(Property::new_range(property_id, lower, upper));
        let last = self.properties.len() - 1;
        &mut self.properties[last]
    }

    /// Stage an outbound publication for one of this node's properties.
    pub fn set_property<'n>(&'n self, property_id: &'n str) -> PublishIntent<'n> {
        PublishIntent::new(self, property_id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's advertised `$type`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Find a property by advertised id.
    pub fn property(&self, property_id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id() == property_id)
    }

    /// Resolve an inbound topic segment to a property slot. An exact id
    /// match wins; otherwise a trailing `_<digits>` suffix addresses a
    /// range property by base id.
    pub(crate) fn resolve_property(&self, segment: &str) -> Option<(usize, Option<u16>)> {
        if let Some(i) = self.properties.iter().position(|p| p.id() == segment) {
            return Some((i, None));
        }
        let (base, suffix) = segment.rsplit_once('_')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: u16 = suffix.parse().ok()?;
        let i = self
            .properties
            .iter()
            .position(|p| p.id() == base && p.range().is_some())?;
        Some((i, Some(index)))
    }

    /// Run the property handler, falling back to the node handler.
    /// Settable without any handler rejects.
    pub(crate) fn run_handlers(
        &mut self,
        prop_index: usize,
        index: Option<u16>,
        value: &str,
    ) -> bool {
        if let Some(result) = self.properties[prop_index].handle_set(index, value) {
            return result;
        }
        let property_id = self.properties[prop_index].id();
        if let Some(handler) = self.handler.as_mut() {
            return handler(property_id, index, value);
        }
        false
    }
}

// Node holds boxed closures, so Debug is written out by hand.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
