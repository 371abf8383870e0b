//! One advertised property of a node.

use core::fmt;

/// Property-level input callback: `(range_index, value) -> accepted`.
pub type PropertyInputHandler = Box<dyn FnMut(Option<u16>, &str) -> bool>;

/// Inclusive index bounds of an array-like property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyRange {
    pub lower: u16,
    pub upper: u16,
}

/// A property as advertised to the broker. Created through
/// [`Node::advertise`](super::Node::advertise) /
/// [`Node::advertise_range`](super::Node::advertise_range); the returned
/// handle is used to attach presentation attributes and settability before
/// the registry is sealed.
pub struct Property {
    id: String,
    name: String,
    datatype: String,
    unit: String,
    format: String,
    settable: bool,
    range: Option<PropertyRange>,
    handler: Option<PropertyInputHandler>,
}

impl Property {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: String::new(),
            datatype: String::new(),
            unit: String::new(),
            format: String::new(),
            settable: false,
            range: None,
            handler: None,
        }
    }

    pub(crate) fn new_range(id: &str, lower: u16, upper: u16) -> Self {
        let mut p = Self::new(id);
        p.range = Some(PropertyRange { lower, upper });
        p
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_owned();
        self
    }

    pub fn set_datatype(&mut self, datatype: &str) -> &mut Self {
        self.datatype = datatype.to_owned();
        self
    }

    pub fn set_unit(&mut self, unit: &str) -> &mut Self {
        self.unit = unit.to_owned();
        self
    }

    pub fn set_format(&mut self, format: &str) -> &mut Self {
        self.format = format.to_owned();
        self
    }

    /// Mark settable; inbound commands route to the node-level handler.
    pub fn settable(&mut self) -> &mut Self {
        self.settable = true;
        self
    }

    /// Mark settable with a property-level handler, tried before the
    /// node-level one.
    pub fn settable_with(
        &mut self,
        handler: impl FnMut(Option<u16>, &str) -> bool + 'static,
    ) -> &mut Self {
        self.settable = true;
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn is_settable(&self) -> bool {
        self.settable
    }

    pub fn range(&self) -> Option<PropertyRange> {
        self.range
    }

    /// The `$properties` list entry for this property:
    /// `id`, plus `[lower-upper]` for ranges, plus `:settable`.
    pub(crate) fn announcement_entry(&self) -> String {
        let mut entry = self.id.clone();
        if let Some(range) = self.range {
            entry.push('[');
            entry.push_str(&range.lower.to_string());
            entry.push('-');
            entry.push_str(&range.upper.to_string());
            entry.push(']');
        }
        if self.settable {
            entry.push_str(":settable");
        }
        entry
    }

    /// Run the property-level handler if one is attached.
    pub(crate) fn handle_set(&mut self, index: Option<u16>, value: &str) -> Option<bool> {
        self.handler.as_mut().map(|h| h(index, value))
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id)
            .field("settable", &self.settable)
            .field("range", &self.range)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
