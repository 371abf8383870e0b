//! Topic layout and the publish-intent builder.
//!
//! [`TopicRoot`] owns the `<base><hostname>` prefix every topic hangs off
//! and parses inbound `set` topics back into node/property segments.
//! [`PublishIntent`] is the staged outbound message: created by
//! [`Node::set_property`](crate::device::Node::set_property) with the
//! conventional defaults, adjusted through consuming builder methods, and
//! spent exactly once by [`PublishIntent::send`].

use core::fmt;

use crate::device::Node;
use crate::ports::{NetError, PubSubPort};

/// Topic namespace prefix. Always ends with `/`.
pub const DEFAULT_BASE_TOPIC: &str = "homie/";

/// Convention version advertised beside the registry.
pub const CONVENTION_VERSION: &str = "2.0.0";

// ───────────────────────────────────────────────────────────────
// Topic root
// ───────────────────────────────────────────────────────────────

/// The `<base><hostname>` topic prefix, e.g. `homie/kitchen-lamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRoot {
    prefix: String,
}

impl TopicRoot {
    pub fn new(hostname: &str) -> Self {
        Self::with_base(DEFAULT_BASE_TOPIC, hostname)
    }

    /// Custom namespace. A missing trailing `/` on `base` is supplied.
    pub fn with_base(base: &str, hostname: &str) -> Self {
        let mut prefix = String::with_capacity(base.len() + 1 + hostname.len());
        prefix.push_str(base);
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        prefix.push_str(hostname);
        Self { prefix }
    }

    /// Device-level attribute topic, e.g. `homie/kitchen-lamp/$nodes`.
    pub fn device_topic(&self, attribute: &str) -> String {
        format!("{}/{}", self.prefix, attribute)
    }

    /// Node-level attribute topic, e.g. `homie/kitchen-lamp/light/$type`.
    pub fn node_topic(&self, node_id: &str, attribute: &str) -> String {
        format!("{}/{}/{}", self.prefix, node_id, attribute)
    }

    /// Property value topic. A range index becomes an `_<index>` suffix and
    /// `set` appends the `/set` command segment.
    pub fn property_topic(
        &self,
        node_id: &str,
        property_id: &str,
        index: Option<u16>,
        set: bool,
    ) -> String {
        let mut topic = format!("{}/{}/{}", self.prefix, node_id, property_id);
        if let Some(i) = index {
            topic.push('_');
            topic.push_str(itoa_buffer(i).as_str());
        }
        if set {
            topic.push_str("/set");
        }
        topic
    }

    /// Subscription filter covering every property's command topic.
    pub fn set_wildcard(&self) -> String {
        format!("{}/+/+/set", self.prefix)
    }

    /// Split an inbound command topic into `(node_id, property_segment)`.
    /// The property segment may still carry an `_<index>` suffix; resolving
    /// it against the registry happens later. Returns `None` for topics
    /// outside this root or not of the `<node>/<property>/set` shape.
    pub fn parse_set_topic<'t>(&self, topic: &'t str) -> Option<(&'t str, &'t str)> {
        let rest = topic.strip_prefix(self.prefix.as_str())?;
        let rest = rest.strip_prefix('/')?;
        let mut segments = rest.split('/');
        let node = segments.next()?;
        let property = segments.next()?;
        let command = segments.next()?;
        if segments.next().is_some() || command != "set" || node.is_empty() || property.is_empty()
        {
            return None;
        }
        Some((node, property))
    }
}

fn itoa_buffer(value: u16) -> heapless::String<5> {
    use core::fmt::Write;
    let mut s = heapless::String::new();
    // u16 always fits in five digits.
    let _ = write!(s, "{value}");
    s
}

// ───────────────────────────────────────────────────────────────
// Publish intent
// ───────────────────────────────────────────────────────────────

/// Why a publish intent could not be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// The property id was never advertised on the node.
    UnknownProperty,
    /// A range index was supplied for a non-range property.
    NotARange,
    /// The range index lies outside the advertised bounds.
    IndexOutOfRange,
    /// The transport rejected the message.
    Net(NetError),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownProperty => write!(f, "property not advertised"),
            Self::NotARange => write!(f, "property is not a range"),
            Self::IndexOutOfRange => write!(f, "range index out of bounds"),
            Self::Net(e) => write!(f, "transport: {e}"),
        }
    }
}

impl From<NetError> for PublishError {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

/// A staged outbound property publication.
///
/// Defaults: QoS 1, retained, value topic (not `/set`), no range index.
/// Builder methods consume and return the intent; `send` consumes it for
/// good, so an intent cannot be replayed.
#[must_use = "a publish intent does nothing until sent"]
#[derive(Debug)]
pub struct PublishIntent<'n> {
    node: &'n Node,
    property_id: &'n str,
    qos: u8,
    retained: bool,
    overwrite_setter: bool,
    index: Option<u16>,
}

impl<'n> PublishIntent<'n> {
    pub(crate) fn new(node: &'n Node, property_id: &'n str) -> Self {
        Self {
            node,
            property_id,
            qos: 1,
            retained: true,
            overwrite_setter: false,
            index: None,
        }
    }

    pub fn set_qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    pub fn set_retained(mut self, retained: bool) -> Self {
        self.retained = retained;
        self
    }

    /// Target the property's `/set` command topic instead of its value
    /// topic, e.g. to clear a retained command.
    pub fn overwrite_setter(mut self, overwrite: bool) -> Self {
        self.overwrite_setter = overwrite;
        self
    }

    pub fn set_range_index(mut self, index: u16) -> Self {
        self.index = Some(index);
        self
    }

    pub fn qos(&self) -> u8 {
        self.qos
    }

    pub fn retained(&self) -> bool {
        self.retained
    }

    pub fn overwrites_setter(&self) -> bool {
        self.overwrite_setter
    }

    pub fn range_index(&self) -> Option<u16> {
        self.index
    }

    /// Validate against the node's advertisement and hand the message to
    /// the transport. Consumes the intent.
    pub fn send(
        self,
        root: &TopicRoot,
        bus: &mut impl PubSubPort,
        value: &str,
    ) -> Result<(), PublishError> {
        let property = self
            .node
            .property(self.property_id)
            .ok_or(PublishError::UnknownProperty)?;
        if let Some(index) = self.index {
            let range = property.range().ok_or(PublishError::NotARange)?;
            if index < range.lower || index > range.upper {
                return Err(PublishError::IndexOutOfRange);
            }
        }
        let topic = root.property_topic(
            self.node.id(),
            self.property_id,
            self.index,
            self.overwrite_setter,
        );
        bus.publish(&topic, value, self.qos, self.retained)?;
        Ok(())
    }
}
