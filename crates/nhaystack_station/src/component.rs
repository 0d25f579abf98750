//! Components of the host object tree.

use std::fmt;

use haystack_types::Dict;
use serde::{Deserialize, Serialize};

use crate::history::HistoryId;
use crate::point::ControlPoint;

/// Opaque identifier of a component in the host tree.
///
/// Handles are stable for the lifetime of the component but may dangle
/// after the host removes it; always resolve through the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub u64);

impl From<u64> for Handle {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hand-authored Haystack tags attached to a component.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// The component publishes its full tag set itself; nothing is derived.
    Complete(Dict),
    /// Tags merged underneath the auto-generated ones.
    Partial(Dict),
}

impl Annotation {
    pub fn dict(&self) -> &Dict {
        match self {
            Annotation::Complete(d) | Annotation::Partial(d) => d,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Annotation::Complete(_))
    }
}

/// What a component is, beyond its place in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentBody {
    /// Structural component with no protocol meaning of its own
    Plain,
    Point(ControlPoint),
    /// History extension of its parent point, recording into `history`
    HistoryExt { history: HistoryId },
    /// Device representing a peer station on the Niagara network
    NiagaraStation { station_name: String },
}

/// A node of the host tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub handle: Handle,
    /// Slot name within the parent
    pub name: String,
    pub display_name: Option<String>,
    /// Type descriptor, e.g. "kitControl:SineWave"
    pub type_spec: String,
    /// Hierarchical address, e.g. "slot:/Foo/SineWave1"
    pub slot_path: String,
    pub parent: Option<Handle>,
    pub children: Vec<Handle>,
    pub annotation: Option<Annotation>,
    pub body: ComponentBody,
}

impl Component {
    pub fn as_point(&self) -> Option<&ControlPoint> {
        match &self.body {
            ComponentBody::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_point_mut(&mut self) -> Option<&mut ControlPoint> {
        match &mut self.body {
            ComponentBody::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self.body, ComponentBody::Point(_))
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Display name, falling back to the slot name.
    pub fn display(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or(Some(self.name.as_str()).filter(|n| !n.is_empty()))
    }

    /// Annotation tags, if any.
    pub fn tags(&self) -> Option<&Dict> {
        self.annotation.as_ref().map(Annotation::dict)
    }
}

/// Description of a component to be added to a station.
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: String,
    pub type_spec: String,
    pub handle: Option<Handle>,
    pub display_name: Option<String>,
    pub annotation: Option<Annotation>,
    pub body: ComponentBody,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, type_spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_spec: type_spec.into(),
            handle: None,
            display_name: None,
            annotation: None,
            body: ComponentBody::Plain,
        }
    }

    pub fn point(name: impl Into<String>, type_spec: impl Into<String>, point: ControlPoint) -> Self {
        Self::new(name, type_spec).body(ComponentBody::Point(point))
    }

    /// Request a specific handle instead of the next free one.
    pub fn handle(mut self, handle: u64) -> Self {
        self.handle = Some(Handle(handle));
        self
    }

    pub fn display_name(mut self, dis: impl Into<String>) -> Self {
        self.display_name = Some(dis.into());
        self
    }

    pub fn tags(mut self, tags: Dict) -> Self {
        self.annotation = Some(Annotation::Partial(tags));
        self
    }

    pub fn complete_tags(mut self, tags: Dict) -> Self {
        self.annotation = Some(Annotation::Complete(tags));
        self
    }

    pub fn body(mut self, body: ComponentBody) -> Self {
        self.body = body;
        self
    }
}
