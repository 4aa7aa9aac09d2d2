//! Components which make up a link

use super::nodes::NodeId;

/// A spring between two nodes, referring to them by id.
///
/// A link whose endpoints are not both part of the active graph is ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    /// Rest length. Falls back to the configured link distance.
    pub distance: Option<f32>,
    /// Multiplies the configured link strength.
    ///
    /// Default: `1.0`
    pub strength: f32,
}

impl Link {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            distance: None,
            strength: 1.0,
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }
}

/// A link whose endpoints have been resolved to node slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ResolvedLink {
    /// Index into the full link list.
    pub link: usize,
    pub source: usize,
    pub target: usize,
}
