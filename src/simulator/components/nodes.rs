//! Components which make up a node

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hit radius used when a node does not specify one.
pub const DEFAULT_RADIUS: f32 = 20.0;

/// Stable identity of a node, independent of its slot in the simulation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<usize> for NodeId {
    fn from(id: usize) -> Self {
        Self(id as u64)
    }
}

/// Where a node is in a drag interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragState {
    #[default]
    Idle,
    DragStart,
    Dragging,
    DragEnd,
}

/// A node of the simulated graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec2,
    pub velocity: Vec2,
    /// While set, the node is held at this position instead of being moved by
    /// the simulation.
    pub pinned: Option<Vec2>,
    /// Scales the repel force the node takes part in.
    pub mass: f32,
    /// Radius used for hit-testing, in simulation space.
    pub radius: f32,
    /// Hierarchy level used to filter the active subgraph.
    pub level: u32,
    pub drag_state: DragState,
    placed: bool,
}

impl Node {
    /// A node without a position. It is placed near the canvas center when
    /// the simulation is seeded.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pinned: None,
            mass: 1.0,
            radius: DEFAULT_RADIUS,
            level: 0,
            drag_state: DragState::Idle,
            placed: false,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.place(position);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Whether the node has a position, either given or assigned by seeding.
    pub fn is_placed(&self) -> bool {
        self.placed
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    pub(crate) fn place(&mut self, position: Vec2) {
        self.position = position;
        self.placed = true;
    }

    /// Whether `point` lies within the node's radius.
    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }
}
