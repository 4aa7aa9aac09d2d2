//! Events for communicating with the simulator from the outside.

use crate::simulator::components::nodes::NodeId;
use glam::Vec2;

/// Describes an event received by a [`ForceEngine`](crate::simulator::ForceEngine).
#[derive(Clone, Debug, PartialEq)]
pub enum SimulatorEvent {
    /// The canvas has been resized.
    CanvasResized { width: f32, height: f32 },

    /// The simulation's charge has been updated.
    ChargeUpdated(f32),

    /// The simulation's link strength has been updated.
    StrengthUpdated(f32),

    /// The simulation's link distance has been updated.
    LinkDistanceUpdated(f32),

    /// The simulation's gravity has been updated.
    GravityUpdated(f32),

    /// The simulation's velocity damping has been updated.
    FrictionUpdated(f32),

    /// The simulation's accuracy has been updated.
    /// This represents the quadtree theta value.
    ThetaUpdated(f32),

    /// A node is being dragged.
    DragStart(NodeId),

    /// The position of the dragged node has changed.
    Dragged(NodeId, Vec2),

    /// A node is no longer being dragged.
    DragEnd(NodeId),
}
