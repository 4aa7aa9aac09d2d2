//! Mapping between screen and simulation space.

use crate::simulator::components::nodes::{Node, NodeId};
use glam::Vec2;

/// Smallest zoom factor of a [`ViewTransform`].
pub const MIN_SCALE: f32 = 0.1;

/// Largest zoom factor of a [`ViewTransform`].
pub const MAX_SCALE: f32 = 5.0;

/// Index of the first active node containing `point`.
///
/// `point` has already been translated into the view; it is divided by
/// `scale` to get simulation coordinates.
pub(crate) fn node_at(nodes: &[Node], active: &[usize], point: Vec2, scale: f32) -> Option<usize> {
    let point = point / scale;
    active.iter().copied().find(|&i| nodes[i].contains(point))
}

/// Pan and zoom applied to the simulation before it is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub translate: Vec2,
    /// Zoom factor, clamped to `MIN_SCALE..=MAX_SCALE`.
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    /// Zooms by `factor` keeping the screen point `focus` fixed.
    pub fn zoom(&mut self, factor: f32, focus: Vec2) {
        let previous = self.scale;
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        if self.scale == previous {
            return;
        }

        let applied = self.scale / previous;
        self.translate += (focus - self.translate) * (1.0 - applied);
    }

    pub fn to_simulation(&self, screen: Vec2) -> Vec2 {
        (screen - self.translate) / self.scale
    }

    pub fn to_screen(&self, simulation: Vec2) -> Vec2 {
        simulation * self.scale + self.translate
    }
}

/// How a press ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEnd {
    /// The pointer never left the touch slop.
    Tap(Option<NodeId>),
    /// The pointer moved beyond the touch slop at some point.
    Drag(Option<NodeId>),
}

/// Tells a tap from a drag for a single pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragGesture {
    origin: Vec2,
    last: Vec2,
    node: Option<NodeId>,
    slop: f32,
    dragging: bool,
}

impl DragGesture {
    /// Starts a gesture at screen `point`, over `node` if any.
    pub fn press(point: Vec2, node: Option<NodeId>, slop: f32) -> Self {
        Self {
            origin: point,
            last: point,
            node,
            slop,
            dragging: false,
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Records a pointer move.
    ///
    /// Returns the movement since the previous call once the pointer has left
    /// the touch slop, `None` before that.
    pub fn move_to(&mut self, point: Vec2) -> Option<Vec2> {
        if !self.dragging && self.origin.distance(point) > self.slop {
            self.dragging = true;
        }
        let delta = point - self.last;
        self.last = point;
        self.dragging.then_some(delta)
    }

    pub fn release(self, point: Vec2) -> GestureEnd {
        if self.dragging || self.origin.distance(point) > self.slop {
            GestureEnd::Drag(self.node)
        } else {
            GestureEnd::Tap(self.node)
        }
    }
}
