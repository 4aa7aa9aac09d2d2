//! Integration of forces into velocities and positions.

use crate::simulator::components::nodes::Node;
use glam::Vec2;
use log::warn;

/// Advances every active node by one tick.
///
/// Free nodes integrate `velocity = (velocity + force) * friction` and move by
/// their new velocity. Pinned nodes are put on their pin and only have their
/// velocity damped.
pub(crate) fn integrate(nodes: &mut [Node], active: &[usize], forces: &[Vec2], friction: f32) {
    for &i in active {
        let node = &mut nodes[i];
        if let Some(pin) = node.pinned {
            node.position = pin;
            node.velocity *= friction;
            continue;
        }

        let velocity = (node.velocity + forces[i]) * friction;
        let position = node.position + velocity;
        if velocity.is_finite() && position.is_finite() {
            node.velocity = velocity;
            node.position = position;
        } else {
            warn!("[{0}] Non-finite update discarded", node.id);
            node.velocity = Vec2::ZERO;
        }
    }
}
