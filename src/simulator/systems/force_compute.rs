//! Forces acting on the active nodes during one tick.

use crate::quadtree::{separation_axis, Body, QuadTree, MIN_DISTANCE};
use crate::simulator::{
    components::{
        links::{Link, ResolvedLink},
        nodes::Node,
    },
    ressources::simulator_vars::SimulationParameters,
};
use glam::Vec2;
use rayon::prelude::*;

/// Upper bound for each component of a node's net force.
const MAX_FORCE: f32 = 100_000.0;

/// Builds the quadtree over the positions of the active nodes.
pub(crate) fn build_quadtree(nodes: &[Node], active: &[usize]) -> QuadTree {
    let bodies: Vec<Body> = active
        .iter()
        .map(|&i| Body::new(i, nodes[i].position, nodes[i].mass))
        .collect();
    QuadTree::build(&bodies, None)
}

/// Pull towards `center`, proportional to the distance from it.
pub fn gravity_force(position: Vec2, center: Vec2, gravity: f32) -> Vec2 {
    (center - position) * gravity
}

/// Hooke force a link applies to its source. The target receives the
/// opposite force.
///
/// `fallback` is the link direction used when both ends coincide.
pub fn spring_force(source: Vec2, target: Vec2, rest: f32, strength: f32, fallback: Vec2) -> Vec2 {
    let delta = target - source;
    let direction = delta.try_normalize().unwrap_or(fallback);
    let distance = delta.length().max(MIN_DISTANCE);
    direction * strength * (distance - rest)
}

/// Computes the net force on every node, indexed like `nodes`.
///
/// Charge and gravity are scaled by `alpha`, springs are not.
/// Pinned and inactive nodes receive no force. `degrees` holds the number of
/// active links touching each node.
#[allow(clippy::too_many_arguments)]
pub(crate) fn compute_forces(
    nodes: &[Node],
    active: &[usize],
    links: &[ResolvedLink],
    all_links: &[Link],
    degrees: &[u32],
    quadtree: &QuadTree,
    parameters: &SimulationParameters,
    alpha: f32,
) -> Vec<Vec2> {
    let mut forces = vec![Vec2::ZERO; nodes.len()];
    let charge = parameters.charge * alpha;
    let gravity = parameters.gravity * alpha;
    let center = parameters.center();

    let field: Vec<(usize, Vec2)> = active
        .par_iter()
        .copied()
        .filter(|&i| !nodes[i].is_pinned())
        .map(|i| {
            let node = &nodes[i];
            let body = Body::new(i, node.position, node.mass);
            let repel = quadtree.repulsion(&body, parameters.theta, charge).force;
            (i, repel + gravity_force(node.position, center, gravity))
        })
        .collect();
    for (i, force) in field {
        forces[i] = force;
    }

    for resolved in links {
        let link = &all_links[resolved.link];
        let (source, target) = (&nodes[resolved.source], &nodes[resolved.target]);
        let source_degree = degrees[resolved.source].max(1) as f32;
        let target_degree = degrees[resolved.target].max(1) as f32;

        // Divided by the smaller degree: a node's springs add up to at most
        // `strength`.
        let force = spring_force(
            source.position,
            target.position,
            link.distance.unwrap_or(parameters.link_distance),
            parameters.strength * link.strength / source_degree.min(target_degree),
            separation_axis(resolved.target, resolved.source),
        );

        // Split by degree so that well connected nodes move less.
        let source_share = target_degree / (source_degree + target_degree);
        forces[resolved.source] += force * source_share;
        forces[resolved.target] -= force * (1.0 - source_share);
    }

    for &i in active {
        forces[i] = if nodes[i].is_pinned() {
            Vec2::ZERO
        } else {
            forces[i].clamp(Vec2::splat(-MAX_FORCE), Vec2::splat(MAX_FORCE))
        };
    }
    forces
}
