//! The force engine.
//!
//! Nodes and links live in flat arenas addressed by slot. `components` holds
//! the data types, `ressources` the parameters and events, and `systems` the
//! per-tick passes (forces, integration, hit testing) as free functions over
//! those arenas.

pub mod components;
pub mod ressources;
pub mod systems;

use crate::{
    error::SimulationError,
    graph_data::GraphData,
    listener::SimulationListener,
    scheduler::TickStatus,
    simulator::{
        components::{
            links::{Link, ResolvedLink},
            nodes::{DragState, Node, NodeId},
        },
        ressources::{events::SimulatorEvent, simulator_vars::SimulationParameters},
        systems::{force_compute, position_compute, position_update},
    },
};
use glam::Vec2;
use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Weak;

/// Unplaced nodes are scattered within this fraction of the smaller canvas
/// side around the center.
const PLACEMENT_SPREAD: f32 = 0.25;

/// Lifecycle of a [`ForceEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// No parameters have been applied yet.
    Uninitialized,
    /// Parameters are set but no graph has been seeded.
    Configured,
    /// A graph is loaded and alpha is reset, waiting for `start`.
    Seeded,
    Running,
    /// Alpha dropped below the threshold. Ticks are no-ops until resumed.
    Settled,
    /// Terminal. Nothing changes anymore.
    Stopped,
}

/// Nodes and links adjacent to a node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Neighborhood {
    /// Adjacent nodes, each listed once.
    pub nodes: Vec<NodeId>,
    /// Active links the node is the source of, as indices into [`ForceEngine::links`].
    pub outgoing: Vec<usize>,
    /// Active links the node is the target of, as indices into [`ForceEngine::links`].
    pub incoming: Vec<usize>,
}

/// Force directed layout advanced one tick at a time.
///
/// Holds every node and link it was given. Only the subgraph of the current
/// level takes part in the simulation.
pub struct ForceEngine {
    parameters: Option<SimulationParameters>,
    state: EngineState,
    alpha: f32,
    level: Option<u32>,
    nodes: Vec<Node>,
    all_links: Vec<Link>,
    index: HashMap<NodeId, usize>,
    /// Slots of the nodes in the current level.
    active: Vec<usize>,
    links: Vec<ResolvedLink>,
    degrees: Vec<u32>,
    listener: Weak<dyn SimulationListener>,
    rng: StdRng,
}

impl ForceEngine {
    /// Creates an engine reporting to `listener`. The engine does not keep the
    /// listener alive.
    pub fn new(listener: Weak<dyn SimulationListener>) -> Self {
        Self {
            parameters: None,
            state: EngineState::Uninitialized,
            alpha: 0.0,
            level: None,
            nodes: Vec::new(),
            all_links: Vec::new(),
            index: HashMap::new(),
            active: Vec::new(),
            links: Vec::new(),
            degrees: Vec::new(),
            listener,
            rng: StdRng::from_entropy(),
        }
    }

    /// Applies `parameters`. Invalid parameters are rejected and leave the
    /// engine unchanged.
    pub fn configure(&mut self, parameters: SimulationParameters) -> Result<(), SimulationError> {
        if self.is_stopped() {
            warn!("Configure ignored, simulation is stopped");
            return Ok(());
        }
        parameters.validate()?;

        if let Some(seed) = parameters.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        info!(
            "Configured {0}x{1} canvas, theta {2}, alpha {3}",
            parameters.width, parameters.height, parameters.theta, parameters.alpha
        );
        let alpha = parameters.alpha;
        self.parameters = Some(parameters);
        if self.state == EngineState::Uninitialized {
            if self.nodes.is_empty() {
                self.state = EngineState::Configured;
            } else {
                // A graph was given before the parameters.
                self.alpha = alpha;
                self.state = EngineState::Seeded;
            }
        }
        if self.state != EngineState::Configured {
            self.place_unplaced();
        }
        Ok(())
    }

    pub fn parameters(&self) -> Option<&SimulationParameters> {
        self.parameters.as_ref()
    }

    /// Replaces the whole graph and seeds the simulation with it.
    pub fn set_data(&mut self, nodes: Vec<Node>, links: Vec<Link>) {
        if self.is_stopped() {
            warn!("New graph ignored, simulation is stopped");
            return;
        }

        self.index.clear();
        self.nodes = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            if self.index.contains_key(&node.id) {
                warn!("[{0}] Duplicate node dropped", node.id);
                continue;
            }
            if !(node.mass.is_finite() && node.mass > 0.0) {
                warn!("[{0}] Invalid mass {1}, using 1", node.id, node.mass);
                node.mass = 1.0;
            }
            self.index.insert(node.id, self.nodes.len());
            self.nodes.push(node);
        }
        self.all_links = links;
        info!(
            "Graph set: {0} nodes, {1} links",
            self.nodes.len(),
            self.all_links.len()
        );
        self.reseed();
    }

    /// Same as [`Self::set_data`] for a [`GraphData`] bundle.
    pub fn set_graph(&mut self, graph: GraphData) {
        self.set_data(graph.nodes, graph.links);
    }

    pub fn current_level(&self) -> Option<u32> {
        self.level
    }

    /// Restricts the simulation to nodes up to `level` and restarts it.
    /// Every pin and drag is released.
    ///
    /// Returns `false` without touching anything if `level` is already the
    /// current level.
    pub fn set_current_level(&mut self, level: u32) -> bool {
        if self.is_stopped() || self.level == Some(level) {
            return false;
        }
        info!("Level switched to {0}", level);
        self.level = Some(level);
        // Pins and drags do not survive a re-seed.
        for node in &mut self.nodes {
            node.pinned = None;
            node.drag_state = DragState::Idle;
        }
        self.reseed();
        if self.parameters.is_some() {
            self.run();
        }
        true
    }

    /// Starts the simulation with full alpha.
    pub fn start(&mut self) -> Result<(), SimulationError> {
        if self.is_stopped() {
            warn!("Start ignored, simulation is stopped");
            return Ok(());
        }
        if self.parameters.is_none() {
            return Err(SimulationError::NotConfigured);
        }
        self.run();
        Ok(())
    }

    fn run(&mut self) {
        let Some(parameters) = &self.parameters else {
            return;
        };
        self.alpha = parameters.alpha;
        self.place_unplaced();
        self.state = EngineState::Running;
        info!(
            "Simulation started with {0} nodes at alpha {1}",
            self.active.len(),
            self.alpha
        );
    }

    /// Continues a running or settled simulation.
    ///
    /// Alpha is raised to the configured resume alpha if it is lower, so a
    /// drag moves the layout locally without re-heating it completely.
    /// Returns whether the engine is running afterwards.
    pub fn resume(&mut self) -> bool {
        if !matches!(self.state, EngineState::Running | EngineState::Settled) {
            return false;
        }
        let Some(parameters) = &self.parameters else {
            return false;
        };
        if self.state == EngineState::Settled {
            debug!("Resumed at alpha {0}", parameters.resume_alpha);
        }
        self.alpha = self.alpha.max(parameters.resume_alpha);
        self.state = EngineState::Running;
        true
    }

    /// Stops the simulation for good.
    pub fn stop(&mut self) {
        if !self.is_stopped() {
            info!("Simulation stopped");
        }
        self.state = EngineState::Stopped;
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn is_settled(&self) -> bool {
        self.state == EngineState::Settled
    }

    pub fn is_stopped(&self) -> bool {
        self.state == EngineState::Stopped
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// A handle to the listener given at construction.
    pub fn listener(&self) -> Weak<dyn SimulationListener> {
        self.listener.clone()
    }

    /// Advances the simulation by one tick and requests a redraw if anything
    /// moved.
    pub fn tick(&mut self) -> TickStatus {
        let status = self.step();
        if status.needs_redraw() {
            if let Some(listener) = self.listener.upgrade() {
                listener.redraw_requested();
            }
        }
        status
    }

    /// Advances the simulation by one tick without notifying the listener.
    pub fn step(&mut self) -> TickStatus {
        match self.state {
            EngineState::Running => {}
            EngineState::Stopped => return TickStatus::Stopped,
            _ => return TickStatus::Idle,
        }
        let Some(parameters) = &self.parameters else {
            return TickStatus::Idle;
        };

        let quadtree = force_compute::build_quadtree(&self.nodes, &self.active);
        let forces = force_compute::compute_forces(
            &self.nodes,
            &self.active,
            &self.links,
            &self.all_links,
            &self.degrees,
            &quadtree,
            parameters,
            self.alpha,
        );
        position_update::integrate(&mut self.nodes, &self.active, &forces, parameters.friction);

        self.alpha *= parameters.cooling;
        trace!("Tick: alpha {0}, {1} nodes", self.alpha, self.active.len());
        if self.alpha < parameters.alpha_min {
            self.state = EngineState::Settled;
            info!("Simulation settled");
            return TickStatus::Settled;
        }
        TickStatus::Continue
    }

    /// Nodes of the current level.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.active.iter().map(move |&i| &self.nodes[i])
    }

    /// Every node given to the engine, in any level.
    pub fn all_nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Looks up an active node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.active_slot(id).map(|i| &self.nodes[i])
    }


    /// Links whose endpoints are both active.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().map(move |l| &self.all_links[l.link])
    }

    /// Active links with their endpoint nodes.
    pub fn link_endpoints(&self) -> impl Iterator<Item = (&Link, &Node, &Node)> + '_ {
        self.links.iter().map(move |l| {
            (
                &self.all_links[l.link],
                &self.nodes[l.source],
                &self.nodes[l.target],
            )
        })
    }

    /// First active node containing `point`.
    ///
    /// `point` is in view coordinates with the translation already removed;
    /// `scale` is the current zoom factor.
    pub fn get_node(&self, point: Vec2, scale: f32) -> Option<&Node> {
        position_compute::node_at(&self.nodes, &self.active, point, scale).map(|i| &self.nodes[i])
    }

    /// Adjacent nodes and links of an active node.
    pub fn neighbors(&self, id: NodeId) -> Option<Neighborhood> {
        let slot = self.active_slot(id)?;
        let mut neighborhood = Neighborhood::default();
        for (i, link) in self.links.iter().enumerate() {
            let other = if link.source == slot {
                neighborhood.outgoing.push(i);
                link.target
            } else if link.target == slot {
                neighborhood.incoming.push(i);
                link.source
            } else {
                continue;
            };
            let other = self.nodes[other].id;
            if !neighborhood.nodes.contains(&other) {
                neighborhood.nodes.push(other);
            }
        }
        Some(neighborhood)
    }

    /// Holds `id` at `position` until unpinned.
    pub fn pin(&mut self, id: NodeId, position: Vec2) -> Result<(), SimulationError> {
        self.update_node(id, |node| node.pinned = Some(position))
    }

    pub fn unpin(&mut self, id: NodeId) -> Result<(), SimulationError> {
        self.update_node(id, |node| node.pinned = None)
    }

    /// Gives an active node a push, e.g. to shake a settled layout.
    pub fn set_velocity(&mut self, id: NodeId, velocity: Vec2) -> Result<(), SimulationError> {
        if !velocity.is_finite() {
            return Err(SimulationError::InvalidParameter {
                name: "velocity",
                expected: "finite",
                value: if velocity.x.is_finite() { velocity.y } else { velocity.x },
            });
        }
        self.update_node(id, |node| node.velocity = velocity)
    }

    /// Pins a node where it is and marks it as dragged.
    pub fn drag_start(&mut self, id: NodeId) -> Result<(), SimulationError> {
        debug!("[{0}] Drag start", id);
        self.update_node(id, |node| {
            node.pinned = Some(node.position);
            node.drag_state = DragState::DragStart;
        })
    }

    /// Moves the pin of a dragged node and resumes the simulation.
    pub fn drag_to(&mut self, id: NodeId, position: Vec2) -> Result<(), SimulationError> {
        debug!("[{0}] Dragged position: {1}", id, position);
        self.update_node(id, |node| {
            node.pinned = Some(position);
            node.drag_state = DragState::Dragging;
        })?;
        self.resume();
        Ok(())
    }

    /// Releases a dragged node back to the simulation.
    pub fn drag_end(&mut self, id: NodeId) -> Result<(), SimulationError> {
        debug!("[{0}] Drag end", id);
        self.update_node(id, |node| {
            node.pinned = None;
            node.drag_state = DragState::DragEnd;
        })
    }

    /// Applies an event coming from the interaction layer.
    pub fn apply(&mut self, event: SimulatorEvent) -> Result<(), SimulationError> {
        let mut parameters = match event {
            SimulatorEvent::DragStart(id) => return self.drag_start(id),
            SimulatorEvent::Dragged(id, position) => return self.drag_to(id, position),
            SimulatorEvent::DragEnd(id) => return self.drag_end(id),
            _ => self
                .parameters
                .clone()
                .ok_or(SimulationError::NotConfigured)?,
        };

        match event {
            SimulatorEvent::CanvasResized { width, height } => {
                parameters.width = width;
                parameters.height = height;
            }
            SimulatorEvent::ChargeUpdated(charge) => parameters.charge = charge,
            SimulatorEvent::StrengthUpdated(strength) => parameters.strength = strength,
            SimulatorEvent::LinkDistanceUpdated(distance) => parameters.link_distance = distance,
            SimulatorEvent::GravityUpdated(gravity) => parameters.gravity = gravity,
            SimulatorEvent::FrictionUpdated(friction) => parameters.friction = friction,
            SimulatorEvent::ThetaUpdated(theta) => parameters.theta = theta,
            SimulatorEvent::DragStart(_)
            | SimulatorEvent::Dragged(..)
            | SimulatorEvent::DragEnd(_) => {}
        }
        self.configure(parameters)
    }

    fn active_slot(&self, id: NodeId) -> Option<usize> {
        self.index
            .get(&id)
            .copied()
            .filter(|&i| self.is_visible(&self.nodes[i]))
    }

    /// Runs `update` on an active node. Does nothing once stopped.
    fn update_node<F>(&mut self, id: NodeId, update: F) -> Result<(), SimulationError>
    where
        F: FnOnce(&mut Node),
    {
        if self.is_stopped() {
            warn!("[{0}] Ignored, simulation is stopped", id);
            return Ok(());
        }
        let slot = self
            .active_slot(id)
            .ok_or(SimulationError::UnknownNode(id))?;
        update(&mut self.nodes[slot]);
        Ok(())
    }

    fn is_visible(&self, node: &Node) -> bool {
        self.level.map_or(true, |level| node.level <= level)
    }

    /// Rebuilds the active subgraph and resets alpha.
    fn reseed(&mut self) {
        self.active = (0..self.nodes.len())
            .filter(|&i| self.is_visible(&self.nodes[i]))
            .collect();

        self.links.clear();
        self.degrees = vec![0; self.nodes.len()];
        let mut dangling = 0;
        for (i, link) in self.all_links.iter().enumerate() {
            let source = self.index.get(&link.source).copied();
            let target = self.index.get(&link.target).copied();
            let (Some(source), Some(target)) = (source, target) else {
                dangling += 1;
                continue;
            };
            if source == target
                || !self.is_visible(&self.nodes[source])
                || !self.is_visible(&self.nodes[target])
            {
                continue;
            }
            self.degrees[source] += 1;
            self.degrees[target] += 1;
            self.links.push(ResolvedLink {
                link: i,
                source,
                target,
            });
        }
        if dangling > 0 {
            warn!("{0} links refer to unknown nodes and are skipped", dangling);
        }

        match self.parameters.as_ref().map(|p| p.alpha) {
            Some(alpha) => {
                self.alpha = alpha;
                self.state = EngineState::Seeded;
                self.place_unplaced();
            }
            None => self.alpha = 0.0,
        }
        info!(
            "Seeded {0} of {1} nodes and {2} links",
            self.active.len(),
            self.nodes.len(),
            self.links.len()
        );
    }

    /// Gives every active node without a position a random one near the
    /// canvas center.
    fn place_unplaced(&mut self) {
        let Some(parameters) = &self.parameters else {
            return;
        };
        let center = parameters.center();
        let spread = parameters.width.min(parameters.height) * PLACEMENT_SPREAD;
        for &i in &self.active {
            if self.nodes[i].is_placed() {
                continue;
            }
            let offset = Vec2::new(
                self.rng.gen_range(-1.0..=1.0),
                self.rng.gen_range(-1.0..=1.0),
            ) * spread;
            self.nodes[i].place(center + offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RedrawFlag;
    use std::sync::Arc;

    fn engine_with(listener: &Arc<RedrawFlag>) -> ForceEngine {
        let listener: Arc<dyn SimulationListener> = listener.clone();
        ForceEngine::new(Arc::downgrade(&listener))
    }

    fn detached() -> ForceEngine {
        ForceEngine::new(crate::listener::detached())
    }

    fn parameters() -> SimulationParameters {
        SimulationParameters::new().size(800.0, 600.0).seed(7)
    }

    fn line(n: u64) -> (Vec<Node>, Vec<Link>) {
        let nodes = (0..n)
            .map(|i| Node::new(i).with_position(Vec2::new(100.0 + 30.0 * i as f32, 300.0)))
            .collect();
        let links = (1..n).map(|i| Link::new(i - 1, i)).collect();
        (nodes, links)
    }

    #[test]
    fn lifecycle_transitions() {
        let mut engine = detached();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(matches!(engine.start(), Err(SimulationError::NotConfigured)));

        engine.configure(parameters()).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);

        let (nodes, links) = line(3);
        engine.set_data(nodes, links);
        assert_eq!(engine.state(), EngineState::Seeded);
        assert_eq!(engine.alpha(), 0.2);
        assert_eq!(engine.step(), TickStatus::Idle);

        engine.start().unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.step(), TickStatus::Continue);

        engine.stop();
        assert!(engine.is_stopped());
        assert!(engine.start().is_ok());
        assert!(engine.is_stopped());
        assert!(!engine.resume());
    }

    #[test]
    fn invalid_configuration_keeps_engine_unconfigured() {
        let mut engine = detached();
        let result = engine.configure(parameters().theta(2.0));
        assert!(matches!(result, Err(SimulationError::InvalidTheta(_))));
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.parameters().is_none());
    }

    #[test]
    fn alpha_decreases_until_settled() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        let (nodes, links) = line(4);
        engine.set_data(nodes, links);
        engine.start().unwrap();

        let mut previous = engine.alpha();
        let mut ticks = 0;
        loop {
            let status = engine.step();
            ticks += 1;
            assert!(engine.alpha() < previous);
            if status == TickStatus::Settled {
                assert!(engine.alpha() < 0.005);
                assert!(previous >= 0.005);
                break;
            }
            assert_eq!(status, TickStatus::Continue);
            assert!(engine.alpha() >= 0.005);
            previous = engine.alpha();
        }
        assert!(engine.is_settled());
        assert!(ticks < 1000);
        assert_eq!(engine.step(), TickStatus::Idle);
    }

    #[test]
    fn one_redraw_per_running_tick() {
        let flag = Arc::new(RedrawFlag::default());
        let mut engine = engine_with(&flag);
        engine.configure(parameters().alpha(0.01).resume_alpha(0.01)).unwrap();
        let (nodes, links) = line(2);
        engine.set_data(nodes, links);
        engine.start().unwrap();

        let mut ticks = 0;
        while engine.tick() == TickStatus::Continue {
            ticks += 1;
        }
        // The settling tick does not request a redraw.
        assert_eq!(flag.requests(), ticks);
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn pinned_node_stays_on_pin() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        let (nodes, links) = line(5);
        engine.set_data(nodes, links);
        engine.start().unwrap();

        let pin = Vec2::new(123.5, 456.25);
        engine.pin(NodeId(2), pin).unwrap();
        for _ in 0..20 {
            engine.step();
            assert_eq!(engine.node(NodeId(2)).unwrap().position, pin);
        }
        engine.unpin(NodeId(2)).unwrap();
        engine.step();
        assert_ne!(engine.node(NodeId(2)).unwrap().position, pin);
    }

    #[test]
    fn friction_stops_an_isolated_node() {
        let mut engine = detached();
        engine
            .configure(parameters().charge(0.0).gravity(0.0).friction(0.8))
            .unwrap();
        let nodes = vec![
            Node::new(0u64).with_position(Vec2::new(100.0, 100.0)),
            Node::new(1u64).with_position(Vec2::new(700.0, 500.0)),
            Node::new(2u64)
                .with_position(Vec2::new(400.0, 300.0))
                .with_velocity(Vec2::new(30.0, -20.0)),
        ];
        engine.set_data(nodes, vec![]);
        engine.pin(NodeId(0), Vec2::new(100.0, 100.0)).unwrap();
        engine.pin(NodeId(1), Vec2::new(700.0, 500.0)).unwrap();
        engine.start().unwrap();

        let mut ticks = 0;
        while engine.node(NodeId(2)).unwrap().velocity.length() > 1e-3 {
            assert_eq!(engine.step(), TickStatus::Continue);
            ticks += 1;
        }
        assert!(ticks < 100);
    }

    #[test]
    fn same_level_twice_does_not_reset() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        let nodes = vec![
            Node::new(0u64).with_level(0),
            Node::new(1u64).with_level(1),
            Node::new(2u64).with_level(2),
        ];
        engine.set_data(nodes, vec![Link::new(0u64, 1u64), Link::new(1u64, 2u64)]);

        assert!(engine.set_current_level(1));
        assert_eq!(engine.current_level(), Some(1));
        assert_eq!(engine.nodes().count(), 2);
        assert_eq!(engine.links().count(), 1);
        assert!(engine.is_running());

        for _ in 0..10 {
            engine.step();
        }
        let alpha = engine.alpha();
        let positions: Vec<Vec2> = engine.nodes().map(|n| n.position).collect();

        assert!(!engine.set_current_level(1));
        assert_eq!(engine.alpha(), alpha);
        let unchanged: Vec<Vec2> = engine.nodes().map(|n| n.position).collect();
        assert_eq!(positions, unchanged);
    }

    #[test]
    fn level_switch_resets_alpha_and_keeps_placed_nodes() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        engine.set_data(
            vec![
                Node::new(0u64).with_position(Vec2::new(10.0, 10.0)),
                Node::new(1u64).with_level(3),
            ],
            vec![],
        );
        engine.set_current_level(0);
        assert!(engine.node(NodeId(1)).is_none());
        for _ in 0..5 {
            engine.step();
        }
        assert!(engine.alpha() < 0.2);
        let settled_position = engine.node(NodeId(0)).unwrap().position;

        engine.set_current_level(3);
        assert_eq!(engine.alpha(), 0.2);
        assert_eq!(engine.node(NodeId(0)).unwrap().position, settled_position);
        assert_eq!(engine.all_nodes().len(), 2);
        let newcomer = engine.node(NodeId(1)).unwrap();
        assert!(newcomer.is_placed());
        assert!(newcomer.position.distance(Vec2::new(400.0, 300.0)) <= 150.0 * 2f32.sqrt());
    }

    #[test]
    fn level_switch_releases_drags() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        engine.set_data(
            vec![
                Node::new(0u64).with_position(Vec2::new(300.0, 300.0)),
                Node::new(1u64)
                    .with_position(Vec2::new(400.0, 300.0))
                    .with_level(1),
            ],
            vec![Link::new(0u64, 1u64)],
        );
        engine.set_current_level(1);
        engine.drag_start(NodeId(1)).unwrap();
        engine.drag_to(NodeId(1), Vec2::new(10.0, 10.0)).unwrap();
        engine.pin(NodeId(0), Vec2::new(300.0, 300.0)).unwrap();

        engine.set_current_level(0);
        assert!(matches!(
            engine.drag_end(NodeId(1)),
            Err(SimulationError::UnknownNode(NodeId(1)))
        ));
        assert!(!engine.node(NodeId(0)).unwrap().is_pinned());

        engine.set_current_level(1);
        let node = engine.node(NodeId(1)).unwrap();
        assert!(!node.is_pinned());
        assert_eq!(node.drag_state, DragState::Idle);
        for _ in 0..50 {
            engine.step();
        }
        assert_ne!(engine.node(NodeId(1)).unwrap().position, Vec2::new(10.0, 10.0));
    }

    #[test]
    fn set_velocity_pushes_an_active_node() {
        let mut engine = detached();
        engine
            .configure(parameters().charge(0.0).gravity(0.0))
            .unwrap();
        engine.set_data(
            vec![Node::new(0u64).with_position(Vec2::new(100.0, 100.0))],
            vec![],
        );
        engine.start().unwrap();
        engine.set_velocity(NodeId(0), Vec2::new(10.0, 0.0)).unwrap();
        engine.step();
        assert_eq!(engine.node(NodeId(0)).unwrap().position, Vec2::new(108.0, 100.0));

        assert!(matches!(
            engine.set_velocity(NodeId(0), Vec2::new(f32::NAN, 0.0)),
            Err(SimulationError::InvalidParameter { name: "velocity", .. })
        ));
        assert!(matches!(
            engine.set_velocity(NodeId(5), Vec2::ZERO),
            Err(SimulationError::UnknownNode(NodeId(5)))
        ));
    }

    #[test]
    fn resume_does_not_fully_reheat() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        let (nodes, links) = line(3);
        engine.set_data(nodes, links);
        engine.start().unwrap();
        while engine.step() != TickStatus::Settled {}

        assert!(engine.resume());
        assert!(engine.is_running());
        assert_eq!(engine.alpha(), 0.05);

        // Resuming while hot leaves alpha alone.
        engine.start().unwrap();
        engine.step();
        let alpha = engine.alpha();
        engine.resume();
        assert_eq!(engine.alpha(), alpha);
    }

    #[test]
    fn drag_pins_and_resumes() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        let (nodes, links) = line(3);
        engine.set_data(nodes, links);
        engine.start().unwrap();
        while engine.step() != TickStatus::Settled {}

        engine.drag_start(NodeId(1)).unwrap();
        assert_eq!(engine.node(NodeId(1)).unwrap().drag_state, DragState::DragStart);
        assert!(engine.is_settled());

        let target = Vec2::new(600.0, 100.0);
        engine.drag_to(NodeId(1), target).unwrap();
        assert!(engine.is_running());
        let before = engine.node(NodeId(0)).unwrap().position;
        engine.step();
        assert_eq!(engine.node(NodeId(1)).unwrap().position, target);
        assert_ne!(engine.node(NodeId(0)).unwrap().position, before);

        engine.drag_end(NodeId(1)).unwrap();
        let node = engine.node(NodeId(1)).unwrap();
        assert!(!node.is_pinned());
        assert_eq!(node.drag_state, DragState::DragEnd);

        assert!(matches!(
            engine.drag_start(NodeId(99)),
            Err(SimulationError::UnknownNode(NodeId(99)))
        ));
    }

    #[test]
    fn dangling_links_are_skipped() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        engine.set_data(
            vec![
                Node::new(0u64).with_position(Vec2::new(100.0, 100.0)),
                Node::new(1u64).with_position(Vec2::new(200.0, 100.0)),
            ],
            vec![
                Link::new(0u64, 1u64),
                Link::new(0u64, 42u64),
                Link::new(7u64, 1u64),
                Link::new(1u64, 1u64),
            ],
        );
        assert_eq!(engine.links().count(), 1);
        engine.start().unwrap();
        for _ in 0..50 {
            engine.step();
        }
        assert!(engine.nodes().all(|n| n.position.is_finite()));
    }

    #[test]
    fn stopped_engine_ignores_ticks() {
        let flag = Arc::new(RedrawFlag::default());
        let mut engine = engine_with(&flag);
        engine.configure(parameters()).unwrap();
        let (nodes, links) = line(3);
        engine.set_data(nodes, links);
        engine.start().unwrap();
        engine.tick();
        engine.stop();
        flag.take();

        let alpha = engine.alpha();
        let positions: Vec<Vec2> = engine.nodes().map(|n| n.position).collect();
        let requests = flag.requests();
        for _ in 0..10 {
            assert_eq!(engine.tick(), TickStatus::Stopped);
        }
        assert_eq!(engine.alpha(), alpha);
        assert_eq!(engine.nodes().map(|n| n.position).collect::<Vec<_>>(), positions);
        assert_eq!(flag.requests(), requests);
        assert!(!flag.take());
    }

    #[test]
    fn neighbors_lists_both_directions() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        engine.set_data(
            (0..4u64).map(Node::new).collect(),
            vec![
                Link::new(0u64, 1u64),
                Link::new(2u64, 0u64),
                Link::new(1u64, 3u64),
                Link::new(0u64, 2u64),
            ],
        );
        let neighborhood = engine.neighbors(NodeId(0)).unwrap();
        assert_eq!(neighborhood.nodes, vec![NodeId(1), NodeId(2)]);
        assert_eq!(neighborhood.outgoing, vec![0, 3]);
        assert_eq!(neighborhood.incoming, vec![1]);
        assert!(engine.neighbors(NodeId(9)).is_none());
    }

    #[test]
    fn events_update_parameters() {
        let mut engine = detached();
        assert!(matches!(
            engine.apply(SimulatorEvent::ChargeUpdated(-10.0)),
            Err(SimulationError::NotConfigured)
        ));
        engine.configure(parameters()).unwrap();
        engine.apply(SimulatorEvent::ChargeUpdated(-10.0)).unwrap();
        engine.apply(SimulatorEvent::ThetaUpdated(0.5)).unwrap();
        assert!(matches!(
            engine.apply(SimulatorEvent::FrictionUpdated(3.0)),
            Err(SimulationError::InvalidFriction(_))
        ));
        let parameters = engine.parameters().unwrap();
        assert_eq!(parameters.charge, -10.0);
        assert_eq!(parameters.theta, 0.5);
        assert_eq!(parameters.friction, 0.8);
    }

    #[test]
    fn hit_test_finds_node_under_point() {
        let mut engine = detached();
        engine.configure(parameters()).unwrap();
        engine.set_data(
            vec![Node::new(5u64).with_position(Vec2::new(50.0, 50.0))],
            vec![],
        );
        assert_eq!(engine.get_node(Vec2::new(110.0, 100.0), 2.0).map(|n| n.id), Some(NodeId(5)));
        assert!(engine.get_node(Vec2::new(110.0, 100.0), 1.0).is_none());
    }
}
