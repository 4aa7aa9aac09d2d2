//! The handle a host view keeps: an engine shared with its tick thread.

use crate::{
    error::SimulationError,
    graph_data::GraphData,
    listener::SimulationListener,
    scheduler::{TickScheduler, TickStatus, Ticker},
    simulator::{
        components::{
            links::Link,
            nodes::{DragState, Node, NodeId},
        },
        ressources::{events::SimulatorEvent, simulator_vars::SimulationParameters},
        systems::position_compute::ViewTransform,
        EngineState, ForceEngine, Neighborhood,
    },
};
use glam::Vec2;
use log::debug;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Position and state of a node at the time of a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub position: Vec2,
    pub radius: f32,
    pub level: u32,
    pub pinned: bool,
    pub drag_state: DragState,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkView {
    pub source: NodeId,
    pub target: NodeId,
    pub source_position: Vec2,
    pub target_position: Vec2,
}

/// Consistent copy of the active graph, taken between two ticks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub alpha: f32,
    pub state: EngineState,
}

/// Ticks the shared engine. Holds the lock for the tick only and notifies
/// the listener after releasing it.
struct EngineTicker {
    engine: Arc<Mutex<ForceEngine>>,
}

impl Ticker for EngineTicker {
    fn tick(&mut self) -> TickStatus {
        let (status, listener) = {
            let mut engine = lock(&self.engine);
            (engine.step(), engine.listener())
        };
        if status.needs_redraw() {
            if let Some(listener) = listener.upgrade() {
                listener.redraw_requested();
            }
        }
        status
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A force directed layout running on its own thread.
///
/// All methods take `&self` and may be called from any thread, including
/// while a tick is running. Dropping the simulation stops it.
///
/// ```
/// use forcesim::prelude::*;
/// use std::sync::Arc;
///
/// let flag = Arc::new(RedrawFlag::new());
/// let listener: Arc<dyn SimulationListener> = flag.clone();
/// let simulation = Simulation::new(Arc::downgrade(&listener));
///
/// simulation.configure(SimulationParameters::new().size(800.0, 600.0)).unwrap();
/// simulation
///     .set_data(
///         vec![Node::new(0u64), Node::new(1u64)],
///         vec![Link::new(0u64, 1u64)],
///     )
///     .unwrap();
/// assert!(simulation.state() == EngineState::Running);
///
/// simulation.stop();
/// assert!(simulation.state() == EngineState::Stopped);
/// ```
pub struct Simulation {
    engine: Arc<Mutex<ForceEngine>>,
    scheduler: Mutex<Option<TickScheduler>>,
    view: Mutex<ViewTransform>,
}

impl Simulation {
    pub fn new(listener: Weak<dyn SimulationListener>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(ForceEngine::new(listener))),
            scheduler: Mutex::new(None),
            view: Mutex::new(ViewTransform::default()),
        }
    }

    /// Applies `parameters`. The tick interval is read when the tick thread
    /// is first started.
    pub fn configure(&self, parameters: SimulationParameters) -> Result<(), SimulationError> {
        lock(&self.engine).configure(parameters)
    }

    pub fn parameters(&self) -> Option<SimulationParameters> {
        lock(&self.engine).parameters().cloned()
    }

    /// Replaces the graph and starts simulating it if already configured.
    pub fn set_data(&self, nodes: Vec<Node>, links: Vec<Link>) -> Result<(), SimulationError> {
        let configured = {
            let mut engine = lock(&self.engine);
            engine.set_data(nodes, links);
            engine.parameters().is_some()
        };
        if configured {
            self.start()?;
        }
        Ok(())
    }

    pub fn set_graph(&self, graph: GraphData) -> Result<(), SimulationError> {
        self.set_data(graph.nodes, graph.links)
    }

    /// Restarts the simulation at full alpha and makes sure it is ticking.
    pub fn start(&self) -> Result<(), SimulationError> {
        let interval = {
            let mut engine = lock(&self.engine);
            engine.start()?;
            if !engine.is_running() {
                return Ok(());
            }
            engine
                .parameters()
                .map(|p| p.tick_interval)
                .ok_or(SimulationError::NotConfigured)?
        };

        let mut scheduler = lock(&self.scheduler);
        if let Some(running) = scheduler.as_ref() {
            running.resume();
        } else {
            let ticker = EngineTicker {
                engine: self.engine.clone(),
            };
            *scheduler = Some(TickScheduler::start(ticker, interval)?);
        }
        Ok(())
    }

    /// Continues a settled or paused simulation without fully reheating it.
    pub fn resume(&self) -> bool {
        let running = lock(&self.engine).resume();
        if running {
            self.wake();
        }
        running
    }

    /// Suspends ticking. The engine keeps its state.
    pub fn pause(&self) {
        if let Some(scheduler) = lock(&self.scheduler).as_ref() {
            debug!("Tick thread paused");
            scheduler.pause();
        }
    }

    /// Stops the simulation for good. No tick is delivered after this returns.
    pub fn stop(&self) {
        lock(&self.engine).stop();
        let scheduler = lock(&self.scheduler).take();
        if let Some(scheduler) = scheduler {
            scheduler.stop();
        }
    }

    pub fn state(&self) -> EngineState {
        lock(&self.engine).state()
    }

    pub fn alpha(&self) -> f32 {
        lock(&self.engine).alpha()
    }

    pub fn current_level(&self) -> Option<u32> {
        lock(&self.engine).current_level()
    }

    /// Switches to `level`, resetting the view and restarting the layout.
    /// Does nothing if `level` is already current.
    pub fn set_current_level(&self, level: u32) -> Result<bool, SimulationError> {
        let switched = lock(&self.engine).set_current_level(level);
        if switched {
            lock(&self.view).reset();
            if lock(&self.engine).is_running() {
                self.start_scheduler_or_wake()?;
            }
        }
        Ok(switched)
    }

    pub fn drag_start(&self, id: NodeId) -> Result<(), SimulationError> {
        lock(&self.engine).drag_start(id)
    }

    /// Moves a dragged node to `position` in simulation space.
    pub fn drag_to(&self, id: NodeId, position: Vec2) -> Result<(), SimulationError> {
        lock(&self.engine).drag_to(id, position)?;
        self.wake();
        Ok(())
    }

    pub fn drag_end(&self, id: NodeId) -> Result<(), SimulationError> {
        lock(&self.engine).drag_end(id)
    }

    /// Applies an event from the interaction layer.
    pub fn dispatch(&self, event: SimulatorEvent) -> Result<(), SimulationError> {
        let wake = matches!(event, SimulatorEvent::Dragged(..));
        lock(&self.engine).apply(event)?;
        if wake {
            self.wake();
        }
        Ok(())
    }

    /// Hit-test with a point already translated into the view.
    pub fn node_at(&self, point: Vec2, scale: f32) -> Option<NodeId> {
        lock(&self.engine).get_node(point, scale).map(|n| n.id)
    }

    /// Hit-test with a screen point, through the current view transform.
    pub fn node_at_screen(&self, point: Vec2) -> Option<NodeId> {
        let view = self.view();
        self.node_at(point - view.translate, view.scale)
    }

    pub fn view(&self) -> ViewTransform {
        *lock(&self.view)
    }

    pub fn pan(&self, delta: Vec2) {
        lock(&self.view).pan(delta);
    }

    pub fn zoom(&self, factor: f32, focus: Vec2) {
        lock(&self.view).zoom(factor, focus);
    }

    pub fn neighbors(&self, id: NodeId) -> Option<Neighborhood> {
        lock(&self.engine).neighbors(id)
    }

    pub fn snapshot(&self) -> Snapshot {
        let engine = lock(&self.engine);
        Snapshot {
            nodes: engine
                .nodes()
                .map(|node| NodeView {
                    id: node.id,
                    position: node.position,
                    radius: node.radius,
                    level: node.level,
                    pinned: node.is_pinned(),
                    drag_state: node.drag_state,
                })
                .collect(),
            links: engine
                .link_endpoints()
                .map(|(_, source, target)| LinkView {
                    source: source.id,
                    target: target.id,
                    source_position: source.position,
                    target_position: target.position,
                })
                .collect(),
            alpha: engine.alpha(),
            state: engine.state(),
        }
    }

    /// Runs `f` with exclusive access to the engine. Ticks wait meanwhile.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut ForceEngine) -> R) -> R {
        f(&mut lock(&self.engine))
    }

    fn wake(&self) {
        if let Some(scheduler) = lock(&self.scheduler).as_ref() {
            scheduler.resume();
        }
    }

    fn start_scheduler_or_wake(&self) -> Result<(), SimulationError> {
        if lock(&self.scheduler).is_some() {
            self.wake();
            Ok(())
        } else {
            self.start()
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{detached, RedrawFlag};
    use std::thread;
    use std::time::{Duration, Instant};

    fn parameters() -> SimulationParameters {
        SimulationParameters::new()
            .size(400.0, 400.0)
            .tick_interval(Duration::from_millis(1))
            .seed(3)
    }

    fn graph() -> (Vec<Node>, Vec<Link>) {
        (
            vec![
                Node::new(0u64).with_position(Vec2::new(150.0, 200.0)),
                Node::new(1u64).with_position(Vec2::new(250.0, 200.0)),
                Node::new(2u64).with_position(Vec2::new(200.0, 120.0)).with_level(1),
            ],
            vec![Link::new(0u64, 1u64), Link::new(1u64, 2u64)],
        )
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn data_before_configuration_waits() {
        let simulation = Simulation::new(detached());
        let (nodes, links) = graph();
        simulation.set_data(nodes, links).unwrap();
        assert_eq!(simulation.state(), EngineState::Uninitialized);
        assert!(matches!(simulation.start(), Err(SimulationError::NotConfigured)));

        simulation.configure(parameters()).unwrap();
        assert_eq!(simulation.state(), EngineState::Seeded);
        simulation.start().unwrap();
        assert!(wait_for(|| simulation.state() == EngineState::Settled));
    }

    #[test]
    fn settles_and_notifies() {
        let flag = Arc::new(RedrawFlag::new());
        let listener: Arc<dyn SimulationListener> = flag.clone();
        let simulation = Simulation::new(Arc::downgrade(&listener));
        simulation.configure(parameters()).unwrap();
        let (nodes, links) = graph();
        simulation.set_data(nodes, links).unwrap();

        assert!(wait_for(|| simulation.state() == EngineState::Settled));
        assert!(flag.requests() > 0);
        assert!(simulation.alpha() < 0.005);

        let snapshot = simulation.snapshot();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.links.len(), 2);
        assert_eq!(snapshot.state, EngineState::Settled);
        assert!(snapshot.nodes.iter().all(|n| n.position.is_finite()));
    }

    #[test]
    fn drag_wakes_a_settled_simulation() {
        let simulation = Simulation::new(detached());
        simulation.configure(parameters()).unwrap();
        let (nodes, links) = graph();
        simulation.set_data(nodes, links).unwrap();
        assert!(wait_for(|| simulation.state() == EngineState::Settled));

        let target = Vec2::new(50.0, 50.0);
        simulation.drag_start(NodeId(0)).unwrap();
        simulation.drag_to(NodeId(0), target).unwrap();
        let before = simulation.snapshot();
        assert!(wait_for(|| {
            let snapshot = simulation.snapshot();
            snapshot.nodes[1].position != before.nodes[1].position
        }));
        assert_eq!(simulation.snapshot().nodes[0].position, target);
        assert!(simulation.snapshot().nodes[0].pinned);

        simulation.drag_end(NodeId(0)).unwrap();
        assert!(!simulation.snapshot().nodes[0].pinned);
        assert!(wait_for(|| simulation.state() == EngineState::Settled));
    }

    #[test]
    fn level_switch_resets_the_view() {
        let simulation = Simulation::new(detached());
        simulation.configure(parameters()).unwrap();
        let (nodes, links) = graph();
        simulation.set_data(nodes, links).unwrap();
        simulation.pan(Vec2::new(30.0, 30.0));
        simulation.zoom(2.0, Vec2::ZERO);

        assert!(simulation.set_current_level(0).unwrap());
        assert_eq!(simulation.view(), ViewTransform::default());
        assert_eq!(simulation.current_level(), Some(0));
        assert_eq!(simulation.snapshot().nodes.len(), 2);

        simulation.pan(Vec2::new(5.0, 0.0));
        assert!(!simulation.set_current_level(0).unwrap());
        assert_eq!(simulation.view().translate, Vec2::new(5.0, 0.0));
    }

    #[test]
    fn hit_test_through_view() {
        let simulation = Simulation::new(detached());
        // A lone node without gravity stays where it is.
        simulation.configure(parameters().gravity(0.0)).unwrap();
        simulation
            .set_data(vec![Node::new(4u64).with_position(Vec2::new(100.0, 100.0))], vec![])
            .unwrap();
        simulation.pause();
        assert_eq!(
            simulation.with_engine(|engine| engine.node(NodeId(4)).map(|n| n.position)),
            Some(Vec2::new(100.0, 100.0))
        );

        simulation.pan(Vec2::new(10.0, 20.0));
        simulation.zoom(2.0, Vec2::new(10.0, 20.0));
        assert_eq!(simulation.node_at_screen(Vec2::new(210.0, 220.0)), Some(NodeId(4)));
        assert_eq!(simulation.node_at_screen(Vec2::new(110.0, 120.0)), None);
        assert_eq!(simulation.node_at(Vec2::new(200.0, 200.0), 2.0), Some(NodeId(4)));
    }

    #[test]
    fn stop_is_final() {
        let flag = Arc::new(RedrawFlag::new());
        let listener: Arc<dyn SimulationListener> = flag.clone();
        let simulation = Simulation::new(Arc::downgrade(&listener));
        simulation.configure(parameters().alpha(1.0).cooling(0.999)).unwrap();
        let (nodes, links) = graph();
        simulation.set_data(nodes, links).unwrap();
        assert!(wait_for(|| flag.requests() > 3));

        simulation.stop();
        simulation.stop();
        let requests = flag.requests();
        let snapshot = simulation.snapshot();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(flag.requests(), requests);
        assert_eq!(simulation.snapshot(), snapshot);

        assert!(simulation.start().is_ok());
        assert!(!simulation.resume());
        assert!(simulation.drag_to(NodeId(0), Vec2::ZERO).is_ok());
        assert_eq!(simulation.snapshot(), snapshot);
        assert_eq!(simulation.state(), EngineState::Stopped);
    }

    #[test]
    fn dispatch_validates_parameters() {
        let simulation = Simulation::new(detached());
        simulation.configure(parameters()).unwrap();
        simulation.dispatch(SimulatorEvent::GravityUpdated(0.5)).unwrap();
        assert!(simulation
            .dispatch(SimulatorEvent::CanvasResized {
                width: 0.0,
                height: 10.0
            })
            .is_err());
        let parameters = simulation.parameters().unwrap();
        assert_eq!(parameters.gravity, 0.5);
        assert_eq!(parameters.width, 400.0);
    }
}
