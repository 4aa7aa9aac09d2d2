//! Force directed graph layout that keeps running while it is dragged around.
//!
//! A [`ForceEngine`](simulator::ForceEngine) advances the layout one tick at a
//! time: Barnes-Hut repulsion over a [`QuadTree`](quadtree::QuadTree), springs
//! along links, gravity towards the canvas center. A
//! [`Simulation`](simulation::Simulation) runs the engine on its own thread and
//! tells a [`SimulationListener`](listener::SimulationListener) when to redraw.
//!
//! # Example
//! ```no_run
//! use forcesim::prelude::*;
//! use petgraph::Directed;
//! use std::sync::Arc;
//!
//! let mut rng = rand::thread_rng();
//! let graph: petgraph::Graph<(), (), Directed> =
//!     petgraph_gen::barabasi_albert_graph(&mut rng, 1000, 1, None);
//!
//! let redraw = Arc::new(RedrawFlag::new());
//! let listener: Arc<dyn SimulationListener> = redraw.clone();
//! let simulation = Simulation::new(Arc::downgrade(&listener));
//! simulation
//!     .configure(SimulationParameters::new().size(1920.0, 1080.0))
//!     .unwrap();
//! simulation.set_graph(GraphData::from(&graph)).unwrap();
//!
//! loop {
//!     if redraw.take() {
//!         let snapshot = simulation.snapshot();
//!         // draw snapshot.nodes and snapshot.links
//!     }
//! }
//! ```

pub mod error;
pub mod graph_data;
pub mod listener;
pub mod quadtree;
pub mod scheduler;
pub mod simulation;
pub mod simulator;

pub mod prelude {
    pub use crate::error::SimulationError;
    pub use crate::graph_data::GraphData;
    pub use crate::listener::{RedrawFlag, SimulationListener};
    pub use crate::scheduler::{TickScheduler, TickStatus, Ticker};
    pub use crate::simulation::{LinkView, NodeView, Simulation, Snapshot};
    pub use crate::simulator::components::links::Link;
    pub use crate::simulator::components::nodes::{DragState, Node, NodeId};
    pub use crate::simulator::ressources::events::SimulatorEvent;
    pub use crate::simulator::ressources::simulator_vars::SimulationParameters;
    pub use crate::simulator::systems::position_compute::{
        DragGesture, GestureEnd, ViewTransform,
    };
    pub use crate::simulator::{EngineState, ForceEngine, Neighborhood};
    pub use glam::Vec2;
}
