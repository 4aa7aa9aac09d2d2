//! Errors reported by the simulator.

use crate::simulator::components::nodes::NodeId;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("canvas size must be positive and finite, got {width}x{height}")]
    InvalidCanvasSize { width: f32, height: f32 },

    #[error("theta must be in (0, 1], got {0}")]
    InvalidTheta(f32),

    #[error("friction must be in [0, 1], got {0}")]
    InvalidFriction(f32),

    #[error("{name} must be {expected}, got {value}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
        value: f32,
    },

    #[error("tick interval must be greater than zero, got {0:?}")]
    InvalidTickInterval(Duration),

    #[error("simulation has not been configured")]
    NotConfigured,

    #[error("node {0} is not part of the active graph")]
    UnknownNode(NodeId),

    #[error("failed to spawn the tick thread")]
    Spawn(#[from] std::io::Error),
}
