//! Parameters used by the graph simulator.

use crate::error::SimulationError;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters of a simulation.
///
/// Setters can be chained:
///
/// ```
/// use forcesim::prelude::SimulationParameters;
///
/// let parameters = SimulationParameters::new()
///     .size(800.0, 600.0)
///     .charge(-200.0)
///     .theta(0.5);
/// assert!(parameters.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub width: f32,
    pub height: f32,
    pub strength: f32,
    pub friction: f32,
    pub link_distance: f32,
    pub charge: f32,
    pub gravity: f32,
    pub theta: f32,
    pub alpha: f32,
    pub cooling: f32,
    pub alpha_min: f32,
    pub resume_alpha: f32,
    pub tick_interval: Duration,
    pub seed: Option<u64>,
}

impl SimulationParameters {
    /// Get a instance of `SimulationParameters` with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the canvas. Gravity pulls towards its center.
    ///
    /// Default: `1280.0 x 720.0`
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// How strong the spring force of links should be.
    ///
    /// Default: `0.7`
    pub fn strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Fraction of velocity kept after every tick.
    ///
    /// `1.0` -> No damping
    ///
    /// `0.0` -> No movement
    ///
    /// Default: `0.8`
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Length of a link in neutral position.
    ///
    /// If a link is shorter it pushes apart.
    /// If a link is longer it pulls together.
    ///
    /// Default: `150.0`
    pub fn link_distance(mut self, distance: f32) -> Self {
        self.link_distance = distance;
        self
    }

    /// How strong nodes should push others away. Negative values repel.
    ///
    /// Default: `-320.0`
    pub fn charge(mut self, charge: f32) -> Self {
        self.charge = charge;
        self
    }

    /// How strong the pull to the canvas center should be.
    ///
    /// Default: `0.1`
    pub fn gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// How accurate the repel force calculations should be.
    /// Higher numbers result in more approximations but faster calculations.
    ///
    /// Value must be in `(0.0, 1.0]`.
    ///
    /// Default: `0.8`
    pub fn theta(mut self, theta: f32) -> Self {
        self.theta = theta;
        self
    }

    /// Temperature the simulation starts with.
    ///
    /// Default: `0.2`
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Factor alpha is multiplied with every tick.
    ///
    /// Default: `0.99`
    pub fn cooling(mut self, cooling: f32) -> Self {
        self.cooling = cooling;
        self
    }

    /// The simulation settles once alpha drops below this value.
    ///
    /// Default: `0.005`
    pub fn alpha_min(mut self, alpha_min: f32) -> Self {
        self.alpha_min = alpha_min;
        self
    }

    /// Alpha restored when a settled simulation is resumed, e.g. by a drag.
    /// Alpha is never lowered by a resume.
    ///
    /// Default: `0.05`
    pub fn resume_alpha(mut self, resume_alpha: f32) -> Self {
        self.resume_alpha = resume_alpha;
        self
    }

    /// Time between two ticks.
    ///
    /// Default: `16ms`
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Seed for the placement of nodes without a position.
    /// Without a seed placement is random.
    ///
    /// Default: `None`
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width, self.height) / 2.0
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(SimulationError::InvalidCanvasSize {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(SimulationError::InvalidTheta(self.theta));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(SimulationError::InvalidFriction(self.friction));
        }

        non_negative("strength", self.strength)?;
        non_negative("link distance", self.link_distance)?;
        non_negative("gravity", self.gravity)?;
        if !self.charge.is_finite() {
            return Err(invalid("charge", "finite", self.charge));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(invalid("alpha", "positive and finite", self.alpha));
        }
        if !(self.cooling > 0.0 && self.cooling < 1.0) {
            return Err(invalid("cooling", "in (0, 1)", self.cooling));
        }
        if !(self.alpha_min > 0.0 && self.alpha_min < self.alpha) {
            return Err(invalid("alpha min", "in (0, alpha)", self.alpha_min));
        }
        if !(self.resume_alpha > self.alpha_min && self.resume_alpha <= self.alpha) {
            return Err(invalid(
                "resume alpha",
                "in (alpha min, alpha]",
                self.resume_alpha,
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(SimulationError::InvalidTickInterval(self.tick_interval));
        }
        Ok(())
    }
}

impl Default for SimulationParameters {
    /// Get a instance of `SimulationParameters` with default values
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            strength: 0.7,
            friction: 0.8,
            link_distance: 150.0,
            charge: -320.0,
            gravity: 0.1,
            theta: 0.8,
            alpha: 0.2,
            cooling: 0.99,
            alpha_min: 0.005,
            resume_alpha: 0.05,
            tick_interval: Duration::from_millis(16),
            seed: None,
        }
    }
}

fn invalid(name: &'static str, expected: &'static str, value: f32) -> SimulationError {
    SimulationError::InvalidParameter {
        name,
        expected,
        value,
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), SimulationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, "finite and not negative", value))
    }
}
