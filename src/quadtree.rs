//! Barnes-Hut quadtree used to approximate the repel force between nodes.
//!
//! The tree is rebuilt from scratch every tick. Quadrants live in a flat arena
//! and refer to their children by index, so a tree is a plain owned value with
//! no shared state between ticks.

use glam::Vec2;

/// Subdivision stops at this depth. Deeper leaves hold every body routed to them.
const MAX_DEPTH: usize = 24;

/// Subdivision also stops once a quadrant gets this narrow.
const MIN_CELL_SIZE: f32 = 1e-3;

/// Distances are floored to this value so coincident bodies can not produce
/// unbounded forces.
pub const MIN_DISTANCE: f32 = 1.0;

/// Used to spread separation axes of coincident bodies around the circle.
const GOLDEN_ANGLE: f32 = 2.399_963;

/// An axis aligned rectangle described by its center and extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox2D {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox2D {
    pub fn new(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
        }
    }

    /// The smallest square containing all `points`, padded slightly so that no
    /// point sits on the upper boundary.
    ///
    /// Returns `None` when `points` is empty.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut min = Vec2::INFINITY;
        let mut max = Vec2::NEG_INFINITY;
        let mut any = false;
        for point in points {
            min = min.min(point);
            max = max.max(point);
            any = true;
        }
        if !any {
            return None;
        }

        let extent = max - min;
        let side = extent.max_element().max(MIN_DISTANCE) * 1.01;
        Some(Self::new(min + extent / 2.0, side, side))
    }

    pub fn min(&self) -> Vec2 {
        self.center - Vec2::new(self.width, self.height) / 2.0
    }

    pub fn max(&self) -> Vec2 {
        self.center + Vec2::new(self.width, self.height) / 2.0
    }

    /// Half-open containment test: the lower bounds are inclusive, the upper
    /// bounds are not.
    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x < max.x && point.y >= min.y && point.y < max.y
    }

    /// Index of the child quadrant `point` is routed to.
    ///
    /// `0 = NW, 1 = NE, 2 = SW, 3 = SE` with y growing downwards. Points
    /// outside the box are routed to the nearest quadrant.
    pub fn quadrant_of(&self, point: Vec2) -> usize {
        let east = (point.x >= self.center.x) as usize;
        let south = (point.y >= self.center.y) as usize;
        south * 2 + east
    }

    /// The box of child quadrant `index` as returned by [`Self::quadrant_of`].
    pub fn quadrant(&self, index: usize) -> Self {
        let half = Vec2::new(self.width, self.height) / 2.0;
        let offset = Vec2::new(
            if index & 1 == 1 { half.x } else { -half.x },
            if index & 2 == 2 { half.y } else { -half.y },
        ) / 2.0;
        Self::new(self.center + offset, half.x, half.y)
    }
}

/// A point mass inserted into the tree.
///
/// `index` identifies the body so a query can skip itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub index: usize,
    pub position: Vec2,
    pub mass: f32,
}

impl Body {
    pub fn new(index: usize, position: Vec2, mass: f32) -> Self {
        Self {
            index,
            position,
            mass,
        }
    }
}

/// Result of a repulsion query.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Repulsion {
    /// Net force acting on the queried body.
    pub force: Vec2,
    /// Number of quadrants visited while computing `force`.
    pub visited: usize,
}

#[derive(Debug)]
struct Quadrant {
    boundary: BoundingBox2D,
    mass: f32,
    weighted_position: Vec2,
    count: usize,
    children: Option<[usize; 4]>,
    bodies: Vec<Body>,
}

impl Quadrant {
    fn new(boundary: BoundingBox2D) -> Self {
        Self {
            boundary,
            mass: 0.0,
            weighted_position: Vec2::ZERO,
            count: 0,
            children: None,
            bodies: Vec::new(),
        }
    }

    fn accumulate(&mut self, body: &Body) {
        self.mass += body.mass;
        self.weighted_position += body.position * body.mass;
        self.count += 1;
    }

    fn center_of_mass(&self) -> Vec2 {
        if self.mass > 0.0 {
            self.weighted_position / self.mass
        } else {
            self.boundary.center
        }
    }
}

/// Region quadtree caching the mass and center of mass of every subtree.
#[derive(Debug)]
pub struct QuadTree {
    pub boundary: BoundingBox2D,
    quadrants: Vec<Quadrant>,
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::with_capacity(BoundingBox2D::new(Vec2::ZERO, MIN_DISTANCE, MIN_DISTANCE), 0)
    }
}

impl QuadTree {
    /// An empty tree covering `boundary`, with room for roughly `capacity`
    /// bodies before the arena reallocates.
    pub fn with_capacity(boundary: BoundingBox2D, capacity: usize) -> Self {
        let mut quadrants = Vec::with_capacity(capacity * 2 + 1);
        quadrants.push(Quadrant::new(boundary));
        Self {
            boundary,
            quadrants,
        }
    }

    /// Builds a tree over `bodies` in one pass.
    ///
    /// When `boundary` is `None` the tree covers the smallest square enclosing
    /// every body.
    pub fn build(bodies: &[Body], boundary: Option<BoundingBox2D>) -> Self {
        let boundary = boundary
            .or_else(|| BoundingBox2D::enclosing(bodies.iter().map(|b| b.position)))
            .unwrap_or_else(|| QuadTree::default().boundary);

        let mut tree = Self::with_capacity(boundary, bodies.len());
        for body in bodies {
            tree.insert(*body);
        }
        tree
    }

    /// Number of bodies in the tree.
    pub fn len(&self) -> usize {
        self.quadrants[0].count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total mass of all bodies.
    pub fn mass(&self) -> f32 {
        self.quadrants[0].mass
    }

    /// Mass weighted centroid of all bodies.
    pub fn center_of_mass(&self) -> Vec2 {
        self.quadrants[0].center_of_mass()
    }

    pub fn insert(&mut self, body: Body) {
        let mut current = 0;
        let mut depth = 0;
        loop {
            self.quadrants[current].accumulate(&body);

            let quadrant = &self.quadrants[current];
            if let Some(children) = quadrant.children {
                current = children[quadrant.boundary.quadrant_of(body.position)];
                depth += 1;
                continue;
            }

            if quadrant.bodies.is_empty()
                || depth >= MAX_DEPTH
                || quadrant.boundary.width <= MIN_CELL_SIZE
            {
                self.quadrants[current].bodies.push(body);
                return;
            }

            // Occupied leaf: split it and push the resident one level down.
            let boundary = quadrant.boundary;
            let children = self.subdivide(current);
            for resident in std::mem::take(&mut self.quadrants[current].bodies) {
                let slot = children[boundary.quadrant_of(resident.position)];
                self.quadrants[slot].accumulate(&resident);
                self.quadrants[slot].bodies.push(resident);
            }
            current = children[boundary.quadrant_of(body.position)];
            depth += 1;
        }
    }

    fn subdivide(&mut self, index: usize) -> [usize; 4] {
        let boundary = self.quadrants[index].boundary;
        let first = self.quadrants.len();
        for i in 0..4 {
            self.quadrants.push(Quadrant::new(boundary.quadrant(i)));
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.quadrants[index].children = Some(children);
        children
    }

    /// Computes the repel force `target` receives from every other body.
    ///
    /// A quadrant whose `width / distance` ratio is below `theta` is treated as
    /// a single mass at its centroid. Quadrants on the path to `target` are
    /// always opened so a body never repels itself. Negative `charge` repels.
    pub fn repulsion(&self, target: &Body, theta: f32, charge: f32) -> Repulsion {
        let mut result = Repulsion::default();
        if self.is_empty() {
            return result;
        }

        let mut stack = vec![(0usize, true)];
        while let Some((index, on_path)) = stack.pop() {
            let quadrant = &self.quadrants[index];
            result.visited += 1;

            let Some(children) = quadrant.children else {
                for body in quadrant.bodies.iter().filter(|b| b.index != target.index) {
                    result.force += pair_force(
                        target,
                        body.position,
                        body.mass,
                        charge,
                        separation_axis(target.index, body.index),
                    );
                }
                continue;
            };

            let center_of_mass = quadrant.center_of_mass();
            let distance = target.position.distance(center_of_mass);
            if !on_path && quadrant.boundary.width < theta * distance {
                result.force += pair_force(
                    target,
                    center_of_mass,
                    quadrant.mass,
                    charge,
                    separation_axis(target.index, target.index.wrapping_add(1)),
                );
                continue;
            }

            let route = quadrant.boundary.quadrant_of(target.position);
            for (i, child) in children.into_iter().enumerate() {
                if self.quadrants[child].count > 0 {
                    stack.push((child, on_path && i == route));
                }
            }
        }
        result
    }
}

/// Inverse square force `target` receives from a mass at `source`.
///
/// `fallback` is the direction used when both positions coincide.
fn pair_force(target: &Body, source: Vec2, source_mass: f32, charge: f32, fallback: Vec2) -> Vec2 {
    let delta = target.position - source;
    let direction = delta.try_normalize().unwrap_or(fallback);
    let distance = delta.length().max(MIN_DISTANCE);

    let magnitude = -charge * target.mass * source_mass / (distance * distance);
    direction * magnitude
}

/// Deterministic unit vector separating two bodies that sit on the same spot.
///
/// The axis depends only on the unordered pair, its sign on the order, so the
/// two bodies are pushed in opposite directions.
pub(crate) fn separation_axis(a: usize, b: usize) -> Vec2 {
    let (low, high) = (a.min(b), a.max(b));
    let angle = (low as f32).mul_add(GOLDEN_ANGLE, high as f32);
    let axis = Vec2::from_angle(angle);
    if a < b {
        axis
    } else {
        -axis
    }
}
