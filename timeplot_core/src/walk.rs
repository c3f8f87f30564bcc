use std::f64::consts::{FRAC_PI_2, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Angles this close to straight up or down are nudged off vertical.
const VERTICAL_TOLERANCE: f64 = 0.001;

/// One vertex of a [`RandomWalk`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WalkPoint {
    pub x: f64,
    pub y: f64,
}

impl WalkPoint {
    pub const ORIGIN: WalkPoint = WalkPoint { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A directed 2-D random walk starting at the origin.
///
/// Each step has a magnitude in `[1, 2)` and a direction drawn from
/// `[0, 2π · angle_multiplier)`. A multiplier of zero therefore yields a
/// straight walk along the positive x axis.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomWalk {
    points: Vec<WalkPoint>,
}

impl RandomWalk {
    /// Generate a walk of `steps` steps from an entropy-seeded generator.
    pub fn generate(steps: usize, angle_multiplier: f64) -> Self {
        Self::generate_with(steps, angle_multiplier, &mut StdRng::from_entropy())
    }

    /// Generate a walk drawing angles and magnitudes from `rng`.
    pub fn generate_with<R: Rng + ?Sized>(
        steps: usize,
        angle_multiplier: f64,
        rng: &mut R,
    ) -> Self {
        let mut points = Vec::with_capacity(steps + 1);
        let mut current = WalkPoint::ORIGIN;
        points.push(current);

        let angle_span = TAU * angle_multiplier;
        for _ in 0..steps {
            let mut angle = rng.gen::<f64>() * angle_span;
            if is_near_vertical(angle) {
                angle += VERTICAL_TOLERANCE;
            }
            let magnitude = 1.0 + rng.gen::<f64>();

            current = WalkPoint::new(
                current.x + magnitude * angle.cos(),
                current.y + magnitude * angle.sin(),
            );
            points.push(current);
        }

        Self { points }
    }

    /// Build a walk from explicit points.
    pub fn from_points(points: Vec<WalkPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[WalkPoint] {
        &self.points
    }

    /// Number of steps, one fewer than the number of points.
    pub fn steps(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Consecutive point pairs, one per step.
    pub fn edges(&self) -> impl Iterator<Item = (WalkPoint, WalkPoint)> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }

    pub fn min_x(&self) -> f64 {
        self.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
    }

    pub fn max_x(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Shift every point right by `|min x|` so the walk starts its timeline
    /// at zero. Returns the applied offset.
    pub fn anchor_left(&mut self) -> f64 {
        let offset = self.min_x().abs();
        for point in &mut self.points {
            point.x += offset;
        }
        offset
    }
}

/// Straight up or down makes the edge's x extent zero.
fn is_near_vertical(angle: f64) -> bool {
    (angle - FRAC_PI_2).abs() < VERTICAL_TOLERANCE
        || (angle - 3.0 * FRAC_PI_2).abs() < VERTICAL_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn walk_has_steps_plus_one_points_from_origin() {
        let mut rng = StdRng::seed_from_u64(7);
        let walk = RandomWalk::generate_with(16, 1.0, &mut rng);
        assert_eq!(walk.points().len(), 17);
        assert_eq!(walk.steps(), 16);
        assert_eq!(walk.points()[0], WalkPoint::ORIGIN);
        assert_eq!(walk.edges().count(), 16);
    }

    #[test]
    fn step_lengths_are_bounded() {
        let mut rng = StdRng::seed_from_u64(42);
        let walk = RandomWalk::generate_with(200, 1.0, &mut rng);
        for (a, b) in walk.edges() {
            let length = (b.x - a.x).hypot(b.y - a.y);
            assert!((1.0 - 1e-12..2.0 + 1e-12).contains(&length), "step length {length}");
            assert!(b.x != a.x, "vertical step");
        }
    }

    #[test]
    fn zero_multiplier_walks_along_x_axis() {
        let mut rng = StdRng::seed_from_u64(3);
        let walk = RandomWalk::generate_with(10, 0.0, &mut rng);
        for (a, b) in walk.edges() {
            assert_eq!(b.y, 0.0);
            assert!(b.x - a.x >= 1.0);
        }
    }

    #[test]
    fn constant_source_yields_unit_spacing() {
        let mut rng = StepRng::new(0, 0);
        let walk = RandomWalk::generate_with(4, 1.0, &mut rng);
        let xs: Vec<f64> = walk.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn anchoring_moves_minimum_to_zero() {
        let mut walk = RandomWalk::from_points(vec![
            WalkPoint::ORIGIN,
            WalkPoint::new(-1.5, 1.0),
            WalkPoint::new(-0.5, -2.0),
        ]);
        let offset = walk.anchor_left();
        assert_eq!(offset, 1.5);
        assert_eq!(walk.min_x(), 0.0);
        assert_eq!(walk.max_x(), 1.5);
        assert_eq!(walk.points()[2].y, -2.0);
    }

    #[test]
    fn seeded_walks_are_reproducible() {
        let a = RandomWalk::generate_with(8, 0.5, &mut StdRng::seed_from_u64(11));
        let b = RandomWalk::generate_with(8, 0.5, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
