//! Planning spaces
//!
//! A space is the rectangle `(0, dimensions)` plus a set of goals. Two
//! flavours are provided:
//! - [`EmptySpace`]: nothing blocks motion except the outer boundary
//! - [`WallSpace`]: additionally blocked by axis-aligned rectangular walls
//!
//! Bounds are open: a coordinate equal to `0` or to the matching dimension is
//! out of bounds.

use nalgebra::{Point2, Vector2};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use tracing::trace;

use super::geometry::{find_intersection_point, point_in_box, segments_intersect};
use super::goal::Goal;
use crate::error::{PlanningError, PlanningResult};

/// Retry budget of the wall space rejection sampler
pub const DEFAULT_MAX_SAMPLE_ATTEMPTS: usize = 100_000;

/// Fraction of the smallest dimension kept between a pulled-back point and an obstacle
const CLEARANCE_RATIO: f64 = 1e-6;

type Segment = (Point2<f64>, Point2<f64>);

/// Feasibility, cost and sampling queries over a bounded 2D region
pub trait Space {
    /// Upper corner of the bounding rectangle; the lower corner is the origin
    fn dimensions(&self) -> Vector2<f64>;

    fn goals(&self) -> &[Goal];

    /// Check whether the straight motion `from -> to` is admissible
    fn collision_free(&self, from: &Point2<f64>, to: &Point2<f64>) -> bool;

    /// Last admissible point along `from -> to` before the first obstacle
    ///
    /// Returns `to` when nothing blocks the segment, and `from` when no
    /// progress is possible.
    fn nearest_free_point(&self, from: &Point2<f64>, to: &Point2<f64>) -> Point2<f64>;

    /// Uniform sample over `[0, dimensions)` that avoids obstacles
    fn random_free_point<R: Rng + ?Sized>(&self, rng: &mut R) -> PlanningResult<Point2<f64>>;

    /// Open-interval bounds check
    fn in_bounds(&self, point: &Point2<f64>) -> bool {
        let dims = self.dimensions();
        point.x > 0.0 && point.x < dims.x && point.y > 0.0 && point.y < dims.y
    }

    /// Euclidean length of the motion, or infinity when it is blocked
    fn path_cost(&self, from: &Point2<f64>, to: &Point2<f64>) -> f64 {
        if !self.collision_free(from, to) {
            return f64::INFINITY;
        }
        nalgebra::distance(from, to)
    }

    /// Value of the first goal containing `point`
    fn goal_value(&self, point: &Point2<f64>) -> Option<u32> {
        self.goals()
            .iter()
            .find(|g| g.point_in(point))
            .map(Goal::value)
    }

    fn check_point_in_goals(&self, point: &Point2<f64>) -> bool {
        self.goal_value(point).is_some()
    }

    /// Flip the y coordinate for drawing with a y-down convention
    fn invert(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::new(point.x, self.dimensions().y - point.y)
    }

    /// Length of the bounding rectangle's diagonal
    fn diagonal(&self) -> f64 {
        self.dimensions().norm()
    }

    /// Gap kept between a pulled-back point and whatever blocked it
    fn clearance(&self) -> f64 {
        self.dimensions().min() * CLEARANCE_RATIO
    }
}

fn boundary_edges(dims: &Vector2<f64>) -> [Segment; 4] {
    let origin = Point2::origin();
    let corner = Point2::new(dims.x, dims.y);
    [
        (origin, Point2::new(dims.x, 0.0)),
        (origin, Point2::new(0.0, dims.y)),
        (Point2::new(dims.x, 0.0), corner),
        (Point2::new(0.0, dims.y), corner),
    ]
}

fn sample_in_bounds<R: Rng + ?Sized>(dims: &Vector2<f64>, rng: &mut R) -> Point2<f64> {
    let x_dist = Uniform::new(0.0, dims.x);
    let y_dist = Uniform::new(0.0, dims.y);
    Point2::new(x_dist.sample(rng), y_dist.sample(rng))
}

/// Intersection of `from -> to` with `edges` closest to `from`
fn nearest_hit(
    from: &Point2<f64>,
    to: &Point2<f64>,
    edges: impl IntoIterator<Item = Segment>,
) -> Option<Point2<f64>> {
    edges
        .into_iter()
        .filter_map(|(e1, e2)| find_intersection_point(from, to, &e1, &e2))
        .min_by(|p, q| {
            nalgebra::distance_squared(from, p).total_cmp(&nalgebra::distance_squared(from, q))
        })
}

/// Move `hit` back towards `from` by `clearance`, or return `from` if it is closer than that
fn pull_back(from: &Point2<f64>, hit: &Point2<f64>, clearance: f64) -> Point2<f64> {
    let dist = nalgebra::distance(from, hit);
    if dist <= clearance {
        return *from;
    }
    from + (hit - from) * ((dist - clearance) / dist)
}

/// An obstacle-free rectangular space
#[derive(Debug, Clone)]
pub struct EmptySpace {
    dimensions: Vector2<f64>,
    goals: Vec<Goal>,
}

impl EmptySpace {
    pub fn new(dimensions: Vector2<f64>, goals: Vec<Goal>) -> Self {
        Self { dimensions, goals }
    }
}

impl Space for EmptySpace {
    fn dimensions(&self) -> Vector2<f64> {
        self.dimensions
    }

    fn goals(&self) -> &[Goal] {
        &self.goals
    }

    fn collision_free(&self, from: &Point2<f64>, to: &Point2<f64>) -> bool {
        self.in_bounds(from) && self.in_bounds(to)
    }

    fn nearest_free_point(&self, from: &Point2<f64>, to: &Point2<f64>) -> Point2<f64> {
        if !self.in_bounds(from) {
            return *from;
        }
        match nearest_hit(from, to, boundary_edges(&self.dimensions)) {
            Some(hit) => pull_back(from, &hit, self.clearance()),
            None => *to,
        }
    }

    fn random_free_point<R: Rng + ?Sized>(&self, rng: &mut R) -> PlanningResult<Point2<f64>> {
        Ok(sample_in_bounds(&self.dimensions, rng))
    }
}

/// An axis-aligned rectangular obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Wall {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Check whether a point is inside the wall or on its border
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point_in_box(&self.min, &self.max, point)
    }

    /// The four border segments: left, bottom, top, right
    pub fn edges(&self) -> [Segment; 4] {
        let upper_left = Point2::new(self.min.x, self.max.y);
        let lower_right = Point2::new(self.max.x, self.min.y);
        [
            (self.min, upper_left),
            (self.min, lower_right),
            (upper_left, self.max),
            (lower_right, self.max),
        ]
    }

    /// Check whether the wall overlaps the closed box `[lo, hi]`
    fn overlaps(&self, lo: &Point2<f64>, hi: &Point2<f64>) -> bool {
        !(lo.x > self.max.x || lo.y > self.max.y || hi.x < self.min.x || hi.y < self.min.y)
    }
}

/// Bounding box of a segment
fn segment_bounds(from: &Point2<f64>, to: &Point2<f64>) -> (Point2<f64>, Point2<f64>) {
    (
        Point2::new(from.x.min(to.x), from.y.min(to.y)),
        Point2::new(from.x.max(to.x), from.y.max(to.y)),
    )
}

/// A rectangular space with impassable rectangular walls
#[derive(Debug, Clone)]
pub struct WallSpace {
    dimensions: Vector2<f64>,
    goals: Vec<Goal>,
    walls: Vec<Wall>,
    max_sample_attempts: usize,
}

impl WallSpace {
    pub fn new(dimensions: Vector2<f64>, goals: Vec<Goal>, walls: Vec<Wall>) -> Self {
        Self {
            dimensions,
            goals,
            walls,
            max_sample_attempts: DEFAULT_MAX_SAMPLE_ATTEMPTS,
        }
    }

    /// Change how many rejected samples `random_free_point` tolerates before giving up
    pub fn with_max_sample_attempts(mut self, attempts: usize) -> Self {
        self.max_sample_attempts = attempts;
        self
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn point_in_walls(&self, point: &Point2<f64>) -> bool {
        self.walls.iter().any(|w| w.contains(point))
    }

    /// Walls whose extent overlaps the bounding box of `from -> to`
    fn walls_near<'a>(
        &'a self,
        from: &Point2<f64>,
        to: &Point2<f64>,
    ) -> impl Iterator<Item = &'a Wall> + 'a {
        let (lo, hi) = segment_bounds(from, to);
        self.walls.iter().filter(move |w| w.overlaps(&lo, &hi))
    }
}

impl Space for WallSpace {
    fn dimensions(&self) -> Vector2<f64> {
        self.dimensions
    }

    fn goals(&self) -> &[Goal] {
        &self.goals
    }

    fn collision_free(&self, from: &Point2<f64>, to: &Point2<f64>) -> bool {
        if !(self.in_bounds(from) && self.in_bounds(to)) {
            return false;
        }

        for wall in self.walls_near(from, to) {
            if wall.contains(from) || wall.contains(to) {
                return false;
            }
            if wall
                .edges()
                .iter()
                .any(|(e1, e2)| segments_intersect(from, to, e1, e2))
            {
                return false;
            }
        }
        true
    }

    fn nearest_free_point(&self, from: &Point2<f64>, to: &Point2<f64>) -> Point2<f64> {
        if !self.in_bounds(from) || self.point_in_walls(from) {
            return *from;
        }

        let edges = boundary_edges(&self.dimensions)
            .into_iter()
            .chain(self.walls_near(from, to).flat_map(Wall::edges));

        match nearest_hit(from, to, edges) {
            Some(hit) => pull_back(from, &hit, self.clearance()),
            None => *to,
        }
    }

    fn random_free_point<R: Rng + ?Sized>(&self, rng: &mut R) -> PlanningResult<Point2<f64>> {
        for _ in 0..self.max_sample_attempts {
            let point = sample_in_bounds(&self.dimensions, rng);
            if !self.point_in_walls(&point) {
                return Ok(point);
            }
            trace!(?point, "rejected sample inside a wall");
        }
        Err(PlanningError::SamplingExhausted {
            attempts: self.max_sample_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    fn goals() -> Vec<Goal> {
        vec![Goal::new_box(p(375.0, 375.0), p(425.0, 425.0))]
    }

    fn empty_space() -> EmptySpace {
        EmptySpace::new(Vector2::new(500.0, 500.0), goals())
    }

    fn wall_space() -> WallSpace {
        WallSpace::new(
            Vector2::new(500.0, 500.0),
            goals(),
            vec![Wall::new(p(200.0, 200.0), p(300.0, 300.0))],
        )
    }

    #[rstest]
    #[case(p(250.0, 100.0), true)]
    #[case(p(0.0, 100.0), false)]
    #[case(p(100.0, 0.0), false)]
    #[case(p(500.0, 100.0), false)]
    #[case(p(100.0, 500.0), false)]
    #[case(p(-3.0, 100.0), false)]
    fn test_collision_free_bounds(#[case] point: Point2<f64>, #[case] expected: bool) {
        assert_eq!(empty_space().collision_free(&point, &point), expected);
        assert_eq!(wall_space().collision_free(&point, &point), expected);
    }

    #[test]
    fn test_path_cost() {
        let space = empty_space();
        assert_eq!(space.path_cost(&p(10.0, 10.0), &p(13.0, 14.0)), 5.0);
        assert!(space.path_cost(&p(10.0, 10.0), &p(0.0, 14.0)).is_infinite());
    }

    #[rstest]
    #[case::crosses(p(100.0, 250.0), p(400.0, 250.0), false)]
    #[case::end_inside(p(100.0, 250.0), p(250.0, 250.0), false)]
    #[case::touches_corner(p(100.0, 100.0), p(200.0, 200.0), false)]
    #[case::grazes_edge(p(100.0, 200.0), p(400.0, 200.0), false)]
    #[case::passes_below(p(100.0, 150.0), p(400.0, 150.0), true)]
    #[case::near_corner(p(150.0, 260.0), p(210.0, 320.0), true)]
    fn test_wall_collision(
        #[case] from: Point2<f64>,
        #[case] to: Point2<f64>,
        #[case] expected: bool,
    ) {
        let space = wall_space();
        assert_eq!(space.collision_free(&from, &to), expected);
        assert_eq!(space.collision_free(&to, &from), expected);
    }

    #[test]
    fn test_nearest_free_point_boundary() {
        let space = empty_space();
        let from = p(250.0, 250.0);
        let free = space.nearest_free_point(&from, &p(600.0, 250.0));
        assert!(free.x < 500.0 && free.x > 499.99);
        assert!((free.y - 250.0).abs() < 1e-9);
        assert!(space.path_cost(&from, &free).is_finite());
    }

    #[test]
    fn test_nearest_free_point_unblocked_returns_target() {
        let to = p(120.0, 130.0);
        assert_eq!(empty_space().nearest_free_point(&p(100.0, 100.0), &to), to);
        assert_eq!(wall_space().nearest_free_point(&p(100.0, 100.0), &to), to);
    }

    #[test]
    fn test_nearest_free_point_wall() {
        let space = wall_space();
        let from = p(100.0, 250.0);
        let free = space.nearest_free_point(&from, &p(400.0, 250.0));
        assert!(free.x < 200.0 && free.x > 199.99);
        assert!(space.collision_free(&from, &free));
    }

    #[test]
    fn test_nearest_free_point_prefers_closest_obstacle() {
        let space = WallSpace::new(
            Vector2::new(500.0, 500.0),
            vec![],
            vec![Wall::new(p(450.0, 100.0), p(490.0, 400.0))],
        );
        let from = p(400.0, 250.0);
        let free = space.nearest_free_point(&from, &p(600.0, 250.0));
        assert!(free.x < 450.0 && free.x > 449.99);
        assert!(space.collision_free(&from, &free));
    }

    #[test]
    fn test_nearest_free_point_no_progress() {
        let space = wall_space();
        let from = p(199.9999, 250.0);
        let free = space.nearest_free_point(&from, &p(250.0, 250.0));
        assert_eq!(free, from);
    }

    #[test]
    fn test_random_free_point() {
        let space = wall_space();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let point = space.random_free_point(&mut rng).unwrap();
            assert!(point.x >= 0.0 && point.x < 500.0);
            assert!(point.y >= 0.0 && point.y < 500.0);
            assert!(!space.point_in_walls(&point));
        }
    }

    #[test]
    fn test_random_free_point_gives_up() {
        let space = WallSpace::new(
            Vector2::new(500.0, 500.0),
            vec![],
            vec![Wall::new(p(-1.0, -1.0), p(501.0, 501.0))],
        )
        .with_max_sample_attempts(10);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            space.random_free_point(&mut rng),
            Err(PlanningError::SamplingExhausted { attempts: 10 })
        ));
    }

    #[test]
    fn test_goals_and_invert() {
        let space = empty_space();
        assert!(space.check_point_in_goals(&p(400.0, 400.0)));
        assert!(!space.check_point_in_goals(&p(100.0, 400.0)));
        assert_eq!(space.goal_value(&p(400.0, 400.0)), Some(1));
        assert_eq!(space.invert(&p(10.0, 100.0)), p(10.0, 400.0));
        assert!((space.diagonal() - 500.0 * 2f64.sqrt()).abs() < 1e-9);
    }
}
