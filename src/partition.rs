//! Partitions a rectangular region into convex polygonal cells around
//! scattered seed points.
//!
//! This is a sampling approximation of a Voronoi diagram, not an exact
//! construction: the region is overlaid with a coarse uniform grid, every
//! sample is assigned to its nearest seed, and each cell's boundary is the
//! convex hull of its assigned samples. The hull may omit concave
//! pixel-level detail of the true Voronoi cell; that coarseness is part of
//! the effect's visual texture and is kept on purpose.

use crate::foundation::core::{Point, Rect};
use rand::Rng;

/// Relaxation factor applied to the ideal seed spacing during rejection
/// sampling. Lower values allow denser clustering.
pub const SEED_SPACING_FACTOR: f64 = 0.8;

/// Rejection attempts per seed before a candidate is accepted regardless of
/// spacing. Bounds the placement loop on dense requests.
const MAX_SEED_ATTEMPTS: u32 = 30;

/// Static geometric description of one shard: a convex polygon around a
/// seed point.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    /// The seed this cell grew from.
    pub seed: Point,
    /// Convex polygon boundary in counter-clockwise order, at least 3
    /// vertices, no duplicated endpoint.
    pub vertices: Vec<Point>,
    /// Arithmetic mean of the samples assigned to the seed. Lies inside
    /// the hull.
    pub centroid: Point,
}

impl Cell {
    /// Axis-aligned bounding box of the cell polygon.
    pub fn bounds(&self) -> Rect {
        let mut x0 = f64::INFINITY;
        let mut y0 = f64::INFINITY;
        let mut x1 = f64::NEG_INFINITY;
        let mut y1 = f64::NEG_INFINITY;
        for v in &self.vertices {
            x0 = x0.min(v.x);
            y0 = y0.min(v.y);
            x1 = x1.max(v.x);
            y1 = y1.max(v.y);
        }
        Rect::new(x0, y0, x1, y1)
    }

    /// Point-in-convex-polygon test with a small boundary tolerance.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            if cross(a, b, p) < -1e-9 {
                return false;
            }
        }
        true
    }
}

/// Partition `region` into at most `seed_count` convex cells.
///
/// Seeds with an empty sample set, or whose samples are too few or
/// collinear to form a polygon, are dropped silently; the returned vec can
/// therefore be shorter than `seed_count`. Callers treat that as a sparser
/// effect, not an error.
#[tracing::instrument(skip(rng))]
pub fn partition<R: Rng>(
    seed_count: usize,
    region: Rect,
    sampling_step: f64,
    rng: &mut R,
) -> Vec<Cell> {
    let seeds = place_seeds(seed_count, region, rng);
    let buckets = assign_samples(&seeds, region, sampling_step);

    let mut cells = Vec::with_capacity(seeds.len());
    for (i, samples) in buckets.into_iter().enumerate() {
        if samples.is_empty() {
            tracing::debug!(seed = i, "dropping cell with no assigned samples");
            continue;
        }

        let mut cx = 0.0;
        let mut cy = 0.0;
        for s in &samples {
            cx += s.x;
            cy += s.y;
        }
        let inv = 1.0 / samples.len() as f64;
        let centroid = Point::new(cx * inv, cy * inv);

        let hull = convex_hull(samples);
        if hull.len() < 3 {
            tracing::debug!(seed = i, "dropping cell with degenerate hull");
            continue;
        }

        cells.push(Cell {
            seed: seeds[i],
            vertices: hull,
            centroid,
        });
    }
    cells
}

/// Rejection-sampled uniform seed placement.
///
/// Candidates closer than `SEED_SPACING_FACTOR * min_side / sqrt(n)` to an
/// accepted seed are retried up to `MAX_SEED_ATTEMPTS` times, then accepted
/// anyway. Gives a blue-noise-like spread without pathologically tiny or
/// enormous cells.
fn place_seeds<R: Rng>(seed_count: usize, region: Rect, rng: &mut R) -> Vec<Point> {
    let min_side = region.width().min(region.height());
    let min_distance = SEED_SPACING_FACTOR * min_side / (seed_count.max(1) as f64).sqrt();
    let min_distance_sq = min_distance * min_distance;

    let mut seeds: Vec<Point> = Vec::with_capacity(seed_count);
    for _ in 0..seed_count {
        let mut candidate = random_point(region, rng);
        for _ in 0..MAX_SEED_ATTEMPTS {
            let too_close = seeds
                .iter()
                .any(|s| (*s - candidate).hypot2() < min_distance_sq);
            if !too_close {
                break;
            }
            candidate = random_point(region, rng);
        }
        seeds.push(candidate);
    }
    seeds
}

fn random_point<R: Rng>(region: Rect, rng: &mut R) -> Point {
    Point::new(
        region.x0 + rng.gen_range(0.0..1.0) * region.width(),
        region.y0 + rng.gen_range(0.0..1.0) * region.height(),
    )
}

/// Assign every grid sample to its nearest seed (ties go to the
/// first-encountered seed). Linear scan over seeds; seed counts are tens,
/// not thousands.
fn assign_samples(seeds: &[Point], region: Rect, sampling_step: f64) -> Vec<Vec<Point>> {
    let mut buckets: Vec<Vec<Point>> = vec![Vec::new(); seeds.len()];
    if seeds.is_empty() || sampling_step <= 0.0 {
        return buckets;
    }

    let mut y = region.y0;
    while y < region.y1 {
        let mut x = region.x0;
        while x < region.x1 {
            let p = Point::new(x, y);
            let mut best = 0usize;
            let mut best_d = f64::INFINITY;
            for (i, s) in seeds.iter().enumerate() {
                let d = (*s - p).hypot2();
                if d < best_d {
                    best_d = d;
                    best = i;
                }
            }
            buckets[best].push(p);
            x += sampling_step;
        }
        y += sampling_step;
    }
    buckets
}

/// Andrew's monotone-chain convex hull.
///
/// Returns the hull in counter-clockwise order without the duplicated
/// endpoint. Fewer than 3 distinct non-collinear points yield a degenerate
/// result with fewer than 3 vertices.
pub fn convex_hull(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    points.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    let n = points.len();
    if n < 3 {
        return points;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(n);
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(n);
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    // Each chain's last point is the other chain's first; drop both.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Z component of (b - a) x (c - a). Positive for a counter-clockwise turn.
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn region100() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn hull_of_square_has_four_corners() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
            Point::new(2.0, 2.0),
            Point::new(1.0, 3.0),
        ];
        let hull = convex_hull(pts);
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn hull_of_collinear_points_is_degenerate() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
        ];
        let hull = convex_hull(pts);
        assert!(hull.len() < 3);
    }

    #[test]
    fn hull_contains_every_input_sample() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(7);
        let pts: Vec<Point> = (0..200)
            .map(|_| Point::new(rng.gen_range(0.0..50.0), rng.gen_range(0.0..50.0)))
            .collect();
        let hull = convex_hull(pts.clone());
        assert!(hull.len() >= 3);
        let cell = Cell {
            seed: Point::new(25.0, 25.0),
            vertices: hull,
            centroid: Point::new(25.0, 25.0),
        };
        for p in pts {
            assert!(cell.contains(p), "sample {p:?} escaped its hull");
        }
    }

    #[test]
    fn sample_assignment_partitions_the_grid_exactly() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(3);
        let seeds = place_seeds(6, region100(), &mut rng);
        let buckets = assign_samples(&seeds, region100(), 5.0);

        let total: usize = buckets.iter().map(Vec::len).sum();
        assert_eq!(total, 20 * 20);

        // Every sample landed in the bucket of its true nearest seed.
        for (i, bucket) in buckets.iter().enumerate() {
            for p in bucket {
                let d_own = (seeds[i] - *p).hypot2();
                for s in &seeds {
                    assert!(d_own <= (*s - *p).hypot2() + 1e-12);
                }
            }
        }
    }

    #[test]
    fn seeded_partition_of_four_is_complete_and_in_bounds() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(0);
        let cells = partition(4, region100(), 2.0, &mut rng);
        assert_eq!(cells.len(), 4);
        for c in &cells {
            assert!(c.vertices.len() >= 3);
            assert!((0.0..=100.0).contains(&c.centroid.x));
            assert!((0.0..=100.0).contains(&c.centroid.y));
            assert!(c.contains(c.centroid), "centroid escaped its hull");
        }
    }

    #[test]
    fn oversubscribed_partition_drops_empty_cells() {
        // A 2x2 sample grid cannot feed more than 4 cells.
        let mut rng = rand_pcg::Pcg64::seed_from_u64(1);
        let region = Rect::new(0.0, 0.0, 10.0, 10.0);
        let cells = partition(64, region, 5.0, &mut rng);
        assert!(cells.len() <= 4);
    }

    #[test]
    fn cell_count_never_exceeds_request() {
        let mut rng = rand_pcg::Pcg64::seed_from_u64(9);
        for n in [1usize, 4, 25, 144] {
            let cells = partition(n, region100(), 4.0, &mut rng);
            assert!(!cells.is_empty());
            assert!(cells.len() <= n);
        }
    }
}
