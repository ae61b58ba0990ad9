//! # Morphology Module
//!
//! Dilation and Euclidean distance transforms over [`Mask`]s.
//!
//! Both operators are built on an exact squared Euclidean distance transform
//! (separable lower-envelope algorithm, Felzenszwalb & Huttenlocher), so a
//! disk dilation of any radius costs the same as a single transform:
//! a cell lies in `dilate(mask, r)` iff its squared distance to the nearest
//! set cell is at most `r²`. Cells outside the grid never contribute.
//!
//! On an integer lattice disks do not always compose exactly:
//! `dilate(dilate(m, a), b)` is always a subset of `dilate(m, a + b)`, and is
//! equal for small radii such as `1 + 1`.

use crate::frame::{DistanceField, Grid, Mask};

/// Stand-in for "no seed on this line" that keeps the envelope arithmetic finite
const FAR: f64 = 1e20;

/// Disk-shaped neighbourhood: `(dx, dy)` belongs iff `dx² + dy² <= r²`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    radius: u32,
}

impl StructuringElement {
    pub fn disk(radius: u32) -> Self {
        Self { radius }
    }

    pub fn contains(&self, dx: i64, dy: i64) -> bool {
        let r = self.radius as i64;
        dx * dx + dy * dy <= r * r
    }

    /// All member offsets, row by row
    pub fn offsets(&self) -> Vec<(i64, i64)> {
        let r = self.radius as i64;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                if self.contains(dx, dy) {
                    offsets.push((dx, dy));
                }
            }
        }
        offsets
    }
}

/// Grow `mask` by a disk of the given radius
pub fn dilate(mask: &Mask, radius: u32) -> Mask {
    if radius == 0 || mask.is_clear() {
        return mask.clone();
    }

    let limit = (radius as f64) * (radius as f64);
    let squared = squared_distances(mask);
    Mask::from_grid(squared.map(|d| d <= limit))
}

/// Dilate by sliding the structuring element directly over the grid
///
/// Cost grows with the element's area; prefer [`dilate`] for large radii.
pub fn dilate_with(mask: &Mask, element: &StructuringElement) -> Mask {
    let (w, h) = mask.dimensions();
    let offsets = element.offsets();
    Mask::from_fn(w, h, |x, y| {
        offsets.iter().any(|&(dx, dy)| {
            let sx = x as i64 + dx;
            let sy = y as i64 + dy;
            sx >= 0 && sy >= 0 && sx < w as i64 && sy < h as i64 && mask.get(sx as u32, sy as u32)
        })
    })
}

/// Apply the unit disk (3x3 cross) `iterations` times
///
/// Used to absorb the one or two pixels of anti-aliasing around a detected
/// shape. Note that three iterations give a diamond, not a radius-3 disk.
pub fn dilate_iterations(mask: &Mask, iterations: u32) -> Mask {
    let cross = StructuringElement::disk(1);
    let mut current = mask.clone();
    for _ in 0..iterations {
        current = dilate_with(&current, &cross);
    }
    current
}

/// Euclidean distance from every cell to the nearest set cell
///
/// Set cells are at distance 0. A clear mask yields `+inf` everywhere.
pub fn distance_transform(mask: &Mask) -> DistanceField {
    let (w, h) = mask.dimensions();
    if mask.is_clear() {
        return DistanceField::from_grid(Grid::filled(w, h, f32::INFINITY));
    }

    let squared = squared_distances(mask);
    DistanceField::from_grid(squared.map(|d| d.sqrt() as f32))
}

/// Exact squared Euclidean distances; callers ensure the mask is not clear
fn squared_distances(mask: &Mask) -> Grid<f64> {
    let (w, h) = mask.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let mut cells: Vec<f64> = mask
        .grid()
        .cells()
        .iter()
        .map(|&set| if set { 0.0 } else { FAR })
        .collect();

    let longest = wu.max(hu);
    let mut line = vec![0.0; longest];
    let mut out = vec![0.0; longest];
    let mut scratch = EnvelopeScratch::new(longest);

    // Columns
    for x in 0..wu {
        for y in 0..hu {
            line[y] = cells[y * wu + x];
        }
        lower_envelope(&line[..hu], &mut out[..hu], &mut scratch);
        for y in 0..hu {
            cells[y * wu + x] = out[y];
        }
    }

    // Rows
    for y in 0..hu {
        let row = &mut cells[y * wu..(y + 1) * wu];
        line[..wu].copy_from_slice(row);
        lower_envelope(&line[..wu], &mut out[..wu], &mut scratch);
        row.copy_from_slice(&out[..wu]);
    }

    Grid::from_fn(w, h, |x, y| cells[y as usize * wu + x as usize])
}

struct EnvelopeScratch {
    vertices: Vec<usize>,
    bounds: Vec<f64>,
}

impl EnvelopeScratch {
    fn new(n: usize) -> Self {
        Self {
            vertices: vec![0; n.max(1)],
            bounds: vec![0.0; n.max(1) + 1],
        }
    }
}

/// 1D squared distance transform of the sampled function `f`
fn lower_envelope(f: &[f64], d: &mut [f64], s: &mut EnvelopeScratch) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let v = &mut s.vertices;
    let z = &mut s.bounds;
    let intersect = |q: usize, p: usize| -> f64 {
        let (qf, pf) = (q as f64, p as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
    };

    let mut k = 0usize;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let mut boundary = intersect(q, v[k]);
        while boundary <= z[k] {
            k -= 1;
            boundary = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = boundary;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, slot) in d.iter_mut().enumerate().take(n) {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let offset = q as f64 - v[k] as f64;
        *slot = offset * offset + f[v[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn random_mask(rng: &mut SmallRng, w: u32, h: u32, density: f64) -> Mask {
        Mask::from_fn(w, h, |_, _| rng.gen_bool(density))
    }

    fn seed(w: u32, h: u32, at: (u32, u32)) -> Mask {
        Mask::from_fn(w, h, |x, y| (x, y) == at)
    }

    #[test]
    fn test_disk_membership() {
        let disk = StructuringElement::disk(2);
        assert!(disk.contains(2, 0));
        assert!(disk.contains(1, 1));
        assert!(!disk.contains(2, 1));
        assert_eq!(disk.offsets().len(), 13);
        assert_eq!(StructuringElement::disk(0).offsets(), vec![(0, 0)]);
    }

    #[test]
    fn test_dilate_zero_is_identity() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mask = random_mask(&mut rng, 17, 11, 0.2);
        assert_eq!(dilate(&mask, 0), mask);
    }

    #[test]
    fn test_dilate_matches_structuring_element_definition() {
        let mut rng = SmallRng::seed_from_u64(42);
        for radius in 1..=6 {
            let mask = random_mask(&mut rng, 23, 19, 0.03);
            let fast = dilate(&mask, radius);
            let direct = dilate_with(&mask, &StructuringElement::disk(radius));
            assert_eq!(fast, direct, "radius {}", radius);
            assert_eq!(fast.dimensions(), mask.dimensions());
        }
    }

    #[test]
    fn test_dilate_is_monotonic() {
        let mut rng = SmallRng::seed_from_u64(3);
        for radius in 0..5 {
            let mask = random_mask(&mut rng, 30, 20, 0.05);
            assert!(dilate(&mask, radius).is_superset_of(&mask).unwrap());
        }
    }

    #[test]
    fn test_dilate_composition() {
        let center = seed(31, 31, (15, 15));

        let twice = dilate(&dilate(&center, 1), 1);
        assert_eq!(twice, dilate(&center, 2));

        for (a, b) in [(2, 3), (3, 4), (1, 5)] {
            let stepped = dilate(&dilate(&center, a), b);
            let direct = dilate(&center, a + b);
            assert!(direct.is_superset_of(&stepped).unwrap(), "{} + {}", a, b);
        }
    }

    #[test]
    fn test_dilate_clips_at_grid_edges() {
        let corner = seed(5, 5, (0, 0));
        let grown = dilate(&corner, 2);
        assert_eq!(grown.count(), 6);
        assert!(grown.get(2, 0));
        assert!(grown.get(1, 1));
        assert!(!grown.get(2, 1));
    }

    #[test]
    fn test_dilate_iterations_uses_cross() {
        let center = seed(15, 15, (7, 7));

        let once = dilate_iterations(&center, 1);
        assert_eq!(once.count(), 5);

        assert_eq!(dilate_iterations(&center, 2), dilate(&center, 2));

        let thrice = dilate_iterations(&center, 3);
        assert!(thrice.get(10, 7));
        assert!(!thrice.get(9, 9));
        assert!(dilate(&center, 3).get(9, 9));

        assert_eq!(dilate_iterations(&center, 0), center);
    }

    #[test]
    fn test_distance_transform_values() {
        let field = distance_transform(&seed(6, 6, (0, 0)));
        assert_eq!(field.get(0, 0), 0.0);
        assert_eq!(field.get(3, 4), 5.0);
        assert_eq!(field.get(5, 0), 5.0);
        assert!((field.get(1, 1) - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_distance_transform_matches_brute_force() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mask = random_mask(&mut rng, 21, 13, 0.04);
        let mask = if mask.is_clear() { seed(21, 13, (4, 4)) } else { mask };
        let field = distance_transform(&mask);

        for y in 0..13 {
            for x in 0..21 {
                let mut best = f32::INFINITY;
                for sy in 0..13 {
                    for sx in 0..21 {
                        if mask.get(sx, sy) {
                            let dx = sx as f32 - x as f32;
                            let dy = sy as f32 - y as f32;
                            best = best.min((dx * dx + dy * dy).sqrt());
                        }
                    }
                }
                assert!((field.get(x, y) - best).abs() < 1e-4, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_distance_transform_of_clear_mask_is_unbounded() {
        let field = distance_transform(&Mask::empty(8, 4));
        assert_eq!(field.dimensions(), (8, 4));
        assert!(field.is_unbounded());
    }

    #[test]
    fn test_single_row_and_column_masks() {
        let row = Mask::from_fn(7, 1, |x, _| x == 6);
        let field = distance_transform(&row);
        assert_eq!(field.get(0, 0), 6.0);

        let column = Mask::from_fn(1, 5, |_, y| y == 0);
        assert_eq!(dilate(&column, 2).count(), 3);
    }
}
