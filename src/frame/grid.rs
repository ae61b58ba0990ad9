//! Typed per-pixel grids that travel alongside frames.
//!
//! [`Mask`], [`DistanceField`] and [`BlendField`] are distinct types so a
//! distance can never be fed where a blend factor is expected. All of them
//! sit on top of the generic [`Grid`], which provides the elementwise
//! "map over the 2D index domain" operations.

use crate::error::{ensure_same_dims, FrameError, Result};
use crate::frame::types::PixelRect;

/// Row-major 2D grid of copyable cells
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    pub fn filled(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> T,
    {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self { width, height, cells }
    }

    pub fn from_vec(width: u32, height: u32, cells: Vec<T>) -> Result<Self> {
        if cells.len() != width as usize * height as usize {
            return Err(FrameError::InvalidBuffer {
                details: format!("{} cells cannot form a {}x{} grid", cells.len(), width, height),
            }
            .into());
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> T {
        self.cells[self.index(x, y)]
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn map<U: Copy, F: Fn(T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(|&c| f(c)).collect(),
        }
    }

    /// Combine two equally sized grids cell by cell
    pub fn zip_map<U: Copy, V: Copy, F: Fn(T, U) -> V>(&self, other: &Grid<U>, f: F) -> Result<Grid<V>> {
        ensure_same_dims(self.dimensions(), other.dimensions())?;
        Ok(Grid {
            width: self.width,
            height: self.height,
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Boolean region-of-interest over a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(Grid<bool>);

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self(Grid::filled(width, height, false))
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self(Grid::filled(width, height, true))
    }

    pub fn from_fn<F: FnMut(u32, u32) -> bool>(width: u32, height: u32, f: F) -> Self {
        Self(Grid::from_fn(width, height, f))
    }

    pub fn from_grid(grid: Grid<bool>) -> Self {
        Self(grid)
    }

    pub fn grid(&self) -> &Grid<bool> {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.0.get(x, y)
    }

    /// Number of `true` cells
    pub fn count(&self) -> usize {
        self.0.cells().iter().filter(|&&c| c).count()
    }

    /// True when no cell is set
    pub fn is_clear(&self) -> bool {
        !self.0.cells().iter().any(|&c| c)
    }

    pub fn union(&self, other: &Mask) -> Result<Mask> {
        Ok(Mask(self.0.zip_map(&other.0, |a, b| a || b)?))
    }

    pub fn intersect(&self, other: &Mask) -> Result<Mask> {
        Ok(Mask(self.0.zip_map(&other.0, |a, b| a && b)?))
    }

    /// Cells set here but not in `other`
    pub fn difference(&self, other: &Mask) -> Result<Mask> {
        Ok(Mask(self.0.zip_map(&other.0, |a, b| a && !b)?))
    }

    pub fn invert(&self) -> Mask {
        Mask(self.0.map(|c| !c))
    }

    /// Whether every cell of `other` is also set here
    pub fn is_superset_of(&self, other: &Mask) -> Result<bool> {
        let outside = other.difference(self)?;
        Ok(outside.is_clear())
    }

    /// Clear every cell outside `rect`
    pub fn restrict_to(&self, rect: PixelRect) -> Mask {
        Mask::from_fn(self.width(), self.height(), |x, y| rect.contains(x, y) && self.get(x, y))
    }
}

/// Euclidean distance from each cell to the nearest `true` cell of a mask
///
/// Cells hold `f32::INFINITY` when the seed mask had no `true` cell at all.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceField(Grid<f32>);

impl DistanceField {
    pub(crate) fn from_grid(grid: Grid<f32>) -> Self {
        Self(grid)
    }

    pub fn grid(&self) -> &Grid<f32> {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.0.get(x, y)
    }

    /// True when every cell is infinitely far from any seed
    pub fn is_unbounded(&self) -> bool {
        self.0.cells().iter().all(|d| d.is_infinite())
    }
}

/// Per-pixel mixing weight, always inside `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct BlendField(Grid<f32>);

impl BlendField {
    /// Wrap raw factors, clipping into `[0, 1]`; NaN becomes 0
    pub fn from_grid(grid: Grid<f32>) -> Self {
        Self(grid.map(clip_unit))
    }

    pub fn from_fn<F: FnMut(u32, u32) -> f32>(width: u32, height: u32, mut f: F) -> Self {
        Self(Grid::from_fn(width, height, |x, y| clip_unit(f(x, y))))
    }

    pub fn uniform(width: u32, height: u32, factor: f32) -> Self {
        Self(Grid::filled(width, height, clip_unit(factor)))
    }

    pub fn grid(&self) -> &Grid<f32> {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.0.get(x, y)
    }

    /// Zero the factor wherever `mask` is not set
    pub fn restrict_to(&self, mask: &Mask) -> Result<BlendField> {
        Ok(Self(self.0.zip_map(mask.grid(), |f, m| if m { f } else { 0.0 })?))
    }

    pub fn is_zero(&self) -> bool {
        self.0.cells().iter().all(|&f| f == 0.0)
    }
}

fn clip_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_set_operations() {
        let a = Mask::from_fn(4, 1, |x, _| x < 2);
        let b = Mask::from_fn(4, 1, |x, _| x >= 1 && x < 3);

        assert_eq!(a.union(&b).unwrap().count(), 3);
        assert_eq!(a.intersect(&b).unwrap().count(), 1);
        assert_eq!(a.difference(&b).unwrap().count(), 1);
        assert_eq!(a.invert().count(), 2);
        assert!(a.union(&b).unwrap().is_superset_of(&a).unwrap());
        assert!(!a.is_superset_of(&b).unwrap());
    }

    #[test]
    fn test_mismatched_masks_are_rejected() {
        let a = Mask::empty(4, 4);
        let b = Mask::empty(4, 3);
        let err = a.union(&b).unwrap_err();
        assert!(err.is_defect());
    }

    #[test]
    fn test_blend_field_clips_values() {
        let field = BlendField::from_fn(3, 1, |x, _| match x {
            0 => -0.5,
            1 => 0.25,
            _ => f32::NAN,
        });
        assert_eq!(field.grid().cells(), &[0.0, 0.25, 0.0]);
        assert_eq!(BlendField::uniform(2, 2, 7.0).get(1, 1), 1.0);
    }

    #[test]
    fn test_restrict_to_rect() {
        let mask = Mask::full(5, 5).restrict_to(PixelRect { x: 1, y: 1, width: 2, height: 3 });
        assert_eq!(mask.count(), 6);
        assert!(!mask.get(0, 0));
        assert!(mask.get(2, 3));
    }

    #[test]
    fn test_grid_from_vec_checks_length() {
        assert!(Grid::from_vec(2, 2, vec![0u8; 3]).is_err());
        let grid = Grid::from_vec(2, 2, vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(grid.get(1, 1), 4);
    }
}
