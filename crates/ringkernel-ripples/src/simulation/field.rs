//! Generation buffers for the wave field.
//!
//! Uses Structure of Arrays (SoA) layout: three dense row-major `f32`
//! generations plus an optional activity mask shared by all of them.

use crate::error::{Result, RipplesError};

/// Activity flag value for a propagating cell.
pub const ACTIVE: f32 = 1.0;
/// Activity flag value for a permanently blocked obstacle cell.
pub const BLOCKED: f32 = 0.0;

/// Borrowed view of the generations for one step.
///
/// `prev` and `curr` are read-only; only `next` is written.
pub struct StepBuffers<'a> {
    pub width: usize,
    pub height: usize,
    pub prev: &'a [f32],
    pub curr: &'a [f32],
    pub next: &'a mut [f32],
    pub mask: Option<&'a [f32]>,
}

/// Three same-shaped generations of the scalar height field.
///
/// All generations are always reallocated together, so their lengths never
/// disagree. The activity mask is allocated lazily on the first obstacle; a
/// missing mask means every cell is active.
#[derive(Debug, Clone, Default)]
pub struct WaveField {
    width: u32,
    height: u32,

    /// Generation n-1.
    prev: Vec<f32>,
    /// Generation n (injection target, composited for display).
    curr: Vec<f32>,
    /// Generation n+1 (written by the stepper).
    next: Vec<f32>,

    /// Per-cell activity flag (`ACTIVE` or `BLOCKED`).
    mask: Option<Vec<f32>>,
}

impl WaveField {
    /// Create a zeroed field of the given size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut field = Self::default();
        field.resize(width, height)?;
        Ok(field)
    }

    /// Reallocate all generations at the new size, discarding prior energy.
    ///
    /// On allocation failure the field is left empty (0x0) so that stepping
    /// and compositing become no-ops.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        *self = Self::default();

        let size = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| RipplesError::allocation(format!("{width}x{height} overflows")))?;

        let prev = zeroed(size)?;
        let curr = zeroed(size)?;
        let next = zeroed(size)?;

        self.width = width;
        self.height = height;
        self.prev = prev;
        self.curr = curr;
        self.next = next;
        Ok(())
    }

    /// Grid width (number of columns).
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height (number of rows).
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells per generation.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.curr.len()
    }

    /// True when there is nothing to step or draw.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.curr.is_empty()
    }

    #[inline(always)]
    fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    #[inline]
    fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Masked read of the current generation.
    ///
    /// Returns exactly `0.0` outside `[0, width) x [0, height)` and for
    /// blocked cells.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        match &self.mask {
            Some(mask) if mask[idx] == BLOCKED => 0.0,
            _ => self.curr[idx],
        }
    }

    /// Current value at a cell, ignoring the mask.
    pub fn value(&self, x: u32, y: u32) -> Option<f32> {
        self.in_bounds(x, y).then(|| self.curr[self.idx(x, y)])
    }

    /// Generation n-1.
    #[inline]
    pub fn prev(&self) -> &[f32] {
        &self.prev
    }

    /// Generation n.
    #[inline]
    pub fn curr(&self) -> &[f32] {
        &self.curr
    }

    /// Generation n+1 as written by the last step.
    #[inline]
    pub fn next(&self) -> &[f32] {
        &self.next
    }

    /// Mutable access to generation n (injection target).
    #[inline]
    pub fn curr_mut(&mut self) -> &mut [f32] {
        &mut self.curr
    }

    /// The activity mask, if any obstacle was ever placed.
    #[inline]
    pub fn mask(&self) -> Option<&[f32]> {
        self.mask.as_deref()
    }

    /// Whether a cell propagates waves. Out-of-range cells are inactive.
    pub fn is_active(&self, x: u32, y: u32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        match &self.mask {
            Some(mask) => mask[self.idx(x, y)] != BLOCKED,
            None => true,
        }
    }

    /// Mark a cell as a blocked obstacle or clear it.
    ///
    /// Blocking a cell zeroes it in every generation.
    pub fn set_obstacle(&mut self, x: u32, y: u32, blocked: bool) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.idx(x, y);
        if !blocked && self.mask.is_none() {
            return;
        }

        let size = self.curr.len();
        let mask = self.mask.get_or_insert_with(|| vec![ACTIVE; size]);
        mask[idx] = if blocked { BLOCKED } else { ACTIVE };

        if blocked {
            self.prev[idx] = 0.0;
            self.curr[idx] = 0.0;
            self.next[idx] = 0.0;
        }
    }

    /// Remove every obstacle.
    pub fn clear_obstacles(&mut self) {
        self.mask = None;
    }

    /// Borrow the generations for a step: read `prev`/`curr`, write `next`.
    pub fn step_buffers(&mut self) -> StepBuffers<'_> {
        StepBuffers {
            width: self.width as usize,
            height: self.height as usize,
            prev: &self.prev,
            curr: &self.curr,
            next: &mut self.next,
            mask: self.mask.as_deref(),
        }
    }

    /// Rotate generations: `prev <- curr`, `curr <- next`.
    ///
    /// The vacated `prev` buffer becomes the new `next`; nothing is
    /// reallocated.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.prev, &mut self.curr);
        std::mem::swap(&mut self.curr, &mut self.next);
    }

    /// Zero all generations, keeping size and obstacles.
    pub fn reset(&mut self) {
        self.prev.fill(0.0);
        self.curr.fill(0.0);
        self.next.fill(0.0);
    }

    /// Sum of squared heights of the current generation.
    pub fn total_energy(&self) -> f64 {
        self.curr.iter().map(|&h| (h as f64) * (h as f64)).sum()
    }

    /// Largest absolute height in the current generation.
    pub fn max_amplitude(&self) -> f32 {
        self.curr.iter().map(|h| h.abs()).fold(0.0, f32::max)
    }

    /// Largest absolute height in a generation slice; NaN propagates as infinity.
    pub(crate) fn peak(values: &[f32]) -> f32 {
        values.iter().fold(0.0f32, |acc, &h| {
            if h.is_finite() {
                acc.max(h.abs())
            } else {
                f32::INFINITY
            }
        })
    }
}

fn zeroed(size: usize) -> Result<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|e| RipplesError::allocation(format!("{size} cells: {e}")))?;
    buf.resize(size, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = WaveField::new(8, 6).unwrap();
        assert_eq!(field.width(), 8);
        assert_eq!(field.height(), 6);
        assert_eq!(field.cell_count(), 48);
        assert_eq!(field.prev().len(), 48);
        assert_eq!(field.next().len(), 48);
        assert!(field.mask().is_none());
    }

    #[test]
    fn test_resize_discards_energy() {
        let mut field = WaveField::new(4, 4).unwrap();
        field.curr_mut()[5] = 1.0;
        field.set_obstacle(1, 1, true);

        field.resize(8, 8).unwrap();

        assert_eq!(field.cell_count(), 64);
        assert!(field.curr().iter().all(|&h| h == 0.0));
        assert!(field.is_active(1, 1), "Resize should restore active cells");
    }

    #[test]
    fn test_resize_to_zero() {
        let mut field = WaveField::new(4, 4).unwrap();
        field.resize(0, 0).unwrap();
        assert!(field.is_empty());
        field.resize(3, 2).unwrap();
        assert_eq!(field.cell_count(), 6);
    }

    #[test]
    fn test_masked_get() {
        let mut field = WaveField::new(4, 4).unwrap();
        field.curr_mut().fill(2.0);

        assert_eq!(field.get(1, 1), 2.0);
        assert_eq!(field.get(-1, 0), 0.0);
        assert_eq!(field.get(0, 4), 0.0);
        assert_eq!(field.get(4, 0), 0.0);

        field.curr_mut().fill(2.0);
        field.set_obstacle(2, 2, true);
        field.curr_mut()[10] = 5.0;
        assert_eq!(field.get(2, 2), 0.0, "Blocked cell reads as zero");
    }

    #[test]
    fn test_obstacle_zeroes_generations() {
        let mut field = WaveField::new(4, 4).unwrap();
        field.curr_mut().fill(1.0);
        field.set_obstacle(3, 0, true);

        assert_eq!(field.value(3, 0), Some(0.0));
        assert!(!field.is_active(3, 0));

        field.set_obstacle(3, 0, false);
        assert!(field.is_active(3, 0));

        field.clear_obstacles();
        assert!(field.mask().is_none());
    }

    #[test]
    fn test_rotation() {
        let mut field = WaveField::new(2, 1).unwrap();
        field.step_buffers().next[0] = 3.0;
        field.curr_mut()[0] = 2.0;

        field.rotate();

        assert_eq!(field.prev()[0], 2.0);
        assert_eq!(field.curr()[0], 3.0);
        assert_eq!(field.next()[0], 0.0, "Vacated prev becomes next");
    }

    #[test]
    fn test_energy_and_peak() {
        let mut field = WaveField::new(2, 2).unwrap();
        field.curr_mut().copy_from_slice(&[1.0, -2.0, 0.0, 0.5]);

        assert!((field.total_energy() - 5.25).abs() < 1e-9);
        assert_eq!(field.max_amplitude(), 2.0);
        assert_eq!(WaveField::peak(&[0.0, f32::NAN]), f32::INFINITY);
    }
}
