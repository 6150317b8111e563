//! Load windows: the rectangle of chunks that should be resident.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use leafy_common::ChunkCoord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Load window errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Width or height is negative.
    #[error("Invalid load window size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: i32,
        /// Requested height
        height: i32,
    },
}

/// Result type for load window operations.
pub type WindowResult<T> = Result<T, WindowError>;

/// Axis-aligned rectangle of chunk coordinates.
///
/// Covers every `(x, y)` with `origin.x <= x < origin.x + width` and
/// `origin.y <= y < origin.y + height`. A window with zero area is valid and
/// asks for nothing to be resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LoadWindow {
    /// Top-left chunk
    pub origin: ChunkCoord,
    /// Width in chunks
    pub width: i32,
    /// Height in chunks
    pub height: i32,
}

impl LoadWindow {
    /// An empty window at the origin.
    pub const EMPTY: Self = Self::new(ChunkCoord::ZERO, 0, 0);

    /// Creates a window. Sizes are checked when the window is planned.
    #[must_use]
    pub const fn new(origin: ChunkCoord, width: i32, height: i32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// The visible rectangle grown by `margin` chunks on every side.
    ///
    /// Sizes saturate at `i32::MAX`.
    #[must_use]
    pub const fn around_view(
        view_origin: ChunkCoord,
        view_width: i32,
        view_height: i32,
        margin: i32,
    ) -> Self {
        let grow = margin.saturating_mul(2);
        Self {
            origin: view_origin.offset(margin.saturating_neg(), margin.saturating_neg()),
            width: view_width.saturating_add(grow),
            height: view_height.saturating_add(grow),
        }
    }

    /// Moves the window without changing its size.
    pub fn set_position(&mut self, origin: ChunkCoord) {
        self.origin = origin;
    }

    /// Resizes the window without moving its origin.
    pub fn set_size(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    /// Checks the size.
    pub const fn validate(&self) -> WindowResult<()> {
        if self.width < 0 || self.height < 0 {
            return Err(WindowError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Number of chunks covered (zero for an invalid window).
    #[must_use]
    pub const fn area(&self) -> usize {
        if self.width <= 0 || self.height <= 0 {
            return 0;
        }
        self.width as usize * self.height as usize
    }

    /// Chunk closest to the middle of the window.
    #[must_use]
    pub const fn center(&self) -> ChunkCoord {
        self.origin.offset(self.width / 2, self.height / 2)
    }

    /// Whether `coord` lies inside the window.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        let dx = i64::from(coord.x) - i64::from(self.origin.x);
        let dy = i64::from(coord.y) - i64::from(self.origin.y);
        (0..i64::from(self.width)).contains(&dx) && (0..i64::from(self.height)).contains(&dy)
    }

    /// Iterates the covered coordinates in row-major order.
    ///
    /// The part of the window past the `i32` edge of the grid is skipped.
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> {
        let xs = axis_range(self.origin.x, self.width);
        let ys = axis_range(self.origin.y, self.height);
        ys.flat_map(move |y| xs.clone().map(move |x| ChunkCoord::new(x, y)))
    }

    /// The set of coordinates this window wants resident.
    pub fn desired_set(&self) -> WindowResult<HashSet<ChunkCoord>> {
        desired_set(self.origin, self.width, self.height)
    }
}

/// Enumerates the rectangle of coordinates that should be resident.
///
/// Pure function of its inputs. Negative sizes are reported, never clamped.
pub fn desired_set(
    origin: ChunkCoord,
    width: i32,
    height: i32,
) -> WindowResult<HashSet<ChunkCoord>> {
    let window = LoadWindow::new(origin, width, height);
    window.validate()?;
    Ok(window.coords().collect())
}

/// `start..start + len` on one axis, cut off at `i32::MAX`.
fn axis_range(start: i32, len: i32) -> RangeInclusive<i32> {
    if len <= 0 {
        return 1..=0;
    }
    let end = i64::from(start) + i64::from(len) - 1;
    start..=i32::try_from(end).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_set_rectangle() {
        let set = desired_set(ChunkCoord::new(-1, 2), 3, 2).expect("valid window");
        assert_eq!(set.len(), 6);
        for x in -1..2 {
            for y in 2..4 {
                assert!(set.contains(&ChunkCoord::new(x, y)));
            }
        }
        assert!(!set.contains(&ChunkCoord::new(2, 2)));
        assert!(!set.contains(&ChunkCoord::new(-1, 4)));
    }

    #[test]
    fn test_zero_area_is_empty() {
        assert!(desired_set(ChunkCoord::ZERO, 0, 0).expect("valid").is_empty());
        assert!(desired_set(ChunkCoord::ZERO, 5, 0).expect("valid").is_empty());
        assert_eq!(LoadWindow::EMPTY.area(), 0);
    }

    #[test]
    fn test_negative_size_rejected() {
        assert_eq!(
            desired_set(ChunkCoord::ZERO, -1, 3),
            Err(WindowError::InvalidSize {
                width: -1,
                height: 3
            })
        );
        let window = LoadWindow::new(ChunkCoord::ZERO, 2, -2);
        assert!(window.desired_set().is_err());
        assert_eq!(window.area(), 0);
        assert_eq!(window.coords().count(), 0);
    }

    #[test]
    fn test_around_view() {
        let window = LoadWindow::around_view(ChunkCoord::new(10, 10), 4, 3, 1);
        assert_eq!(window.origin, ChunkCoord::new(9, 9));
        assert_eq!((window.width, window.height), (6, 5));
        assert!(window.contains(ChunkCoord::new(9, 9)));
        assert!(window.contains(ChunkCoord::new(14, 13)));
        assert!(!window.contains(ChunkCoord::new(15, 13)));
    }

    #[test]
    fn test_reposition_and_resize() {
        let mut window = LoadWindow::new(ChunkCoord::ZERO, 3, 3);
        window.set_position(ChunkCoord::new(1, 0));
        assert!(window.contains(ChunkCoord::new(3, 2)));
        assert!(!window.contains(ChunkCoord::new(0, 0)));

        window.set_size(1, 1);
        assert_eq!(window.area(), 1);
        assert_eq!(window.center(), ChunkCoord::new(1, 0));
    }

    #[test]
    fn test_window_past_grid_edge_does_not_wrap() {
        let window = LoadWindow::new(ChunkCoord::new(i32::MAX - 1, 0), 3, 1);
        let set = window.desired_set().expect("valid window");

        let expected: HashSet<_> = [
            ChunkCoord::new(i32::MAX - 1, 0),
            ChunkCoord::new(i32::MAX, 0),
        ]
        .into_iter()
        .collect();
        assert_eq!(set, expected);
        assert!(!window.contains(ChunkCoord::new(i32::MIN, 0)));
        assert!(window.coords().all(|c| window.contains(c)));

        let corner = LoadWindow::new(ChunkCoord::new(i32::MAX, i32::MAX), 4, 4);
        let coords: Vec<_> = corner.coords().collect();
        assert_eq!(coords, vec![ChunkCoord::new(i32::MAX, i32::MAX)]);
    }

    #[test]
    fn test_around_view_saturates() {
        let window = LoadWindow::around_view(ChunkCoord::ZERO, i32::MAX - 1, 1, 1);
        assert_eq!(window.width, i32::MAX);
        assert_eq!(window.height, 3);
        assert_eq!(window.origin, ChunkCoord::new(-1, -1));

        let window = LoadWindow::around_view(ChunkCoord::new(i32::MIN, 0), 2, 2, i32::MAX);
        assert_eq!(window.origin.x, i32::MIN);
        assert_eq!(window.width, i32::MAX);
    }

    #[test]
    fn test_coords_match_contains() {
        let window = LoadWindow::new(ChunkCoord::new(-3, -2), 4, 5);
        let coords: Vec<_> = window.coords().collect();
        assert_eq!(coords.len(), window.area());
        assert_eq!(coords[0], ChunkCoord::new(-3, -2));
        assert_eq!(coords[1], ChunkCoord::new(-2, -2));
        assert!(coords.iter().all(|c| window.contains(*c)));
    }
}
