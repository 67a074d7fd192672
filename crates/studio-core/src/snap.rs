//! Grid snapping for canvas positions.

use crate::model::ModelError;

pub const DEFAULT_GRID_SIZE: u32 = 50;

/// Rounds pixel coordinates to the nearest multiple of a grid size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSnapper {
    grid_size: u32,
    enabled: bool,
}

impl Default for GridSnapper {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            enabled: true,
        }
    }
}

impl GridSnapper {
    pub fn new(grid_size: u32, enabled: bool) -> Result<Self, ModelError> {
        if grid_size == 0 {
            return Err(ModelError::InvalidGridSize);
        }
        Ok(Self { grid_size, enabled })
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Nearest grid multiple; ties go toward positive infinity so -25 on a
    /// 50px grid lands on 0. Identity when disabled.
    pub fn snap_to_grid(&self, value: i32) -> i32 {
        if !self.enabled {
            return value;
        }
        let g = i64::from(self.grid_size);
        let v = i64::from(value);
        // floor((v + g/2) / g) without going through floats
        let snapped = (2 * v + g).div_euclid(2 * g) * g;
        snapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    pub fn snap_position(&self, x: i32, y: i32) -> (i32, i32) {
        (self.snap_to_grid(x), self.snap_to_grid(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid50() -> GridSnapper {
        GridSnapper::new(50, true).unwrap()
    }

    #[test]
    fn snaps_to_nearest_multiple() {
        assert_eq!(grid50().snap_position(123, 77), (100, 100));
        assert_eq!(grid50().snap_position(123, 74), (100, 50));
        assert_eq!(grid50().snap_to_grid(125), 150);
        assert_eq!(grid50().snap_to_grid(124), 100);
    }

    #[test]
    fn negative_inputs_round_not_floor() {
        assert_eq!(grid50().snap_position(-10, 26), (0, 50));
        assert_eq!(grid50().snap_to_grid(-25), 0);
        assert_eq!(grid50().snap_to_grid(-26), -50);
    }

    #[test]
    fn disabled_is_identity() {
        let s = GridSnapper::new(50, false).unwrap();
        assert_eq!(s.snap_position(123, -7), (123, -7));
    }

    #[test]
    fn zero_grid_rejected() {
        assert_eq!(GridSnapper::new(0, true), Err(ModelError::InvalidGridSize));
    }

    #[test]
    fn snapped_values_are_multiples_within_half_grid() {
        for g in [1u32, 7, 10, 50, 64] {
            let s = GridSnapper::new(g, true).unwrap();
            for x in -500..=500 {
                let snapped = s.snap_to_grid(x);
                assert_eq!(snapped.rem_euclid(g as i32), 0, "g={g} x={x}");
                assert!(
                    2 * (snapped - x).abs() <= g as i32,
                    "g={g} x={x} snapped={snapped}"
                );
            }
        }
    }
}
