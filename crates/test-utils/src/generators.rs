//! Synthetic value grids for decoded test fields.
//!
//! Values are row-major `height * width`, the layout of a decoded GRIB2
//! message.

/// Each cell value is `col * 1000 + row`, so a value read back identifies
/// its position.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Temperature-like values in Kelvin, 250K top-left to 310K bottom-right.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            data.push(250.0 + (x_factor * 30.0) + (y_factor * 30.0));
        }
    }
    data
}

/// Isobaric temperature: colder aloft, offset by 6.5K per 100 hPa below 1000.
pub fn create_level_temperature_grid(width: usize, height: usize, level_hpa: f64) -> Vec<f32> {
    let offset = ((1000.0 - level_hpa) / 100.0 * 6.5) as f32;
    create_temperature_grid(width, height)
        .into_iter()
        .map(|t| t - offset)
        .collect()
}

pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Zeros with NaN at each `(col, row)` of `nan_positions`, as a bitmapped
/// message decodes.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[11], 1001.0);
    }

    #[test]
    fn test_create_temperature_grid() {
        let grid = create_temperature_grid(100, 100);
        let min = grid.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = grid.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(min >= 250.0);
        assert!(max <= 310.0);
    }

    #[test]
    fn test_level_temperature_colder_aloft() {
        let low = create_level_temperature_grid(4, 4, 850.0);
        let high = create_level_temperature_grid(4, 4, 500.0);
        assert!(high[0] < low[0]);
    }

    #[test]
    fn test_create_grid_with_nans() {
        let grid = create_grid_with_nans(10, 10, &[(5, 5), (0, 0)]);
        assert!(grid[0].is_nan());
        assert!(grid[55].is_nan());
        assert!(!grid[1].is_nan());
    }
}
